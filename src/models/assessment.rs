// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'assessments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assessment {
    pub id: i64,
    pub title: String,
    pub owner_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table in the database.
///
/// `position` is 1-based and semantically significant: a submission's answer
/// list is aligned against the questions in position order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub assessment_id: i64,
    pub position: i32,
    pub text: String,

    /// Exactly four option labels, stored as a JSON array.
    pub options: Json<Vec<String>>,

    /// Index of the correct option, in [0,3].
    pub correct_option: i32,
}

/// One row in the assessment list views.
#[derive(Debug, Serialize, FromRow)]
pub struct AssessmentSummary {
    pub id: i64,
    pub title: String,
    pub owner_name: String,
    pub question_count: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A question as shown to a caller. The correct index is present only for
/// instructors; participants get `None`, which serde omits entirely.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: i64,
    pub position: i32,
    pub text: String,
    pub options: Json<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<i32>,
}

/// Full assessment detail, role-filtered questions included.
#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    pub id: i64,
    pub title: String,
    pub owner_name: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub questions: Vec<QuestionView>,
}

/// DTO for authoring a new assessment with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 characters."
    ))]
    pub title: String,
    #[validate(
        length(min = 1, message = "At least one question is required."),
        nested
    )]
    pub questions: Vec<CreateQuestionRequest>,
}

/// DTO for one authored question.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Question text length must be between 1 and 1000 characters."
    ))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(min = 0, max = 3, message = "correct_option must be in [0,3]."))]
    pub correct_option: i32,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != 4 {
        return Err(validator::ValidationError::new("exactly_four_options_required"));
    }
    for opt in options {
        if opt.is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
