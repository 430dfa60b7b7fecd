// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'attempts' table in the database.
///
/// One participant's single scored submission for one assessment. Immutable
/// after creation; there is no edit or resubmit path.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub assessment_id: i64,
    pub participant_id: i64,
    /// Count of correct answers.
    pub score: i32,
    /// Question count at submission time.
    pub total: i32,
    /// round_half_up(score * 100 / total).
    pub percentage: i32,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting an attempt.
///
/// Answer items arrive as raw JSON values and are normalized in the handler:
/// each must be exactly `{"selected_option": <int in [0,3]>}`. Anything else
/// is rejected as a 400, never silently coerced.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub assessment_id: i64,
    pub answers: Vec<serde_json::Value>,
}

/// Result of a scored submission.
#[derive(Debug, Serialize)]
pub struct SubmitAttemptResponse {
    pub id: i64,
    pub score: i32,
    pub total: i32,
    pub percentage: i32,
}

/// One recorded attempt joined with participant identity, for instructors.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptWithParticipant {
    pub id: i64,
    pub participant_id: i64,
    pub name: String,
    pub email: String,
    pub score: i32,
    pub total: i32,
    pub percentage: i32,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}
