// src/handlers/assessment.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::assessment::{
        AssessmentDetail, AssessmentSummary, CreateAssessmentRequest, Question, QuestionView,
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Creates a new assessment with its ordered question list.
/// Instructor only.
///
/// The assessment row and all question rows are inserted in one transaction;
/// positions are assigned 1..n in payload order. Text fields are
/// HTML-stripped before storage.
pub async fn create_assessment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let owner_id = claims.user_id()?;
    let title = clean_html(&payload.title);

    let mut tx = pool.begin().await?;

    let assessment_id: i64 = sqlx::query_scalar(
        "INSERT INTO assessments (title, owner_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(&title)
    .bind(owner_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert assessment: {:?}", e);
        AppError::from(e)
    })?;

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO questions (assessment_id, position, text, options, correct_option) ",
    );
    query_builder.push_values(payload.questions.iter().enumerate(), |mut b, (i, q)| {
        let options: Vec<String> = q.options.iter().map(|o| clean_html(o)).collect();
        b.push_bind(assessment_id)
            .push_bind((i + 1) as i32)
            .push_bind(clean_html(&q.text))
            .push_bind(sqlx::types::Json(options))
            .push_bind(q.correct_option);
    });
    query_builder.build().execute(&mut *tx).await.map_err(|e| {
        tracing::error!("Failed to insert questions: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    let questions = fetch_questions(&pool, assessment_id).await?;
    let views = question_views(questions, true);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": assessment_id,
            "title": title,
            "questions": views,
        })),
    ))
}

/// Lists all assessments with owner name and question count.
pub async fn list_assessments(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let summaries = sqlx::query_as::<_, AssessmentSummary>(
        r#"
        SELECT
            a.id,
            a.title,
            u.name AS owner_name,
            (SELECT COUNT(*) FROM questions q WHERE q.assessment_id = a.id) AS question_count,
            a.created_at
        FROM assessments a
        JOIN users u ON a.owner_id = u.id
        ORDER BY a.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list assessments: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(summaries))
}

/// Lists the calling instructor's own assessments.
pub async fn list_my_assessments(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = claims.user_id()?;

    let summaries = sqlx::query_as::<_, AssessmentSummary>(
        r#"
        SELECT
            a.id,
            a.title,
            u.name AS owner_name,
            (SELECT COUNT(*) FROM questions q WHERE q.assessment_id = a.id) AS question_count,
            a.created_at
        FROM assessments a
        JOIN users u ON a.owner_id = u.id
        WHERE a.owner_id = $1
        ORDER BY a.id DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list own assessments: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(summaries))
}

/// Fetches one assessment with its ordered questions.
///
/// Correct option indexes are included only when the caller is an
/// instructor; participants get the question list without them.
pub async fn get_assessment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    #[derive(sqlx::FromRow)]
    struct AssessmentRow {
        id: i64,
        title: String,
        owner_name: String,
        created_at: Option<chrono::DateTime<chrono::Utc>>,
    }

    let assessment = sqlx::query_as::<_, AssessmentRow>(
        r#"
        SELECT a.id, a.title, u.name AS owner_name, a.created_at
        FROM assessments a
        JOIN users u ON a.owner_id = u.id
        WHERE a.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch assessment {}: {:?}", id, e);
        AppError::from(e)
    })?
    .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    let questions = fetch_questions(&pool, id).await?;
    let views = question_views(questions, claims.role == "instructor");

    Ok(Json(AssessmentDetail {
        id: assessment.id,
        title: assessment.title,
        owner_name: assessment.owner_name,
        created_at: assessment.created_at,
        questions: views,
    }))
}

/// Loads an assessment's questions in position order.
pub(crate) async fn fetch_questions(
    pool: &PgPool,
    assessment_id: i64,
) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, assessment_id, position, text, options, correct_option
        FROM questions
        WHERE assessment_id = $1
        ORDER BY position
        "#,
    )
    .bind(assessment_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions: {:?}", e);
        AppError::from(e)
    })?;

    Ok(questions)
}

/// Returns true when an assessment row exists.
pub(crate) async fn assessment_exists(
    pool: &PgPool,
    assessment_id: i64,
) -> Result<bool, AppError> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM assessments WHERE id = $1")
        .bind(assessment_id)
        .fetch_optional(pool)
        .await?;

    Ok(found.is_some())
}

fn question_views(questions: Vec<Question>, include_correct: bool) -> Vec<QuestionView> {
    questions
        .into_iter()
        .map(|q| QuestionView {
            id: q.id,
            position: q.position,
            text: q.text,
            options: q.options,
            correct_option: include_correct.then_some(q.correct_option),
        })
        .collect()
}
