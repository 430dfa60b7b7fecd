// src/handlers/attempt.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    handlers::assessment::{assessment_exists, fetch_questions},
    models::attempt::{AttemptWithParticipant, SubmitAttemptRequest, SubmitAttemptResponse},
    utils::{jwt::Claims, rounding::percent_of},
};

/// Normalizes one raw answer item into a selected option index.
///
/// The only accepted shape is an object with exactly the single key
/// `selected_option` holding an integer in [0,3]. Everything else is
/// rejected rather than coerced.
fn parse_answer_item(value: &serde_json::Value) -> Result<i32, String> {
    let obj = value
        .as_object()
        .ok_or("Each answer must be an object with a 'selected_option' field")?;

    if obj.len() != 1 {
        return Err("Each answer must contain only 'selected_option'".to_string());
    }

    let selected = obj
        .get("selected_option")
        .ok_or("Each answer must contain 'selected_option'")?
        .as_i64()
        .ok_or("'selected_option' must be an integer")?;

    if !(0..=3).contains(&selected) {
        return Err("'selected_option' must be between 0 and 3".to_string());
    }

    Ok(selected as i32)
}

/// Compares position-aligned selections against the answer key.
/// Returns the per-position correctness flags; the score is their count.
fn grade_answers(selected: &[i32], correct: &[i32]) -> Vec<bool> {
    selected
        .iter()
        .zip(correct.iter())
        .map(|(s, c)| s == c)
        .collect()
}

/// Records and scores one participant's attempt.
///
/// * Validates the answer list against the assessment's question list.
/// * Scores by position-aligned comparison; `is_correct` is derived here,
///   never trusted from the caller.
/// * Persists the attempt and its answers in one transaction.
///
/// At-most-one-attempt is checked up front and again at the storage layer:
/// the unique index on (assessment_id, participant_id) settles concurrent
/// duplicates, and the violation is translated to the same 409. The write
/// is never retried.
pub async fn submit_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let participant_id = claims.user_id()?;

    if !assessment_exists(&pool, req.assessment_id).await? {
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }

    let questions = fetch_questions(&pool, req.assessment_id).await?;

    if req.answers.len() != questions.len() {
        return Err(AppError::BadRequest(format!(
            "Expected {} answers, got {}",
            questions.len(),
            req.answers.len()
        )));
    }

    let selected = req
        .answers
        .iter()
        .map(parse_answer_item)
        .collect::<Result<Vec<i32>, String>>()
        .map_err(AppError::BadRequest)?;

    // Pre-check; the unique index still backstops the race below.
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM attempts WHERE assessment_id = $1 AND participant_id = $2",
    )
    .bind(req.assessment_id)
    .bind(participant_id)
    .fetch_optional(&pool)
    .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "Attempt already submitted for this assessment".to_string(),
        ));
    }

    let correct: Vec<i32> = questions.iter().map(|q| q.correct_option).collect();
    let flags = grade_answers(&selected, &correct);
    let score = flags.iter().filter(|&&f| f).count() as i32;
    let total = questions.len() as i32;
    let percentage = percent_of(score as i64, total as i64);

    let mut tx = pool.begin().await?;

    let attempt_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO attempts (assessment_id, participant_id, score, total, percentage)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(req.assessment_id)
    .bind(participant_id)
    .bind(score)
    .bind(total)
    .bind(percentage)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Attempt already submitted for this assessment".to_string())
        } else {
            tracing::error!("Failed to insert attempt: {:?}", e);
            AppError::from(e)
        }
    })?;

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO answers (attempt_id, question_id, position, selected_option, is_correct) ",
    );
    query_builder.push_values(
        questions.iter().zip(selected.iter().zip(flags.iter())),
        |mut b, (q, (sel, is_correct))| {
            b.push_bind(attempt_id)
                .push_bind(q.id)
                .push_bind(q.position)
                .push_bind(*sel)
                .push_bind(*is_correct);
        },
    );
    query_builder.build().execute(&mut *tx).await.map_err(|e| {
        tracing::error!("Failed to insert answers: {:?}", e);
        AppError::from(e)
    })?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitAttemptResponse {
            id: attempt_id,
            score,
            total,
            percentage,
        }),
    ))
}

/// Lists all recorded attempts for one assessment with participant identity.
/// Instructor only. Ordered by attempt id, the stable retrieval order the
/// aggregator and partitioner also rely on.
pub async fn list_attempts(
    State(pool): State<PgPool>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !assessment_exists(&pool, assessment_id).await? {
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }

    let attempts = sqlx::query_as::<_, AttemptWithParticipant>(
        r#"
        SELECT a.id, a.participant_id, u.name, u.email,
               a.score, a.total, a.percentage, a.submitted_at
        FROM attempts a
        JOIN users u ON a.participant_id = u.id
        WHERE a.assessment_id = $1
        ORDER BY a.id
        "#,
    )
    .bind(assessment_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list attempts: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(attempts))
}
