// src/handlers/statistics.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::assessment::{assessment_exists, fetch_questions},
    models::{
        assessment::Question,
        statistics::{
            LowPerformer, OptionBreakdown, QuestionStats, StatisticsResponse, Summary,
        },
    },
    utils::rounding::{percent_of, round_half_up},
};

/// One attempt with participant identity, in retrieval (id) order.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttemptStatRow {
    pub name: String,
    pub email: String,
    pub percentage: i32,
}

/// One recorded answer with the answering participant's identity.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AnswerStatRow {
    pub question_id: i64,
    pub selected_option: i32,
    pub name: String,
    pub email: String,
}

fn display_name(name: &str, email: &str) -> String {
    if name.trim().is_empty() {
        email.to_string()
    } else {
        name.to_string()
    }
}

/// Builds the full statistics product from the raw rows.
///
/// Pure: all ordering and tie-break rules live here so they can be pinned
/// by unit tests without a database.
fn build_statistics(
    questions: Vec<Question>,
    attempts: Vec<AttemptStatRow>,
    answers: Vec<AnswerStatRow>,
) -> StatisticsResponse {
    let count = attempts.len() as i64;

    let mut summary = Summary {
        count,
        ..Default::default()
    };

    if count > 0 {
        let sum: i64 = attempts.iter().map(|a| a.percentage as i64).sum();
        summary.avg = round_half_up(sum, count) as i32;
        summary.min = attempts.iter().map(|a| a.percentage).min().unwrap_or(0);
        summary.max = attempts.iter().map(|a| a.percentage).max().unwrap_or(0);
        for attempt in &attempts {
            summary.distribution.add(attempt.percentage);
        }
    }

    // Answers grouped by question, preserving attempt retrieval order.
    let mut by_question: HashMap<i64, Vec<&AnswerStatRow>> = HashMap::new();
    for answer in &answers {
        by_question.entry(answer.question_id).or_default().push(answer);
    }

    let mut question_stats: Vec<QuestionStats> = questions
        .into_iter()
        .map(|q| {
            let rows = by_question.get(&q.id).map(Vec::as_slice).unwrap_or(&[]);
            question_breakdown(q, rows)
        })
        .collect();

    // Hardest question first; sort_by_key is stable, so ties keep
    // position order.
    question_stats.sort_by_key(|q| q.correct_pct);

    let mut low_performers: Vec<LowPerformer> = attempts
        .iter()
        .filter(|a| a.percentage < 60)
        .map(|a| LowPerformer {
            name: display_name(&a.name, &a.email),
            email: a.email.clone(),
            percentage: a.percentage,
        })
        .collect();
    low_performers.sort_by_key(|p| p.percentage);

    StatisticsResponse {
        summary,
        questions: question_stats,
        low_performers,
    }
}

fn question_breakdown(question: Question, rows: &[&AnswerStatRow]) -> QuestionStats {
    let total = rows.len() as i64;

    let mut option_counts = [0i64; 4];
    for row in rows {
        if let Some(slot) = option_counts.get_mut(row.selected_option as usize) {
            *slot += 1;
        }
    }

    let correct_count = option_counts[question.correct_option as usize];
    let correct_pct = percent_of(correct_count, total);

    let option_breakdown = option_counts
        .iter()
        .map(|&count| OptionBreakdown {
            count,
            percent: percent_of(count, total),
        })
        .collect();

    // Most-picked wrong option; strict > keeps the lowest index on ties.
    let mut common_wrong_option: Option<i32> = None;
    let mut best = 0i64;
    for (idx, &count) in option_counts.iter().enumerate() {
        if idx as i32 == question.correct_option {
            continue;
        }
        if count > best {
            best = count;
            common_wrong_option = Some(idx as i32);
        }
    }

    let common_wrong_participants = match common_wrong_option {
        Some(option) => rows
            .iter()
            .filter(|r| r.selected_option == option)
            .take(5)
            .map(|r| display_name(&r.name, &r.email))
            .collect(),
        None => Vec::new(),
    };

    QuestionStats {
        question_id: question.id,
        order: question.position,
        text: question.text,
        options: question.options,
        correct_answer: question.correct_option,
        correct_count,
        correct_pct,
        option_breakdown,
        common_wrong_option,
        common_wrong_participants,
    }
}

/// Produces summary statistics, per-question breakdowns and the low
/// performer list for one assessment. Instructor only.
///
/// Pure read over the recorded attempts; zero attempts yield a zeroed
/// summary with empty collections, not an error.
pub async fn get_statistics(
    State(pool): State<PgPool>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !assessment_exists(&pool, assessment_id).await? {
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }

    let questions = fetch_questions(&pool, assessment_id).await?;

    let attempts = sqlx::query_as::<_, AttemptStatRow>(
        r#"
        SELECT u.name, u.email, a.percentage
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
        tracing::error!("Failed to fetch attempts for statistics: {:?}", e);
        AppError::from(e)
    })?;

    let answers = sqlx::query_as::<_, AnswerStatRow>(
        r#"
        SELECT ans.question_id, ans.selected_option, u.name, u.email
        FROM answers ans
        JOIN attempts a ON ans.attempt_id = a.id
        JOIN users u ON a.participant_id = u.id
        WHERE a.assessment_id = $1
        ORDER BY a.id, ans.position
        "#,
    )
    .bind(assessment_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch answers for statistics: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(build_statistics(questions, attempts, answers)))
}
