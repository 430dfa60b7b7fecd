// src/handlers/cohort.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    handlers::assessment::assessment_exists,
    models::cohort::{
        Cohort, CohortMemberResponse, CohortResponse, PartitionPolicy, PartitionRequest,
        RankingMetric,
    },
    utils::{html::clean_html, rounding::round_half_up},
};

/// One participant row feeding the partitioner, in attempt retrieval
/// (id) order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PartitionRow {
    pub participant_id: i64,
    pub name: String,
    pub email: String,
    pub percentage: i32,
    pub baseline_ability: Option<f64>,
}

/// The value a row is ranked by, evaluated once before sorting.
/// The baseline metric falls back to the attempt percentage when absent.
fn ranking_score(metric: RankingMetric, row: &PartitionRow) -> f64 {
    match metric {
        RankingMetric::Percentage => row.percentage as f64,
        RankingMetric::BaselineAbility => {
            row.baseline_ability.unwrap_or(row.percentage as f64)
        }
    }
}

/// Sorts rows strictly descending by ranking score. The sort is stable, so
/// ties keep attempt retrieval order.
fn rank_rows(rows: Vec<PartitionRow>, metric: RankingMetric) -> Vec<PartitionRow> {
    let mut scored: Vec<(f64, PartitionRow)> = rows
        .into_iter()
        .map(|row| (ranking_score(metric, &row), row))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, row)| row).collect()
}

/// Snake draft: round-robin over `k` buckets, reversing direction every
/// full lap, so high and low ranks interleave evenly across every bucket.
fn snake_partition<T>(rows: Vec<T>, k: usize) -> Vec<Vec<T>> {
    let mut buckets: Vec<Vec<T>> = (0..k).map(|_| Vec::new()).collect();
    for (i, row) in rows.into_iter().enumerate() {
        let lap = i / k;
        let pos = i % k;
        let bucket = if lap % 2 == 0 { pos } else { k - 1 - pos };
        buckets[bucket].push(row);
    }
    buckets
}

/// Contiguous chunks of maximally equal size: floor(n/k) each, with the
/// first n mod k chunks one larger. The top chunk holds the top ranks.
fn chunk_partition<T>(rows: Vec<T>, k: usize) -> Vec<Vec<T>> {
    let n = rows.len();
    let base = n / k;
    let extra = n % k;
    let mut iter = rows.into_iter();
    (0..k)
        .map(|i| {
            let size = base + usize::from(i < extra);
            iter.by_ref().take(size).collect()
        })
        .collect()
}

/// Default cohort names when the caller supplies none.
fn default_names(k: usize, policy: PartitionPolicy) -> Vec<String> {
    if k == 3 {
        return vec![
            "Advanced".to_string(),
            "Intermediate".to_string(),
            "Foundation".to_string(),
        ];
    }
    (0..k)
        .map(|i| match policy {
            PartitionPolicy::Balanced => {
                if i < 26 {
                    format!("Group {}", (b'A' + i as u8) as char)
                } else {
                    format!("Group {}", i + 1)
                }
            }
            PartitionPolicy::Homogeneous => format!("Tier {}", i + 1),
        })
        .collect()
}

/// Rounded mean / min / max of member percentages; all zero for an empty
/// cohort (an unscored cohort reports 0, not null).
fn cohort_stats(members: &[PartitionRow]) -> (i32, i32, i32) {
    if members.is_empty() {
        return (0, 0, 0);
    }
    let sum: i64 = members.iter().map(|m| m.percentage as i64).sum();
    let avg = round_half_up(sum, members.len() as i64) as i32;
    let min = members.iter().map(|m| m.percentage).min().unwrap_or(0);
    let max = members.iter().map(|m| m.percentage).max().unwrap_or(0);
    (avg, min, max)
}

/// Partitions an assessment's participants into named cohorts and persists
/// the result. Instructor only.
///
/// The prior cohort set for the assessment is deleted and the new one
/// inserted inside a single transaction, so a concurrent reader never sees
/// a mixed or half-written set. Zero attempts are a no-op returning an
/// empty list.
pub async fn partition_cohorts(
    State(pool): State<PgPool>,
    Json(req): Json<PartitionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.num_groups < 1 {
        return Err(AppError::BadRequest(
            "num_groups must be at least 1".to_string(),
        ));
    }

    if !assessment_exists(&pool, req.assessment_id).await? {
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }

    let k = req.num_groups as usize;

    let names = match req.names {
        Some(names) => {
            if names.len() != k {
                return Err(AppError::BadRequest(format!(
                    "Expected {} cohort names, got {}",
                    k,
                    names.len()
                )));
            }
            names.iter().map(|n| clean_html(n)).collect()
        }
        None => default_names(k, req.policy),
    };

    let rows = sqlx::query_as::<_, PartitionRow>(
        r#"
        SELECT a.participant_id, u.name, u.email, a.percentage, u.baseline_ability
        FROM attempts a
        JOIN users u ON a.participant_id = u.id
        WHERE a.assessment_id = $1
        ORDER BY a.id
        "#,
    )
    .bind(req.assessment_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch partition rows: {:?}", e);
        AppError::from(e)
    })?;

    if rows.is_empty() {
        return Ok(Json(Vec::<CohortResponse>::new()));
    }

    let ranked = rank_rows(rows, req.metric);
    let buckets = match req.policy {
        PartitionPolicy::Balanced => snake_partition(ranked, k),
        PartitionPolicy::Homogeneous => chunk_partition(ranked, k),
    };

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM cohorts WHERE assessment_id = $1")
        .bind(req.assessment_id)
        .execute(&mut *tx)
        .await?;

    let mut response = Vec::with_capacity(k);
    for (i, (members, name)) in buckets.into_iter().zip(names.into_iter()).enumerate() {
        let ordinal = (i + 1) as i32;
        let (avg, min, max) = cohort_stats(&members);

        let cohort_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO cohorts
                (assessment_id, ordinal, name, size, average_percentage,
                 min_percentage, max_percentage)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(req.assessment_id)
        .bind(ordinal)
        .bind(&name)
        .bind(members.len() as i32)
        .bind(avg)
        .bind(min)
        .bind(max)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert cohort: {:?}", e);
            AppError::from(e)
        })?;

        if !members.is_empty() {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO cohort_members (cohort_id, participant_id, position) ",
            );
            query_builder.push_values(members.iter().enumerate(), |mut b, (pos, m)| {
                b.push_bind(cohort_id)
                    .push_bind(m.participant_id)
                    .push_bind((pos + 1) as i32);
            });
            query_builder.build().execute(&mut *tx).await.map_err(|e| {
                tracing::error!("Failed to insert cohort members: {:?}", e);
                AppError::from(e)
            })?;
        }

        response.push(CohortResponse {
            ordinal,
            name,
            size: members.len() as i32,
            average: avg,
            min,
            max,
            members: members
                .into_iter()
                .map(|m| CohortMemberResponse {
                    id: m.participant_id,
                    name: m.name,
                    email: m.email,
                    baseline_ability: m.baseline_ability,
                    percentage: Some(m.percentage),
                })
                .collect(),
        });
    }

    tx.commit().await?;

    Ok(Json(response))
}

/// Returns the last persisted partition for an assessment, ordinal
/// ascending with members in stored position order. Instructor only.
/// Empty list when no partition has been run yet.
pub async fn get_cohorts(
    State(pool): State<PgPool>,
    Path(assessment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !assessment_exists(&pool, assessment_id).await? {
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }

    let cohorts = sqlx::query_as::<_, Cohort>(
        r#"
        SELECT id, assessment_id, ordinal, name, size, average_percentage,
               min_percentage, max_percentage, created_at
        FROM cohorts
        WHERE assessment_id = $1
        ORDER BY ordinal
        "#,
    )
    .bind(assessment_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch cohorts: {:?}", e);
        AppError::from(e)
    })?;

    #[derive(sqlx::FromRow)]
    struct MemberRow {
        cohort_id: i64,
        participant_id: i64,
        name: String,
        email: String,
        baseline_ability: Option<f64>,
        percentage: Option<i32>,
    }

    let member_rows = sqlx::query_as::<_, MemberRow>(
        r#"
        SELECT cm.cohort_id, cm.participant_id, u.name, u.email,
               u.baseline_ability, a.percentage
        FROM cohort_members cm
        JOIN cohorts c ON cm.cohort_id = c.id
        JOIN users u ON cm.participant_id = u.id
        LEFT JOIN attempts a
            ON a.assessment_id = c.assessment_id
           AND a.participant_id = cm.participant_id
        WHERE c.assessment_id = $1
        ORDER BY cm.cohort_id, cm.position
        "#,
    )
    .bind(assessment_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch cohort members: {:?}", e);
        AppError::from(e)
    })?;

    let mut members_by_cohort: std::collections::HashMap<i64, Vec<CohortMemberResponse>> =
        std::collections::HashMap::new();
    for row in member_rows {
        members_by_cohort
            .entry(row.cohort_id)
            .or_default()
            .push(CohortMemberResponse {
                id: row.participant_id,
                name: row.name,
                email: row.email,
                baseline_ability: row.baseline_ability,
                percentage: row.percentage,
            });
    }

    let response: Vec<CohortResponse> = cohorts
        .into_iter()
        .map(|c| CohortResponse {
            ordinal: c.ordinal,
            name: c.name,
            size: c.size,
            average: c.average_percentage,
            min: c.min_percentage,
            max: c.max_percentage,
            members: members_by_cohort.remove(&c.id).unwrap_or_default(),
        })
        .collect();

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(participant_id: i64, percentage: i32, baseline: Option<f64>) -> PartitionRow {
        PartitionRow {
            participant_id,
            name: format!("p{}", participant_id),
            email: format!("p{}@test.dev", participant_id),
            percentage,
            baseline_ability: baseline,
        }
    }

    fn ids(bucket: &[PartitionRow]) -> Vec<i64> {
        bucket.iter().map(|r| r.participant_id).collect()
    }

    #[test]
    fn snake_draft_nine_across_three() {
        // Ranks 1..9: lap 0 left-to-right, lap 1 right-to-left, lap 2
        // left-to-right again.
        let rows: Vec<i64> = (1..=9).collect();
        let buckets = snake_partition(rows, 3);
        assert_eq!(buckets[0], vec![1, 6, 7]);
        assert_eq!(buckets[1], vec![2, 5, 8]);
        assert_eq!(buckets[2], vec![3, 4, 9]);
    }

    #[test]
    fn snake_draft_partial_last_lap() {
        let rows: Vec<i64> = (1..=4).collect();
        let buckets = snake_partition(rows, 3);
        assert_eq!(buckets[0], vec![1]);
        assert_eq!(buckets[1], vec![2]);
        assert_eq!(buckets[2], vec![3, 4]);
    }

    #[test]
    fn chunks_ten_across_three() {
        let rows: Vec<i64> = (1..=10).collect();
        let buckets = chunk_partition(rows, 3);
        assert_eq!(buckets[0], vec![1, 2, 3, 4]);
        assert_eq!(buckets[1], vec![5, 6, 7]);
        assert_eq!(buckets[2], vec![8, 9, 10]);
    }

    #[test]
    fn chunks_more_groups_than_rows() {
        let rows: Vec<i64> = vec![1, 2];
        let buckets = chunk_partition(rows, 4);
        assert_eq!(buckets[0], vec![1]);
        assert_eq!(buckets[1], vec![2]);
        assert!(buckets[2].is_empty());
        assert!(buckets[3].is_empty());
    }

    #[test]
    fn ranking_descends_with_stable_ties() {
        let rows = vec![
            row(1, 50, None),
            row(2, 80, None),
            row(3, 50, None),
            row(4, 90, None),
        ];
        let ranked = rank_rows(rows, RankingMetric::Percentage);
        // Ties (1 and 3 at 50) keep retrieval order.
        assert_eq!(ids(&ranked), vec![4, 2, 1, 3]);
    }

    #[test]
    fn baseline_metric_falls_back_to_percentage() {
        let rows = vec![row(1, 40, Some(95.0)), row(2, 70, None), row(3, 50, Some(10.0))];
        let ranked = rank_rows(rows, RankingMetric::BaselineAbility);
        // 1 ranks by 95.0, 2 falls back to 70, 3 ranks by 10.0.
        assert_eq!(ids(&ranked), vec![1, 2, 3]);
    }

    #[test]
    fn default_names_for_three_groups() {
        assert_eq!(
            default_names(3, PartitionPolicy::Balanced),
            vec!["Advanced", "Intermediate", "Foundation"]
        );
        assert_eq!(
            default_names(3, PartitionPolicy::Homogeneous),
            vec!["Advanced", "Intermediate", "Foundation"]
        );
    }

    #[test]
    fn default_names_by_policy() {
        assert_eq!(
            default_names(2, PartitionPolicy::Balanced),
            vec!["Group A", "Group B"]
        );
        assert_eq!(
            default_names(4, PartitionPolicy::Homogeneous),
            vec!["Tier 1", "Tier 2", "Tier 3", "Tier 4"]
        );
    }

    #[test]
    fn cohort_stats_round_half_up() {
        let members = vec![row(1, 100, None), row(2, 38, None), row(3, 25, None)];
        let (avg, min, max) = cohort_stats(&members);
        // (100 + 38 + 25) / 3 = 54.33 -> 54
        assert_eq!(avg, 54);
        assert_eq!(min, 25);
        assert_eq!(max, 100);
    }

    #[test]
    fn empty_cohort_stats_are_zero() {
        assert_eq!(cohort_stats(&[]), (0, 0, 0));
    }
}
