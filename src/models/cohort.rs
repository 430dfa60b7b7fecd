// src/models/cohort.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'cohorts' table in the database.
///
/// The full cohort set for an assessment is replaced as a unit on every
/// partition run; rows are never updated in place.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cohort {
    pub id: i64,
    pub assessment_id: i64,
    /// 1-based position within the partition run.
    pub ordinal: i32,
    pub name: String,
    pub size: i32,
    pub average_percentage: i32,
    pub min_percentage: i32,
    pub max_percentage: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// How ranked participants are distributed across cohorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionPolicy {
    /// Snake draft: interleaves high and low performers so every cohort
    /// lands near the same average ability.
    Balanced,
    /// Contiguous chunks: participants of similar rank stay together,
    /// producing ability tiers.
    Homogeneous,
}

/// The value participants are ranked by before partitioning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    /// This assessment's attempt percentage.
    #[default]
    Percentage,
    /// The external baseline ability value, falling back to the attempt
    /// percentage for participants that have none.
    BaselineAbility,
}

/// DTO for running a partition.
#[derive(Debug, Deserialize)]
pub struct PartitionRequest {
    pub assessment_id: i64,
    pub num_groups: i32,
    pub policy: PartitionPolicy,
    #[serde(default)]
    pub metric: RankingMetric,
    /// Optional cohort names; when present the length must equal
    /// `num_groups`.
    pub names: Option<Vec<String>>,
}

/// One cohort as returned by partition and getCohorts.
#[derive(Debug, Serialize)]
pub struct CohortResponse {
    pub ordinal: i32,
    pub name: String,
    pub size: i32,
    pub average: i32,
    pub min: i32,
    pub max: i32,
    pub members: Vec<CohortMemberResponse>,
}

/// One cohort member with identity and score context.
#[derive(Debug, Serialize)]
pub struct CohortMemberResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub baseline_ability: Option<f64>,
    pub percentage: Option<i32>,
}
