// src/models/statistics.rs

use serde::Serialize;
use sqlx::types::Json;

/// Aggregate response for one assessment's statistics.
#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub summary: Summary,
    /// Per-question breakdowns, hardest question first (ascending
    /// correct_pct, stable on position for ties).
    pub questions: Vec<QuestionStats>,
    /// Participants below 60%, worst first.
    pub low_performers: Vec<LowPerformer>,
}

/// Score summary over all attempts. Zero-valued when there are no attempts.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub count: i64,
    pub avg: i32,
    pub min: i32,
    pub max: i32,
    pub distribution: Distribution,
}

/// Fixed five-bucket histogram of attempt percentages. Buckets are
/// half-open [lower, upper) except the last, which includes 100.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Distribution {
    #[serde(rename = "0-59")]
    pub below_60: i64,
    #[serde(rename = "60-69")]
    pub sixties: i64,
    #[serde(rename = "70-79")]
    pub seventies: i64,
    #[serde(rename = "80-89")]
    pub eighties: i64,
    #[serde(rename = "90-100")]
    pub nineties: i64,
}

impl Distribution {
    pub fn add(&mut self, percentage: i32) {
        match percentage {
            i32::MIN..=59 => self.below_60 += 1,
            60..=69 => self.sixties += 1,
            70..=79 => self.seventies += 1,
            80..=89 => self.eighties += 1,
            _ => self.nineties += 1,
        }
    }
}

/// Per-question difficulty breakdown.
#[derive(Debug, Serialize)]
pub struct QuestionStats {
    pub question_id: i64,
    /// 1-based position within the assessment.
    pub order: i32,
    pub text: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: i32,
    pub correct_count: i64,
    pub correct_pct: i32,
    /// Selection count and share for each of the four options.
    pub option_breakdown: Vec<OptionBreakdown>,
    /// The wrong option picked most often; ties resolve to the lowest
    /// index. None when nobody picked a wrong option.
    pub common_wrong_option: Option<i32>,
    /// Up to five display names of participants who picked that option,
    /// in attempt retrieval order.
    pub common_wrong_participants: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OptionBreakdown {
    pub count: i64,
    pub percent: i32,
}

#[derive(Debug, Serialize)]
pub struct LowPerformer {
    pub name: String,
    pub email: String,
    pub percentage: i32,
}
