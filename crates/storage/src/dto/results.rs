use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::timing::format_time;

/// One row of a stage leaderboard, joined with participant and category.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StageResultEntry {
    pub timing_id: i64,
    pub position: Option<i32>,
    pub participant_id: Uuid,
    pub bib: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub team: Option<String>,
    pub category_id: i32,
    pub category_name: String,
    pub raw_ms: i64,
    pub penalty_ms: i64,
    pub start_offset_ms: i64,
    pub bonus_ms: i64,
    pub final_ms: i64,
    #[sqlx(skip)]
    pub final_time: String,
    pub note: Option<String>,
}

impl StageResultEntry {
    pub fn with_formatted_time(mut self) -> Self {
        self.final_time = format_time(self.final_ms);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StageStats {
    pub stage_id: i32,
    pub total_results: i64,
    pub average_ms: Option<i64>,
    pub best_ms: Option<i64>,
    pub worst_ms: Option<i64>,
    pub average_time: Option<String>,
    pub best_time: Option<String>,
    pub worst_time: Option<String>,
}

impl StageStats {
    /// Summarise the final times of a stage. The average is rounded to the
    /// nearest millisecond.
    pub fn from_final_times(stage_id: i32, final_times: &[i64]) -> Self {
        let total_results = final_times.len() as i64;
        let best_ms = final_times.iter().copied().min();
        let worst_ms = final_times.iter().copied().max();
        let average_ms = (total_results > 0).then(|| {
            let sum: i128 = final_times.iter().map(|&t| i128::from(t)).sum();
            (sum as f64 / total_results as f64).round() as i64
        });

        Self {
            stage_id,
            total_results,
            average_ms,
            best_ms,
            worst_ms,
            average_time: average_ms.map(format_time),
            best_time: best_ms.map(format_time),
            worst_time: worst_ms.map(format_time),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassificationEntry {
    pub position: i32,
    pub participant_id: Uuid,
    pub bib: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub team: Option<String>,
    pub total_ms: i64,
    pub total_time: String,
    pub stages_completed: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassificationResponse {
    pub category_id: i32,
    pub category_name: String,
    pub standings: Vec<ClassificationEntry>,
}

/// Counters shown on the results landing page.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ResultsSummary {
    pub categories: i64,
    pub active_stages: i64,
    pub participants: i64,
    pub timings: i64,
    pub participants_with_times: i64,
    pub has_results: bool,
}
