use axum::{Router, routing::get};

use super::handlers::{bonuses, classification, stage_leaderboard, stage_stats, summary};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/classification/:category_id", get(classification))
        .route("/bonuses", get(bonuses))
        .route("/results/summary", get(summary))
}

/// Public result routes living under `/api/stages`.
pub fn stage_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/timings", get(stage_leaderboard))
        .route("/:id/stats", get(stage_stats))
}
