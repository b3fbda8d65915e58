use axum::{
    Json,
    extract::{Path, State},
};
use raceday_storage::{
    Database,
    dto::results::{ClassificationResponse, ResultsSummary, StageResultEntry, StageStats},
    timing::{bonus::BonusEntry, bonus_schedule},
};

use crate::error::WebError;

use super::services;

#[utoipa::path(
    get,
    path = "/api/stages/{id}/timings",
    params(
        ("id" = i32, Path, description = "Stage ID")
    ),
    responses(
        (status = 200, description = "Stage leaderboard in position order", body = Vec<StageResultEntry>),
        (status = 404, description = "Stage not found")
    ),
    tag = "results"
)]
pub async fn stage_leaderboard(
    State(db): State<Database>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<StageResultEntry>>, WebError> {
    Ok(Json(services::stage_leaderboard(&db, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/stages/{id}/stats",
    params(
        ("id" = i32, Path, description = "Stage ID")
    ),
    responses(
        (status = 200, description = "Count, average, best and worst final time", body = StageStats),
        (status = 404, description = "Stage not found")
    ),
    tag = "results"
)]
pub async fn stage_stats(
    State(db): State<Database>,
    Path(id): Path<i32>,
) -> Result<Json<StageStats>, WebError> {
    Ok(Json(services::stage_stats(&db, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/classification/{category_id}",
    params(
        ("category_id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Overall standings of the category", body = ClassificationResponse),
        (status = 404, description = "Category not found")
    ),
    tag = "results"
)]
pub async fn classification(
    State(db): State<Database>,
    Path(category_id): Path<i32>,
) -> Result<Json<ClassificationResponse>, WebError> {
    Ok(Json(services::classification(&db, category_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/bonuses",
    responses(
        (status = 200, description = "Time bonus per stage position", body = Vec<BonusEntry>)
    ),
    tag = "results"
)]
pub async fn bonuses() -> Json<Vec<BonusEntry>> {
    Json(bonus_schedule())
}

#[utoipa::path(
    get,
    path = "/api/results/summary",
    responses(
        (status = 200, description = "Event-wide counters", body = ResultsSummary)
    ),
    tag = "results"
)]
pub async fn summary(State(db): State<Database>) -> Result<Json<ResultsSummary>, WebError> {
    Ok(Json(services::summary(&db).await?))
}
