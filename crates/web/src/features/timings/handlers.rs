use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use raceday_storage::{
    Database,
    dto::{
        common::PaginatedResponse,
        timing::{
            CreateTimingRequest, StageRecalculationResponse, TimingDeletedResponse, TimingFilter,
            TimingMutationResponse, TimingResponse, UpdateTimingRequest,
        },
    },
    services::timing::TimingService,
};
use validator::Validate;

use crate::error::WebError;

use super::services;

#[utoipa::path(
    get,
    path = "/api/timings",
    params(TimingFilter),
    responses(
        (status = 200, description = "Timing records, paginated", body = PaginatedResponse<TimingResponse>),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "timings",
    security(("bearer_auth" = []))
)]
pub async fn list_timings(
    State(db): State<Database>,
    Query(filter): Query<TimingFilter>,
) -> Result<Json<PaginatedResponse<TimingResponse>>, WebError> {
    Ok(Json(services::list_timings(&db, &filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/timings/{id}",
    params(
        ("id" = i64, Path, description = "Timing record ID")
    ),
    responses(
        (status = 200, description = "Timing record found", body = TimingResponse),
        (status = 404, description = "Timing record not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "timings",
    security(("bearer_auth" = []))
)]
pub async fn get_timing(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<Json<TimingResponse>, WebError> {
    Ok(Json(services::get_timing(&db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/timings",
    request_body = CreateTimingRequest,
    responses(
        (status = 201, description = "Time recorded; the stage was re-ranked or the warning says why not", body = TimingMutationResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Participant already has a time for this stage"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "timings",
    security(("bearer_auth" = []))
)]
pub async fn create_timing(
    State(timing): State<TimingService>,
    Json(request): Json<CreateTimingRequest>,
) -> Result<(StatusCode, Json<TimingMutationResponse>), WebError> {
    request.validate()?;

    let response = services::create_timing(&timing, request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    put,
    path = "/api/timings/{id}",
    params(
        ("id" = i64, Path, description = "Timing record ID")
    ),
    request_body = UpdateTimingRequest,
    responses(
        (status = 200, description = "Time corrected and stage re-ranked", body = TimingMutationResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Timing record not found"),
        (status = 409, description = "Participant already has a time for this stage"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "timings",
    security(("bearer_auth" = []))
)]
pub async fn update_timing(
    State(timing): State<TimingService>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTimingRequest>,
) -> Result<Json<TimingMutationResponse>, WebError> {
    request.validate()?;

    Ok(Json(services::update_timing(&timing, id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/timings/{id}",
    params(
        ("id" = i64, Path, description = "Timing record ID")
    ),
    responses(
        (status = 200, description = "Time deleted and stage re-ranked", body = TimingDeletedResponse),
        (status = 404, description = "Timing record not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "timings",
    security(("bearer_auth" = []))
)]
pub async fn delete_timing(
    State(timing): State<TimingService>,
    Path(id): Path<i64>,
) -> Result<Json<TimingDeletedResponse>, WebError> {
    Ok(Json(services::delete_timing(&timing, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/stages/{id}/bonuses",
    params(
        ("id" = i32, Path, description = "Stage ID")
    ),
    responses(
        (status = 200, description = "Ranking pass run over the stage", body = StageRecalculationResponse),
        (status = 404, description = "Stage not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "timings",
    security(("bearer_auth" = []))
)]
pub async fn reapply_bonuses(
    State(db): State<Database>,
    State(timing): State<TimingService>,
    Path(stage_id): Path<i32>,
) -> Result<Json<StageRecalculationResponse>, WebError> {
    Ok(Json(services::reapply_bonuses(&db, &timing, stage_id).await?))
}
