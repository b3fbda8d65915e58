use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use raceday_storage::{
    Database,
    dto::stage::{CreateStageRequest, StageResponse, UpdateStageRequest},
    services::timing::TimingService,
};
use validator::Validate;

use crate::error::WebError;

use super::services;

#[utoipa::path(
    get,
    path = "/api/stages",
    responses(
        (status = 200, description = "Active stages by number", body = Vec<StageResponse>)
    ),
    tag = "stages"
)]
pub async fn list_active_stages(
    State(db): State<Database>,
) -> Result<Json<Vec<StageResponse>>, WebError> {
    Ok(Json(services::list_stages(&db, true).await?))
}

#[utoipa::path(
    get,
    path = "/api/stages/all",
    responses(
        (status = 200, description = "Every stage, active or not", body = Vec<StageResponse>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "stages",
    security(("bearer_auth" = []))
)]
pub async fn list_all_stages(
    State(db): State<Database>,
) -> Result<Json<Vec<StageResponse>>, WebError> {
    Ok(Json(services::list_stages(&db, false).await?))
}

#[utoipa::path(
    get,
    path = "/api/stages/{id}",
    params(
        ("id" = i32, Path, description = "Stage ID")
    ),
    responses(
        (status = 200, description = "Stage found", body = StageResponse),
        (status = 404, description = "Stage not found")
    ),
    tag = "stages"
)]
pub async fn get_stage(
    State(db): State<Database>,
    Path(id): Path<i32>,
) -> Result<Json<StageResponse>, WebError> {
    Ok(Json(services::get_stage(&db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/stages",
    request_body = CreateStageRequest,
    responses(
        (status = 201, description = "Stage created", body = StageResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Stage number already in use"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "stages",
    security(("bearer_auth" = []))
)]
pub async fn create_stage(
    State(db): State<Database>,
    Json(request): Json<CreateStageRequest>,
) -> Result<(StatusCode, Json<StageResponse>), WebError> {
    request.validate()?;

    let stage = services::create_stage(&db, &request).await?;

    Ok((StatusCode::CREATED, Json(stage)))
}

#[utoipa::path(
    put,
    path = "/api/stages/{id}",
    params(
        ("id" = i32, Path, description = "Stage ID")
    ),
    request_body = UpdateStageRequest,
    responses(
        (status = 200, description = "Stage updated", body = StageResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Stage not found"),
        (status = 409, description = "Stage number already in use"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "stages",
    security(("bearer_auth" = []))
)]
pub async fn update_stage(
    State(db): State<Database>,
    State(timing): State<TimingService>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateStageRequest>,
) -> Result<Json<StageResponse>, WebError> {
    request.validate()?;

    Ok(Json(services::update_stage(&db, &timing, id, &request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/stages/{id}",
    params(
        ("id" = i32, Path, description = "Stage ID")
    ),
    responses(
        (status = 204, description = "Stage and its timing records deleted"),
        (status = 404, description = "Stage not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "stages",
    security(("bearer_auth" = []))
)]
pub async fn delete_stage(
    State(db): State<Database>,
    State(timing): State<TimingService>,
    Path(id): Path<i32>,
) -> Result<StatusCode, WebError> {
    services::delete_stage(&db, &timing, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
