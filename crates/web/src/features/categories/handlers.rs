use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use raceday_storage::{
    Database,
    dto::category::{
        BaseStartResponse, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest,
    },
    services::timing::TimingService,
};
use validator::Validate;

use crate::error::WebError;

use super::services;

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "All categories in start order", body = Vec<CategoryResponse>)
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(db): State<Database>,
) -> Result<Json<Vec<CategoryResponse>>, WebError> {
    let categories = services::list_categories(&db).await?;

    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/categories/base-start",
    responses(
        (status = 200, description = "Earliest category start, used as the offset reference", body = BaseStartResponse)
    ),
    tag = "categories"
)]
pub async fn get_base_start(State(db): State<Database>) -> Result<Json<BaseStartResponse>, WebError> {
    Ok(Json(services::base_start(&db).await?))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category found", body = CategoryResponse),
        (status = 404, description = "Category not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn get_category(
    State(db): State<Database>,
    Path(id): Path<i32>,
) -> Result<Json<CategoryResponse>, WebError> {
    let category = services::get_category(&db, id).await?;

    Ok(Json(CategoryResponse::from(category)))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Name already in use"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn create_category(
    State(db): State<Database>,
    State(timing): State<TimingService>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), WebError> {
    request.validate()?;

    let category = services::create_category(&db, &timing, &request).await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Name already in use"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn update_category(
    State(db): State<Database>,
    State(timing): State<TimingService>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, WebError> {
    request.validate()?;

    let category = services::update_category(&db, &timing, id, &request).await?;

    Ok(Json(CategoryResponse::from(category)))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has participants"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "categories",
    security(("bearer_auth" = []))
)]
pub async fn delete_category(
    State(db): State<Database>,
    State(timing): State<TimingService>,
    Path(id): Path<i32>,
) -> Result<StatusCode, WebError> {
    services::delete_category(&db, &timing, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
