use axum::{Extension, Json, extract::State};
use raceday_storage::{
    Database,
    dto::auth::{LoginRequest, LoginResponse, UserInfo},
};
use validator::Validate;

use crate::error::WebError;
use crate::middleware::auth::{AuthUser, JwtKeys};

use super::services;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = LoginResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Wrong email or password")
    ),
    tag = "auth"
)]
pub async fn login(
    State(db): State<Database>,
    State(keys): State<JwtKeys>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, WebError> {
    request.validate()?;

    Ok(Json(services::login(&db, &keys, &request).await?))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The authenticated operator", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(db): State<Database>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserInfo>, WebError> {
    Ok(Json(services::current_user(&db, user.user_id).await?))
}
