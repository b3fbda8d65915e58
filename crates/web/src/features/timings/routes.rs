use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::handlers::{
    create_timing, delete_timing, get_timing, list_timings, reapply_bonuses, update_timing,
};
use crate::middleware::auth::{JwtKeys, require_auth};
use crate::state::AppState;

pub fn routes(jwt: JwtKeys) -> Router<AppState> {
    Router::new()
        .route("/", get(list_timings).post(create_timing))
        .route(
            "/:id",
            get(get_timing).put(update_timing).delete(delete_timing),
        )
        .route_layer(middleware::from_fn_with_state(jwt, require_auth))
}

/// Timing routes living under `/api/stages`.
pub fn stage_routes(jwt: JwtKeys) -> Router<AppState> {
    Router::new()
        .route("/:id/bonuses", post(reapply_bonuses))
        .route_layer(middleware::from_fn_with_state(jwt, require_auth))
}
