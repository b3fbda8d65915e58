use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use super::handlers::{
    create_stage, delete_stage, get_stage, list_active_stages, list_all_stages, update_stage,
};
use crate::middleware::auth::{JwtKeys, require_auth};
use crate::state::AppState;

pub fn routes(jwt: JwtKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_stage))
        .route("/all", get(list_all_stages))
        .route("/:id", put(update_stage).delete(delete_stage))
        .route_layer(middleware::from_fn_with_state(jwt, require_auth));

    Router::new()
        .route("/", get(list_active_stages))
        .route("/:id", get(get_stage))
        .merge(protected)
}
