use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::handlers::{
    create_category, delete_category, get_base_start, get_category, list_categories,
    update_category,
};
use crate::middleware::auth::{JwtKeys, require_auth};
use crate::state::AppState;

pub fn routes(jwt: JwtKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_category))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route_layer(middleware::from_fn_with_state(jwt, require_auth));

    Router::new()
        .route("/", get(list_categories))
        .route("/base-start", get(get_base_start))
        .merge(protected)
}
