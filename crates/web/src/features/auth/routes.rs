use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::handlers::{login, me};
use crate::middleware::auth::{JwtKeys, require_auth};
use crate::state::AppState;

pub fn routes(jwt: JwtKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(jwt, require_auth));

    Router::new().route("/login", post(login)).merge(protected)
}
