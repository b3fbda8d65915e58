use axum::Router;

use crate::features::{auth, categories, health, participants, results, stages, timings};
use crate::state::AppState;

/// Every HTTP route of the service, with state attached.
pub fn api_router(state: AppState) -> Router {
    let jwt = state.jwt.clone();

    let stage_routes = stages::routes::routes(jwt.clone())
        .merge(results::routes::stage_routes())
        .merge(timings::routes::stage_routes(jwt.clone()));

    let api = Router::new()
        .nest("/categories", categories::routes::routes(jwt.clone()))
        .nest("/stages", stage_routes)
        .nest("/participants", participants::routes::routes(jwt.clone()))
        .nest("/timings", timings::routes::routes(jwt.clone()))
        .nest("/auth", auth::routes::routes(jwt))
        .merge(results::routes::routes());

    Router::new()
        .nest("/api", api)
        .merge(health::routes::routes())
        .with_state(state)
}
