use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use super::handlers::{
    bib_availability, create_participant, delete_participant, get_participant,
    get_participant_by_bib, list_participants, list_teams, register_participant,
    update_participant,
};
use crate::middleware::auth::{JwtKeys, require_auth};
use crate::state::AppState;

/// Four scanned documents fit comfortably under this.
const REGISTRATION_BODY_LIMIT: usize = 25 * 1024 * 1024;

pub fn routes(jwt: JwtKeys) -> Router<AppState> {
    let protected = Router::new()
        .route("/", get(list_participants).post(create_participant))
        .route(
            "/:id",
            get(get_participant)
                .put(update_participant)
                .delete(delete_participant),
        )
        .route("/bib/:bib", get(get_participant_by_bib))
        .route("/bib/:bib/availability", get(bib_availability))
        .route_layer(middleware::from_fn_with_state(jwt, require_auth));

    Router::new()
        .route(
            "/register",
            post(register_participant).layer(DefaultBodyLimit::max(REGISTRATION_BODY_LIMIT)),
        )
        .route("/teams", get(list_teams))
        .merge(protected)
}
