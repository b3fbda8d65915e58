use std::sync::Arc;

use axum::extract::FromRef;
use raceday_storage::{
    Database, documents::DocumentStore, services::eligibility::EligibilityRules,
    services::timing::TimingService,
};

use crate::middleware::auth::JwtKeys;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub timing: TimingService,
    pub documents: Arc<dyn DocumentStore>,
    pub jwt: JwtKeys,
    pub eligibility: EligibilityRules,
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for TimingService {
    fn from_ref(state: &AppState) -> Self {
        state.timing.clone()
    }
}

impl FromRef<AppState> for Arc<dyn DocumentStore> {
    fn from_ref(state: &AppState) -> Self {
        state.documents.clone()
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
