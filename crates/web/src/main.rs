use std::sync::Arc;

use anyhow::Context;
use raceday_storage::{
    Database, documents::LocalDocumentStore, services::eligibility::EligibilityRules,
    services::timing::TimingService,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod middleware;
mod routes;
mod state;

use config::Config;
use features::{auth, categories, health, participants, results, stages, timings};
use middleware::auth::JwtKeys;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        categories::handlers::list_categories,
        categories::handlers::get_base_start,
        categories::handlers::get_category,
        categories::handlers::create_category,
        categories::handlers::update_category,
        categories::handlers::delete_category,
        stages::handlers::list_active_stages,
        stages::handlers::list_all_stages,
        stages::handlers::get_stage,
        stages::handlers::create_stage,
        stages::handlers::update_stage,
        stages::handlers::delete_stage,
        participants::handlers::register_participant,
        participants::handlers::list_teams,
        participants::handlers::list_participants,
        participants::handlers::create_participant,
        participants::handlers::get_participant,
        participants::handlers::update_participant,
        participants::handlers::delete_participant,
        participants::handlers::get_participant_by_bib,
        participants::handlers::bib_availability,
        timings::handlers::list_timings,
        timings::handlers::get_timing,
        timings::handlers::create_timing,
        timings::handlers::update_timing,
        timings::handlers::delete_timing,
        timings::handlers::reapply_bonuses,
        results::handlers::stage_leaderboard,
        results::handlers::stage_stats,
        results::handlers::classification,
        results::handlers::bonuses,
        results::handlers::summary,
        auth::handlers::login,
        auth::handlers::me,
        health::handlers::health,
    ),
    components(
        schemas(
            raceday_storage::dto::category::CreateCategoryRequest,
            raceday_storage::dto::category::UpdateCategoryRequest,
            raceday_storage::dto::category::CategoryResponse,
            raceday_storage::dto::category::BaseStartResponse,
            raceday_storage::dto::stage::CreateStageRequest,
            raceday_storage::dto::stage::UpdateStageRequest,
            raceday_storage::dto::stage::StageResponse,
            raceday_storage::dto::participant::CreateParticipantRequest,
            raceday_storage::dto::participant::UpdateParticipantRequest,
            raceday_storage::dto::participant::ParticipantResponse,
            raceday_storage::dto::participant::ParticipantDocuments,
            raceday_storage::dto::participant::BibAvailability,
            raceday_storage::dto::timing::CreateTimingRequest,
            raceday_storage::dto::timing::UpdateTimingRequest,
            raceday_storage::dto::timing::TimingResponse,
            raceday_storage::dto::timing::RecalculationStatus,
            raceday_storage::dto::timing::TimingMutationResponse,
            raceday_storage::dto::timing::TimingDeletedResponse,
            raceday_storage::dto::timing::StageRecalculationResponse,
            raceday_storage::dto::results::StageResultEntry,
            raceday_storage::dto::results::StageStats,
            raceday_storage::dto::results::ClassificationEntry,
            raceday_storage::dto::results::ClassificationResponse,
            raceday_storage::dto::results::ResultsSummary,
            raceday_storage::dto::auth::LoginRequest,
            raceday_storage::dto::auth::LoginResponse,
            raceday_storage::dto::auth::UserInfo,
            raceday_storage::dto::common::PaginationMeta,
            raceday_storage::timing::DurationInput,
            raceday_storage::timing::bonus::BonusEntry,
            participants::handlers::RegistrationUpload,
            health::handlers::HealthResponse,
        )
    ),
    tags(
        (name = "categories", description = "Categories and their start times"),
        (name = "stages", description = "Race stages"),
        (name = "participants", description = "Registration and participant management"),
        (name = "timings", description = "Stage time capture and corrections"),
        (name = "results", description = "Public leaderboards and classification"),
        (name = "auth", description = "Operator authentication"),
        (name = "health", description = "Liveness"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting race timing API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    error::expose_internal_details(!config.is_production());
    tracing::info!(environment = %config.environment, "Configuration loaded successfully");

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    match config.admin {
        Some(ref admin) => auth::services::ensure_admin(&db, admin)
            .await
            .context("Failed to create admin account")?,
        None => tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set; no operator account bootstrapped"),
    }

    tracing::info!(root = %config.document_root.display(), "Storing documents on local disk");

    let state = AppState {
        timing: TimingService::postgres(db.clone(), config.recalc_timeout()),
        db,
        documents: Arc::new(LocalDocumentStore::new(config.document_root.clone())),
        jwt: JwtKeys::new(&config.jwt_secret, config.jwt_expiration_secs),
        eligibility: EligibilityRules::new(config.min_birth_year),
    };

    let app = routes::api_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
