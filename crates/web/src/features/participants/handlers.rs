use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use raceday_storage::{
    Database,
    documents::DocumentStore,
    dto::{
        common::PaginatedResponse,
        participant::{
            BibAvailability, CreateParticipantRequest, ParticipantFilter, ParticipantResponse,
            UpdateParticipantRequest,
        },
    },
    services::timing::TimingService,
};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services::{self, RegistrationForm, UploadedDocument};

/// Multipart body of a public registration.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct RegistrationUpload {
    first_name: String,
    last_name: String,
    national_id: String,
    bib: Option<String>,
    /// `YYYY-MM-DD`
    birth_date: String,
    category_id: i32,
    team: Option<String>,
    community: String,
    payment_method: String,
    #[schema(value_type = String, format = Binary)]
    proof_of_payment: Vec<u8>,
    #[schema(value_type = String, format = Binary)]
    id_front: Vec<u8>,
    #[schema(value_type = String, format = Binary)]
    id_back: Vec<u8>,
    /// Required for participants under 18
    #[schema(value_type = Option<String>, format = Binary)]
    authorization: Option<Vec<u8>>,
}

#[utoipa::path(
    post,
    path = "/api/participants/register",
    request_body(content = RegistrationUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Participant registered", body = ParticipantResponse),
        (status = 400, description = "Missing documents, invalid fields or not eligible"),
        (status = 409, description = "National ID or bib already registered")
    ),
    tag = "participants"
)]
pub async fn register_participant(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ParticipantResponse>), WebError> {
    let form = read_registration(multipart).await?;
    form.participant.validate()?;

    let now = Utc::now();
    let participant = services::register_participant(
        &state.db,
        state.documents.as_ref(),
        state.eligibility,
        form,
        now.date_naive(),
        now.timestamp_millis(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(participant.into())))
}

#[utoipa::path(
    get,
    path = "/api/participants/teams",
    responses(
        (status = 200, description = "Distinct team names", body = Vec<String>)
    ),
    tag = "participants"
)]
pub async fn list_teams(State(db): State<Database>) -> Result<Json<Vec<String>>, WebError> {
    Ok(Json(services::list_teams(&db).await?))
}

#[utoipa::path(
    get,
    path = "/api/participants",
    params(ParticipantFilter),
    responses(
        (status = 200, description = "Participants, paginated", body = PaginatedResponse<ParticipantResponse>),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants",
    security(("bearer_auth" = []))
)]
pub async fn list_participants(
    State(db): State<Database>,
    Query(filter): Query<ParticipantFilter>,
) -> Result<Json<PaginatedResponse<ParticipantResponse>>, WebError> {
    Ok(Json(services::list_participants(&db, &filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/participants",
    request_body = CreateParticipantRequest,
    responses(
        (status = 201, description = "Participant created", body = ParticipantResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "National ID or bib already registered"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants",
    security(("bearer_auth" = []))
)]
pub async fn create_participant(
    State(db): State<Database>,
    Json(request): Json<CreateParticipantRequest>,
) -> Result<(StatusCode, Json<ParticipantResponse>), WebError> {
    request.validate()?;

    let participant = services::create_participant(&db, &request).await?;

    Ok((StatusCode::CREATED, Json(participant.into())))
}

#[utoipa::path(
    get,
    path = "/api/participants/{id}",
    params(
        ("id" = Uuid, Path, description = "Participant ID")
    ),
    responses(
        (status = 200, description = "Participant found", body = ParticipantResponse),
        (status = 404, description = "Participant not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants",
    security(("bearer_auth" = []))
)]
pub async fn get_participant(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<ParticipantResponse>, WebError> {
    let participant = services::get_participant(&db, id).await?;
    Ok(Json(participant.into()))
}

#[utoipa::path(
    put,
    path = "/api/participants/{id}",
    params(
        ("id" = Uuid, Path, description = "Participant ID")
    ),
    request_body = UpdateParticipantRequest,
    responses(
        (status = 200, description = "Participant updated", body = ParticipantResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Participant not found"),
        (status = 409, description = "National ID or bib already registered"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants",
    security(("bearer_auth" = []))
)]
pub async fn update_participant(
    State(db): State<Database>,
    State(timing): State<TimingService>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateParticipantRequest>,
) -> Result<Json<ParticipantResponse>, WebError> {
    request.validate()?;

    let participant = services::update_participant(&db, &timing, id, &request).await?;

    Ok(Json(participant.into()))
}

#[utoipa::path(
    delete,
    path = "/api/participants/{id}",
    params(
        ("id" = Uuid, Path, description = "Participant ID")
    ),
    responses(
        (status = 204, description = "Participant, their times and documents deleted"),
        (status = 404, description = "Participant not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants",
    security(("bearer_auth" = []))
)]
pub async fn delete_participant(
    State(db): State<Database>,
    State(timing): State<TimingService>,
    State(documents): State<Arc<dyn DocumentStore>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, WebError> {
    services::delete_participant(&db, &timing, documents.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/participants/bib/{bib}",
    params(
        ("bib" = String, Path, description = "Bib number")
    ),
    responses(
        (status = 200, description = "Participant wearing this bib", body = ParticipantResponse),
        (status = 404, description = "No participant has this bib"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants",
    security(("bearer_auth" = []))
)]
pub async fn get_participant_by_bib(
    State(db): State<Database>,
    Path(bib): Path<String>,
) -> Result<Json<ParticipantResponse>, WebError> {
    let participant = services::get_participant_by_bib(&db, &bib).await?;
    Ok(Json(participant.into()))
}

#[utoipa::path(
    get,
    path = "/api/participants/bib/{bib}/availability",
    params(
        ("bib" = String, Path, description = "Bib number")
    ),
    responses(
        (status = 200, description = "Whether the bib is free", body = BibAvailability),
        (status = 401, description = "Unauthorized")
    ),
    tag = "participants",
    security(("bearer_auth" = []))
)]
pub async fn bib_availability(
    State(db): State<Database>,
    Path(bib): Path<String>,
) -> Result<Json<BibAvailability>, WebError> {
    Ok(Json(services::bib_availability(&db, &bib).await?))
}

const DOCUMENT_FIELDS: &[&str] = &["proof_of_payment", "id_front", "id_back", "authorization"];

async fn read_registration(mut multipart: Multipart) -> Result<RegistrationForm, WebError> {
    let mut text: HashMap<String, String> = HashMap::new();
    let mut files: HashMap<String, UploadedDocument> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if DOCUMENT_FIELDS.contains(&name.as_str()) {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| WebError::BadRequest(e.body_text()))?;

            // An empty file input is sent as a part with no content
            if !bytes.is_empty() {
                files.insert(
                    name,
                    UploadedDocument {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                );
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| WebError::BadRequest(e.body_text()))?;
            text.insert(name, value);
        }
    }

    Ok(RegistrationForm {
        participant: participant_from_fields(&text)?,
        proof_of_payment: files.remove("proof_of_payment"),
        id_front: files.remove("id_front"),
        id_back: files.remove("id_back"),
        authorization: files.remove("authorization"),
    })
}

fn participant_from_fields(
    fields: &HashMap<String, String>,
) -> Result<CreateParticipantRequest, WebError> {
    let required = |name: &str| {
        fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| WebError::BadRequest(format!("{name} is required")))
    };
    let optional = |name: &str| {
        fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let birth_date = NaiveDate::parse_from_str(&required("birth_date")?, "%Y-%m-%d")
        .map_err(|_| WebError::BadRequest("birth_date must be YYYY-MM-DD".to_string()))?;
    let category_id = required("category_id")?
        .parse::<i32>()
        .map_err(|_| WebError::BadRequest("category_id must be an integer".to_string()))?;

    Ok(CreateParticipantRequest {
        first_name: required("first_name")?,
        last_name: required("last_name")?,
        national_id: required("national_id")?,
        bib: optional("bib"),
        birth_date,
        category_id,
        team: optional("team"),
        community: optional("community"),
        payment_method: required("payment_method")?,
    })
}
