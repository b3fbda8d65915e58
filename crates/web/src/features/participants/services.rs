use chrono::NaiveDate;
use raceday_storage::{
    Database,
    documents::{ALLOWED_CONTENT_TYPES, DocumentStore, document_name},
    dto::{
        common::PaginatedResponse,
        participant::{
            BibAvailability, CreateParticipantRequest, DocumentPaths, ParticipantFilter,
            ParticipantResponse, UpdateParticipantRequest,
        },
    },
    error::{Result, StorageError},
    models::Participant,
    repository::{
        category::CategoryRepository,
        participant::{ParticipantFields, ParticipantRepository},
        timing::TimingRepository,
    },
    services::{eligibility::EligibilityRules, identity, timing::TimingService},
};
use uuid::Uuid;

/// A file received with a registration.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Parsed multipart registration.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub participant: CreateParticipantRequest,
    pub proof_of_payment: Option<UploadedDocument>,
    pub id_front: Option<UploadedDocument>,
    pub id_back: Option<UploadedDocument>,
    pub authorization: Option<UploadedDocument>,
}

impl RegistrationForm {
    /// Public registrations must carry the payment proof, both sides of the
    /// ID and the community. Every document must be an image or a PDF.
    pub fn check_required(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("proof_of_payment", self.proof_of_payment.is_some()),
            ("id_front", self.id_front.is_some()),
            ("id_back", self.id_back.is_some()),
        ]
        .into_iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(StorageError::InvalidInput(format!(
                "Missing required documents: {}",
                missing.join(", ")
            )));
        }

        if self
            .participant
            .community
            .as_deref()
            .is_none_or(|c| c.trim().is_empty())
        {
            return Err(StorageError::InvalidInput("community is required".to_string()));
        }

        let documents = [
            &self.proof_of_payment,
            &self.id_front,
            &self.id_back,
            &self.authorization,
        ];
        if let Some(upload) = documents
            .into_iter()
            .flatten()
            .find(|upload| !ALLOWED_CONTENT_TYPES.contains(&upload.content_type.as_str()))
        {
            return Err(StorageError::InvalidInput(format!(
                "Unsupported document type: {}",
                upload.content_type
            )));
        }

        Ok(())
    }
}

pub async fn list_participants(
    db: &Database,
    filter: &ParticipantFilter,
) -> Result<PaginatedResponse<ParticipantResponse>> {
    let pagination = filter.pagination();
    pagination.validate().map_err(StorageError::InvalidInput)?;

    let (participants, total_items) = ParticipantRepository::new(db.pool()).list(filter).await?;
    let data = participants.into_iter().map(ParticipantResponse::from).collect();

    Ok(PaginatedResponse::new(data, pagination, total_items))
}

pub async fn get_participant(db: &Database, id: Uuid) -> Result<Participant> {
    ParticipantRepository::new(db.pool()).find_by_id(id).await
}

pub async fn get_participant_by_bib(db: &Database, bib: &str) -> Result<Participant> {
    ParticipantRepository::new(db.pool()).find_by_bib(bib).await
}

pub async fn bib_availability(db: &Database, bib: &str) -> Result<BibAvailability> {
    let taken = ParticipantRepository::new(db.pool())
        .bib_taken(bib, None)
        .await?;

    Ok(BibAvailability {
        bib: bib.to_string(),
        available: !taken,
    })
}

pub async fn list_teams(db: &Database) -> Result<Vec<String>> {
    ParticipantRepository::new(db.pool()).list_teams().await
}

pub async fn create_participant(
    db: &Database,
    request: &CreateParticipantRequest,
) -> Result<Participant> {
    let fields = fields_from_request(request);
    ensure_unique(db, &fields, None).await?;
    ensure_category(db, fields.category_id).await?;

    let participant = ParticipantRepository::new(db.pool())
        .create(&fields, &DocumentPaths::default())
        .await?;
    tracing::info!(participant_id = %participant.participant_id, "Participant created");

    Ok(participant)
}

/// Update a participant. A category change moves their start offset, so
/// every stage they have a time in is re-ranked.
pub async fn update_participant(
    db: &Database,
    timing: &TimingService,
    id: Uuid,
    request: &UpdateParticipantRequest,
) -> Result<Participant> {
    let repo = ParticipantRepository::new(db.pool());
    let current = repo.find_by_id(id).await?;

    let fields = ParticipantFields {
        first_name: request.first_name.clone().unwrap_or(current.first_name),
        last_name: request.last_name.clone().unwrap_or(current.last_name),
        national_id: request.national_id.clone().unwrap_or(current.national_id),
        bib: request.bib.clone().or(current.bib),
        birth_date: request.birth_date.unwrap_or(current.birth_date),
        category_id: request.category_id.unwrap_or(current.category_id),
        team: request.team.clone().or(current.team),
        community: request.community.clone().or(current.community),
        payment_method: request.payment_method.clone().unwrap_or(current.payment_method),
    };

    ensure_unique(db, &fields, Some(id)).await?;
    if fields.category_id != current.category_id {
        ensure_category(db, fields.category_id).await?;
    }

    let participant = repo.update(id, &fields).await?;

    if participant.category_id != current.category_id {
        let stage_ids = TimingRepository::new(db.pool())
            .stage_ids_for_participant(id)
            .await?;
        timing.recalculate_all(&stage_ids).await;
    }

    Ok(participant)
}

/// Delete a participant with their timing records and documents.
pub async fn delete_participant(
    db: &Database,
    timing: &TimingService,
    documents: &dyn DocumentStore,
    id: Uuid,
) -> Result<()> {
    let stage_ids = TimingRepository::new(db.pool())
        .stage_ids_for_participant(id)
        .await?;

    let participant = ParticipantRepository::new(db.pool()).delete(id).await?;
    tracing::info!(participant_id = %id, "Participant deleted");

    let paths = participant.document_paths();
    if let Err(e) = documents.delete_many(&paths).await {
        tracing::warn!(participant_id = %id, ?paths, error = %e, "Could not remove participant documents");
    }

    timing.recalculate_all(&stage_ids).await;
    Ok(())
}

/// Public self-registration: check eligibility and uniqueness, store the
/// documents, then insert the participant.
///
/// The uploads and the insert are not one transaction. When the insert fails
/// the uploaded files are removed; if that cleanup fails too they are logged
/// as orphans.
pub async fn register_participant(
    db: &Database,
    documents: &dyn DocumentStore,
    rules: EligibilityRules,
    form: RegistrationForm,
    today: NaiveDate,
    stamp: i64,
) -> Result<Participant> {
    form.check_required()?;
    rules.check(
        form.participant.birth_date,
        today,
        form.authorization.is_some(),
    )?;

    let fields = fields_from_request(&form.participant);
    ensure_unique(db, &fields, None).await?;
    ensure_category(db, fields.category_id).await?;

    let owner = fields.national_id.clone();
    let uploads = [
        ("payments", "proof_of_payment", &form.proof_of_payment),
        ("ids", "id_front", &form.id_front),
        ("ids", "id_back", &form.id_back),
        ("authorizations", "authorization", &form.authorization),
    ];

    let mut stored = DocumentPaths::default();
    for (folder, kind, upload) in uploads {
        let Some(upload) = upload else { continue };

        let name = document_name(&owner, kind, upload.file_name.as_deref(), stamp);
        let path = match documents
            .put(folder, &name, &upload.bytes, &upload.content_type)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                discard_uploads(documents, &stored).await;
                return Err(e);
            }
        };

        match kind {
            "proof_of_payment" => stored.proof_of_payment = Some(path),
            "id_front" => stored.id_front = Some(path),
            "id_back" => stored.id_back = Some(path),
            _ => stored.authorization = Some(path),
        }
    }

    match ParticipantRepository::new(db.pool())
        .create(&fields, &stored)
        .await
    {
        Ok(participant) => {
            tracing::info!(participant_id = %participant.participant_id, "Participant registered");
            Ok(participant)
        }
        Err(e) => {
            discard_uploads(documents, &stored).await;
            Err(e)
        }
    }
}

async fn discard_uploads(documents: &dyn DocumentStore, stored: &DocumentPaths) {
    let paths = stored.all();
    if paths.is_empty() {
        return;
    }

    if let Err(e) = documents.delete_many(&paths).await {
        tracing::error!(?paths, error = %e, "Orphaned registration documents left in storage");
    }
}

fn fields_from_request(request: &CreateParticipantRequest) -> ParticipantFields {
    ParticipantFields {
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        national_id: request.national_id.trim().to_string(),
        bib: request.bib.as_deref().map(str::trim).map(str::to_string),
        birth_date: request.birth_date,
        category_id: request.category_id,
        team: request.team.clone().filter(|t| !t.trim().is_empty()),
        community: request.community.clone().filter(|c| !c.trim().is_empty()),
        payment_method: request.payment_method.trim().to_string(),
    }
}

/// National ID and bib conflicts are reported before anything is written.
async fn ensure_unique(db: &Database, fields: &ParticipantFields, except: Option<Uuid>) -> Result<()> {
    let repo = ParticipantRepository::new(db.pool());
    identity::ensure_unique(&repo, &fields.national_id, fields.bib.as_deref(), except).await
}

async fn ensure_category(db: &Database, category_id: i32) -> Result<()> {
    match CategoryRepository::new(db.pool()).find_by_id(category_id).await {
        Ok(_) => Ok(()),
        Err(StorageError::NotFound) => Err(StorageError::InvalidInput(format!(
            "Category {category_id} does not exist"
        ))),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        let document = UploadedDocument {
            file_name: Some("scan.jpg".to_string()),
            content_type: "image/jpeg".to_string(),
            bytes: vec![1, 2, 3],
        };

        RegistrationForm {
            participant: CreateParticipantRequest {
                first_name: "Luis".to_string(),
                last_name: "Condori".to_string(),
                national_id: "1234567".to_string(),
                bib: None,
                birth_date: NaiveDate::from_ymd_opt(2012, 3, 3).unwrap(),
                category_id: 1,
                team: None,
                community: Some("Achacachi".to_string()),
                payment_method: "cash".to_string(),
            },
            proof_of_payment: Some(document.clone()),
            id_front: Some(document.clone()),
            id_back: Some(document),
            authorization: None,
        }
    }

    #[test]
    fn test_complete_form_passes() {
        assert!(form().check_required().is_ok());
    }

    #[test]
    fn test_missing_id_back_named() {
        let mut form = form();
        form.id_back = None;

        match form.check_required() {
            Err(StorageError::InvalidInput(msg)) => assert!(msg.contains("id_back")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_community_required_for_registration() {
        let mut form = form();
        form.participant.community = Some("  ".to_string());
        assert!(form.check_required().is_err());
    }

    #[test]
    fn test_unsupported_document_type_rejected() {
        let mut form = form();
        if let Some(ref mut doc) = form.id_front {
            doc.content_type = "text/html".to_string();
        }

        match form.check_required() {
            Err(StorageError::InvalidInput(msg)) => assert!(msg.contains("text/html")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_fields_are_trimmed_and_bib_kept_verbatim() {
        let mut request = form().participant;
        request.first_name = "  Luis ".to_string();
        request.bib = Some("007".to_string());
        request.team = Some(String::new());

        let fields = fields_from_request(&request);
        assert_eq!(fields.first_name, "Luis");
        assert_eq!(fields.bib.as_deref(), Some("007"));
        assert_eq!(fields.team, None);
    }
}
