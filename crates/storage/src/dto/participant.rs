use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::PaginationParams;
use crate::models::Participant;

/// Request payload for creating a participant. Also the text part of a
/// public registration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateParticipantRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "First name must be between 1 and 255 characters"
    ))]
    pub first_name: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Last name must be between 1 and 255 characters"
    ))]
    pub last_name: String,

    #[validate(length(
        min = 1,
        max = 64,
        message = "National ID must be between 1 and 64 characters"
    ))]
    pub national_id: String,

    #[validate(custom(function = "validate_bib"))]
    pub bib: Option<String>,

    pub birth_date: NaiveDate,

    pub category_id: i32,

    #[validate(length(max = 255))]
    pub team: Option<String>,

    #[validate(length(max = 255))]
    pub community: Option<String>,

    #[validate(length(
        min = 1,
        max = 64,
        message = "Payment method must be between 1 and 64 characters"
    ))]
    pub payment_method: String,
}

/// Request payload for updating a participant
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateParticipantRequest {
    #[validate(length(min = 1, max = 255))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub last_name: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub national_id: Option<String>,

    #[validate(custom(function = "validate_bib"))]
    pub bib: Option<String>,

    pub birth_date: Option<NaiveDate>,

    pub category_id: Option<i32>,

    #[validate(length(max = 255))]
    pub team: Option<String>,

    #[validate(length(max = 255))]
    pub community: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub payment_method: Option<String>,
}

/// Bibs are free text so leading zeros survive, but only letters and digits
/// are printed on a race number.
fn validate_bib(bib: &str) -> Result<(), validator::ValidationError> {
    let valid = !bib.is_empty() && bib.len() <= 16 && bib.chars().all(|c| c.is_ascii_alphanumeric());

    if valid {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_bib"))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParticipantFilter {
    pub category_id: Option<i32>,
    /// Matches first name, last name, national ID or bib.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ParticipantFilter {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    pub participant_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub bib: Option<String>,
    pub birth_date: NaiveDate,
    pub category_id: i32,
    pub team: Option<String>,
    pub community: Option<String>,
    pub payment_method: String,
    pub documents: ParticipantDocuments,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantDocuments {
    pub proof_of_payment: Option<String>,
    pub id_front: Option<String>,
    pub id_back: Option<String>,
    pub authorization: Option<String>,
}

impl From<Participant> for ParticipantResponse {
    fn from(p: Participant) -> Self {
        Self {
            participant_id: p.participant_id,
            first_name: p.first_name,
            last_name: p.last_name,
            national_id: p.national_id,
            bib: p.bib,
            birth_date: p.birth_date,
            category_id: p.category_id,
            team: p.team,
            community: p.community,
            payment_method: p.payment_method,
            documents: ParticipantDocuments {
                proof_of_payment: p.proof_of_payment_path,
                id_front: p.id_front_path,
                id_back: p.id_back_path,
                authorization: p.authorization_path,
            },
            created_at: p.created_at,
        }
    }
}

/// Paths of documents uploaded with a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPaths {
    pub proof_of_payment: Option<String>,
    pub id_front: Option<String>,
    pub id_back: Option<String>,
    pub authorization: Option<String>,
}

impl DocumentPaths {
    pub fn all(&self) -> Vec<String> {
        [
            &self.proof_of_payment,
            &self.id_front,
            &self.id_back,
            &self.authorization,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BibAvailability {
    pub bib: String,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateParticipantRequest {
        CreateParticipantRequest {
            first_name: "Ana".to_string(),
            last_name: "Quispe Mamani".to_string(),
            national_id: "7654321".to_string(),
            bib: Some("007".to_string()),
            birth_date: NaiveDate::from_ymd_opt(2012, 4, 2).unwrap(),
            category_id: 1,
            team: None,
            community: Some("Sorata".to_string()),
            payment_method: "transfer".to_string(),
        }
    }

    #[test]
    fn test_valid_participant() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_bib_keeps_leading_zeros() {
        let req = request();
        assert_eq!(req.bib.as_deref(), Some("007"));
        assert_ne!(req.bib.as_deref(), Some("7"));
    }

    #[test]
    fn test_bib_rejects_symbols() {
        let mut req = request();
        req.bib = Some("#12".to_string());
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("bib"));
    }

    #[test]
    fn test_missing_national_id() {
        let mut req = request();
        req.national_id = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_document_paths_skip_missing() {
        let paths = DocumentPaths {
            proof_of_payment: Some("payments/a.pdf".to_string()),
            id_front: Some("ids/a_front.jpg".to_string()),
            id_back: None,
            authorization: None,
        };
        assert_eq!(paths.all().len(), 2);
    }
}
