use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Participant {
    pub participant_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    /// Race number. Kept as text: "007" and "7" are different bibs.
    pub bib: Option<String>,
    pub birth_date: NaiveDate,
    pub category_id: i32,
    pub team: Option<String>,
    pub community: Option<String>,
    pub payment_method: String,
    pub proof_of_payment_path: Option<String>,
    pub id_front_path: Option<String>,
    pub id_back_path: Option<String>,
    pub authorization_path: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Participant {
    /// Every stored document path, for cleanup when the participant goes away.
    pub fn document_paths(&self) -> Vec<String> {
        [
            &self.proof_of_payment_path,
            &self.id_front_path,
            &self.id_back_path,
            &self.authorization_path,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }
}
