use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::participant::{DocumentPaths, ParticipantFilter};
use crate::error::{Result, StorageError};
use crate::models::Participant;
use crate::services::identity::{DUPLICATE_BIB, DUPLICATE_NATIONAL_ID};

const PARTICIPANT_COLUMNS: &str = r#"
    participant_id, first_name, last_name, national_id, bib, birth_date, category_id,
    team, community, payment_method, proof_of_payment_path, id_front_path, id_back_path,
    authorization_path, created_at
"#;

/// Column values of a participant row, excluding documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantFields {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub bib: Option<String>,
    pub birth_date: NaiveDate,
    pub category_id: i32,
    pub team: Option<String>,
    pub community: Option<String>,
    pub payment_method: String,
}

/// Repository for Participant database operations
pub struct ParticipantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ParticipantRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &ParticipantFilter) -> Result<(Vec<Participant>, i64)> {
        let pagination = filter.pagination();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM participants WHERE 1=1");
        push_filters(&mut count, filter);
        let total_items = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE 1=1"
        ));
        push_filters(&mut query, filter);
        query.push(" ORDER BY last_name, first_name, participant_id LIMIT ");
        query.push_bind(pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(pagination.offset());

        let participants = query
            .build_query_as::<Participant>()
            .fetch_all(self.pool)
            .await?;

        Ok((participants, total_items))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE participant_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(participant)
    }

    /// Exact bib lookup: "007" never matches "7".
    pub async fn find_by_bib(&self, bib: &str) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE bib = $1"
        ))
        .bind(bib)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(participant)
    }

    pub async fn national_id_taken(&self, national_id: &str, except: Option<Uuid>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM participants
                WHERE national_id = $1 AND ($2::uuid IS NULL OR participant_id <> $2)
            )
            "#,
        )
        .bind(national_id)
        .bind(except)
        .fetch_one(self.pool)
        .await?;

        Ok(taken)
    }

    pub async fn bib_taken(&self, bib: &str, except: Option<Uuid>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM participants
                WHERE bib = $1 AND ($2::uuid IS NULL OR participant_id <> $2)
            )
            "#,
        )
        .bind(bib)
        .bind(except)
        .fetch_one(self.pool)
        .await?;

        Ok(taken)
    }

    pub async fn create(
        &self,
        fields: &ParticipantFields,
        documents: &DocumentPaths,
    ) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            r#"
            INSERT INTO participants (
                first_name, last_name, national_id, bib, birth_date, category_id, team,
                community, payment_method, proof_of_payment_path, id_front_path,
                id_back_path, authorization_path
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        ))
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.national_id)
        .bind(&fields.bib)
        .bind(fields.birth_date)
        .bind(fields.category_id)
        .bind(&fields.team)
        .bind(&fields.community)
        .bind(&fields.payment_method)
        .bind(&documents.proof_of_payment)
        .bind(&documents.id_front)
        .bind(&documents.id_back)
        .bind(&documents.authorization)
        .fetch_one(self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(participant)
    }

    pub async fn update(&self, id: Uuid, fields: &ParticipantFields) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            r#"
            UPDATE participants
            SET first_name = $2, last_name = $3, national_id = $4, bib = $5, birth_date = $6,
                category_id = $7, team = $8, community = $9, payment_method = $10
            WHERE participant_id = $1
            RETURNING {PARTICIPANT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.national_id)
        .bind(&fields.bib)
        .bind(fields.birth_date)
        .bind(fields.category_id)
        .bind(&fields.team)
        .bind(&fields.community)
        .bind(&fields.payment_method)
        .fetch_optional(self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or(StorageError::NotFound)?;

        Ok(participant)
    }

    /// Delete a participant, returning the row so its documents can be removed.
    pub async fn delete(&self, id: Uuid) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(&format!(
            "DELETE FROM participants WHERE participant_id = $1 RETURNING {PARTICIPANT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(participant)
    }

    /// Distinct team names, for registration form suggestions
    pub async fn list_teams(&self) -> Result<Vec<String>> {
        let teams = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT team
            FROM participants
            WHERE team IS NOT NULL AND team <> ''
            ORDER BY team
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(teams)
    }
}

fn push_filters<'q>(query: &mut QueryBuilder<'q, Postgres>, filter: &'q ParticipantFilter) {
    if let Some(category_id) = filter.category_id {
        query.push(" AND category_id = ");
        query.push_bind(category_id);
    }

    if let Some(ref search) = filter.search {
        let pattern = format!("%{}%", search.trim());
        query.push(" AND (first_name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR last_name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR national_id ILIKE ");
        query.push_bind(pattern);
        query.push(" OR bib = ");
        query.push_bind(search.trim());
        query.push(")");
    }
}

fn map_write_error(e: sqlx::Error) -> StorageError {
    let err = StorageError::from(e);

    if let StorageError::Database(sqlx::Error::Database(ref db_err)) = err {
        if db_err.code().as_deref() == Some("23505") {
            let message = unique_violation_message(db_err.constraint());
            return StorageError::ConstraintViolation(message.to_string());
        }
    }

    if err.is_foreign_key_violation() {
        return StorageError::InvalidInput("Unknown category".to_string());
    }

    err
}

/// The participants table has two unique keys; name the one that was hit.
fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("participants_bib_unique") => DUPLICATE_BIB,
        _ => DUPLICATE_NATIONAL_ID,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_names_the_key() {
        assert_eq!(unique_violation_message(Some("participants_bib_unique")), DUPLICATE_BIB);
        assert_eq!(
            unique_violation_message(Some("participants_national_id_key")),
            DUPLICATE_NATIONAL_ID
        );
        assert_eq!(unique_violation_message(None), DUPLICATE_NATIONAL_ID);
    }
}
