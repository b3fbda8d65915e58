use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{Result, StorageError};
use crate::models::{NormalizedName, Stage, StageCategory};

const DUPLICATE_NUMBER: &str = "A stage with this number already exists";

/// Column values of a stage row, already normalized.
#[derive(Debug, Clone)]
pub struct StageFields {
    pub stage_number: i32,
    pub name: NormalizedName,
    pub description: Option<String>,
    pub distance_km: Option<Decimal>,
    pub is_active: bool,
}

/// Repository for Stage database operations
pub struct StageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StageRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List stages by number, optionally only the active ones
    pub async fn list(&self, active_only: bool) -> Result<Vec<Stage>> {
        let stages = sqlx::query_as::<_, Stage>(
            r#"
            SELECT stage_id, stage_number, name, description, distance_km, is_active, created_at
            FROM stages
            WHERE ($1 = FALSE OR is_active)
            ORDER BY stage_number
            "#,
        )
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(stages)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Stage> {
        let stage = sqlx::query_as::<_, Stage>(
            r#"
            SELECT stage_id, stage_number, name, description, distance_km, is_active, created_at
            FROM stages
            WHERE stage_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(stage)
    }

    pub async fn exists(&self, id: i32) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stages WHERE stage_id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn category_ids(&self, stage_id: i32) -> Result<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT category_id
            FROM stage_categories
            WHERE stage_id = $1
            ORDER BY category_id
            "#,
        )
        .bind(stage_id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Category links of every stage, keyed by stage
    pub async fn category_links(&self) -> Result<HashMap<i32, Vec<i32>>> {
        let links = sqlx::query_as::<_, StageCategory>(
            r#"
            SELECT stage_id, category_id
            FROM stage_categories
            ORDER BY stage_id, category_id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        let mut by_stage: HashMap<i32, Vec<i32>> = HashMap::new();
        for link in links {
            by_stage.entry(link.stage_id).or_default().push(link.category_id);
        }

        Ok(by_stage)
    }

    /// Insert a stage and link its categories in one transaction
    pub async fn create(&self, fields: &StageFields, category_ids: &[i32]) -> Result<Stage> {
        let mut tx = self.pool.begin().await?;

        let stage = sqlx::query_as::<_, Stage>(
            r#"
            INSERT INTO stages (stage_number, name, description, distance_km, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING stage_id, stage_number, name, description, distance_km, is_active, created_at
            "#,
        )
        .bind(fields.stage_number)
        .bind(fields.name.as_str())
        .bind(&fields.description)
        .bind(fields.distance_km)
        .bind(fields.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::from(e).on_unique_violation(DUPLICATE_NUMBER))?;

        link_categories(&mut tx, stage.stage_id, category_ids).await?;

        tx.commit().await?;

        Ok(stage)
    }

    /// Update a stage; `category_ids` replaces the linked set when given
    pub async fn update(
        &self,
        id: i32,
        fields: &StageFields,
        category_ids: Option<&[i32]>,
    ) -> Result<Stage> {
        let mut tx = self.pool.begin().await?;

        let stage = sqlx::query_as::<_, Stage>(
            r#"
            UPDATE stages
            SET stage_number = $2, name = $3, description = $4, distance_km = $5, is_active = $6
            WHERE stage_id = $1
            RETURNING stage_id, stage_number, name, description, distance_km, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(fields.stage_number)
        .bind(fields.name.as_str())
        .bind(&fields.description)
        .bind(fields.distance_km)
        .bind(fields.is_active)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::from(e).on_unique_violation(DUPLICATE_NUMBER))?
        .ok_or(StorageError::NotFound)?;

        if let Some(category_ids) = category_ids {
            sqlx::query("DELETE FROM stage_categories WHERE stage_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_categories(&mut tx, id, category_ids).await?;
        }

        tx.commit().await?;

        Ok(stage)
    }

    /// Delete a stage; its timing records go with it
    pub async fn delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query("DELETE FROM stages WHERE stage_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }
}

async fn link_categories(
    tx: &mut Transaction<'_, Postgres>,
    stage_id: i32,
    category_ids: &[i32],
) -> Result<()> {
    if category_ids.is_empty() {
        return Err(StorageError::InvalidInput(
            "A stage needs at least one category".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO stage_categories (stage_id, category_id)
        SELECT $1, category_id FROM UNNEST($2::int[]) AS ids(category_id)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(stage_id)
    .bind(category_ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        let err = StorageError::from(e);
        if err.is_foreign_key_violation() {
            StorageError::InvalidInput("Unknown category in category_ids".to_string())
        } else {
            err
        }
    })?;

    Ok(())
}
