use chrono::NaiveTime;
use sqlx::PgPool;

use crate::error::{Result, StorageError};
use crate::models::{Category, NormalizedName};

const DUPLICATE_NAME: &str = "A category with this name already exists";

/// Repository for Category database operations
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories in start order
    pub async fn list(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT category_id, name, start_time, created_at
            FROM categories
            ORDER BY start_time, name
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT category_id, name, start_time, created_at
            FROM categories
            WHERE category_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(category)
    }

    pub async fn create(&self, name: &NormalizedName, start_time: NaiveTime) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, start_time)
            VALUES ($1, $2)
            RETURNING category_id, name, start_time, created_at
            "#,
        )
        .bind(name.as_str())
        .bind(start_time)
        .fetch_one(self.pool)
        .await
        .map_err(|e| StorageError::from(e).on_unique_violation(DUPLICATE_NAME))?;

        Ok(category)
    }

    pub async fn update(
        &self,
        id: i32,
        name: &NormalizedName,
        start_time: NaiveTime,
    ) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $2, start_time = $3
            WHERE category_id = $1
            RETURNING category_id, name, start_time, created_at
            "#,
        )
        .bind(id)
        .bind(name.as_str())
        .bind(start_time)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| StorageError::from(e).on_unique_violation(DUPLICATE_NAME))?
        .ok_or(StorageError::NotFound)?;

        Ok(category)
    }

    /// Delete a category. Fails while participants are still enrolled in it.
    pub async fn delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE category_id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                let err = StorageError::from(e);
                if err.is_foreign_key_violation() {
                    StorageError::ConstraintViolation(
                        "Category still has participants".to_string(),
                    )
                } else {
                    err
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    /// Earliest scheduled start among all categories, read fresh on every call.
    pub async fn base_start_time(&self) -> Result<Option<NaiveTime>> {
        let base = sqlx::query_scalar::<_, Option<NaiveTime>>(
            "SELECT MIN(start_time) FROM categories",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(base)
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
