use chrono::NaiveTime;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::timing::{TimingFilter, TimingInput};
use crate::error::{Result, StorageError};
use crate::models::TimingRecord;
use crate::timing::{StageEntry, StageResult};

const TIMING_COLUMNS: &str = r#"
    timing_id, participant_id, stage_id, raw_ms, penalty_ms, start_offset_ms, bonus_ms,
    final_ms, position, note, created_at, updated_at
"#;

const DUPLICATE_PAIR: &str = "Participant already has a time recorded for this stage";

#[derive(FromRow)]
struct StageEntryRow {
    timing_id: i64,
    raw_ms: i64,
    penalty_ms: i64,
    category_start: NaiveTime,
}

/// Where a participant starts, seen from one stage.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ParticipantSlot {
    pub category_id: i32,
    pub category_start: NaiveTime,
    /// Whether the participant's category is linked to the stage.
    pub races_stage: bool,
}

/// Repository for TimingRecord database operations
pub struct TimingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TimingRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &TimingFilter) -> Result<(Vec<TimingRecord>, i64)> {
        let pagination = filter.pagination();

        let mut count = QueryBuilder::<Postgres>::new(
            r#"
            SELECT COUNT(*)
            FROM timing_records t
            INNER JOIN participants p ON p.participant_id = t.participant_id
            WHERE 1=1
            "#,
        );
        push_filters(&mut count, filter);
        let total_items = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT t.timing_id, t.participant_id, t.stage_id, t.raw_ms, t.penalty_ms,
                   t.start_offset_ms, t.bonus_ms, t.final_ms, t.position, t.note,
                   t.created_at, t.updated_at
            FROM timing_records t
            INNER JOIN participants p ON p.participant_id = t.participant_id
            WHERE 1=1
            "#,
        );
        push_filters(&mut query, filter);
        query.push(" ORDER BY t.stage_id, t.position NULLS LAST, t.timing_id LIMIT ");
        query.push_bind(pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(pagination.offset());

        let records = query
            .build_query_as::<TimingRecord>()
            .fetch_all(self.pool)
            .await?;

        Ok((records, total_items))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<TimingRecord> {
        let record = sqlx::query_as::<_, TimingRecord>(&format!(
            "SELECT {TIMING_COLUMNS} FROM timing_records WHERE timing_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(record)
    }

    pub async fn find_by_pair(
        &self,
        participant_id: Uuid,
        stage_id: i32,
    ) -> Result<Option<TimingRecord>> {
        let record = sqlx::query_as::<_, TimingRecord>(&format!(
            "SELECT {TIMING_COLUMNS} FROM timing_records WHERE participant_id = $1 AND stage_id = $2"
        ))
        .bind(participant_id)
        .bind(stage_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    pub async fn participant_slot(
        &self,
        participant_id: Uuid,
        stage_id: i32,
    ) -> Result<Option<ParticipantSlot>> {
        let slot = sqlx::query_as::<_, ParticipantSlot>(
            r#"
            SELECT c.category_id,
                   c.start_time AS category_start,
                   EXISTS(
                       SELECT 1 FROM stage_categories sc
                       WHERE sc.stage_id = $2 AND sc.category_id = c.category_id
                   ) AS races_stage
            FROM participants p
            INNER JOIN categories c ON c.category_id = p.category_id
            WHERE p.participant_id = $1
            "#,
        )
        .bind(participant_id)
        .bind(stage_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(slot)
    }

    /// Insert a record. Derived columns start from the unranked final time
    /// and are rewritten by the next ranking pass.
    pub async fn insert(&self, input: &TimingInput, start_offset_ms: i64) -> Result<TimingRecord> {
        let record = sqlx::query_as::<_, TimingRecord>(&format!(
            r#"
            INSERT INTO timing_records (
                participant_id, stage_id, raw_ms, penalty_ms, start_offset_ms, bonus_ms,
                final_ms, position, note
            )
            VALUES ($1, $2, $3, $4, $5, 0, $3 + $5 + $4, NULL, $6)
            RETURNING {TIMING_COLUMNS}
            "#
        ))
        .bind(input.participant_id)
        .bind(input.stage_id)
        .bind(input.raw_ms)
        .bind(input.penalty_ms)
        .bind(start_offset_ms)
        .bind(&input.note)
        .fetch_one(self.pool)
        .await
        .map_err(|e| StorageError::from(e).on_unique_violation(DUPLICATE_PAIR))?;

        Ok(record)
    }

    pub async fn update(
        &self,
        id: i64,
        input: &TimingInput,
        start_offset_ms: i64,
    ) -> Result<TimingRecord> {
        let record = sqlx::query_as::<_, TimingRecord>(&format!(
            r#"
            UPDATE timing_records
            SET participant_id = $2, stage_id = $3, raw_ms = $4, penalty_ms = $5,
                start_offset_ms = $6, bonus_ms = 0, final_ms = $4 + $6 + $5,
                position = NULL, note = $7, updated_at = CURRENT_TIMESTAMP
            WHERE timing_id = $1
            RETURNING {TIMING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.participant_id)
        .bind(input.stage_id)
        .bind(input.raw_ms)
        .bind(input.penalty_ms)
        .bind(start_offset_ms)
        .bind(&input.note)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| StorageError::from(e).on_unique_violation(DUPLICATE_PAIR))?
        .ok_or(StorageError::NotFound)?;

        Ok(record)
    }

    /// Replace a record by deleting and re-inserting it under the same
    /// identifier, in one transaction. Keeps `created_at`.
    pub async fn recreate(
        &self,
        id: i64,
        input: &TimingInput,
        start_offset_ms: i64,
    ) -> Result<TimingRecord> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_as::<_, TimingRecord>(&format!(
            "DELETE FROM timing_records WHERE timing_id = $1 RETURNING {TIMING_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::NotFound)?;

        let record = sqlx::query_as::<_, TimingRecord>(&format!(
            r#"
            INSERT INTO timing_records (
                timing_id, participant_id, stage_id, raw_ms, penalty_ms, start_offset_ms,
                bonus_ms, final_ms, position, note, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 0, $4 + $6 + $5, NULL, $7, $8, CURRENT_TIMESTAMP)
            RETURNING {TIMING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.participant_id)
        .bind(input.stage_id)
        .bind(input.raw_ms)
        .bind(input.penalty_ms)
        .bind(start_offset_ms)
        .bind(&input.note)
        .bind(previous.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::from(e).on_unique_violation(DUPLICATE_PAIR))?;

        tx.commit().await?;

        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<TimingRecord> {
        let record = sqlx::query_as::<_, TimingRecord>(&format!(
            "DELETE FROM timing_records WHERE timing_id = $1 RETURNING {TIMING_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(record)
    }

    /// Stages in which a participant has a recorded time
    pub async fn stage_ids_for_participant(&self, participant_id: Uuid) -> Result<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT DISTINCT stage_id FROM timing_records WHERE participant_id = $1 ORDER BY stage_id",
        )
        .bind(participant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Ranking inputs of every record of a stage, or `None` once the stage
    /// is gone.
    pub async fn stage_entries(&self, stage_id: i32) -> Result<Option<Vec<StageEntry>>> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stages WHERE stage_id = $1)",
        )
        .bind(stage_id)
        .fetch_one(&mut *tx)
        .await?;

        if !exists {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, StageEntryRow>(
            r#"
            SELECT t.timing_id, t.raw_ms, t.penalty_ms, c.start_time AS category_start
            FROM timing_records t
            INNER JOIN participants p ON p.participant_id = t.participant_id
            INNER JOIN categories c ON c.category_id = p.category_id
            WHERE t.stage_id = $1
            ORDER BY t.timing_id
            "#,
        )
        .bind(stage_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(
            rows.into_iter()
                .map(|row| StageEntry {
                    timing_id: row.timing_id,
                    raw_ms: row.raw_ms,
                    penalty_ms: row.penalty_ms,
                    category_start: row.category_start,
                })
                .collect(),
        ))
    }

    /// Persist a ranking pass in one transaction. Returns `false` without
    /// writing when the stage has been deleted in the meantime.
    pub async fn apply_stage_results(&self, stage_id: i32, results: &[StageResult]) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, i32>(
            "SELECT stage_id FROM stages WHERE stage_id = $1 FOR SHARE",
        )
        .bind(stage_id)
        .fetch_optional(&mut *tx)
        .await?;

        if locked.is_none() {
            return Ok(false);
        }

        let ids: Vec<i64> = results.iter().map(|r| r.timing_id).collect();
        let offsets: Vec<i64> = results.iter().map(|r| r.start_offset_ms).collect();
        let bonuses: Vec<i64> = results.iter().map(|r| r.bonus_ms).collect();
        let finals: Vec<i64> = results.iter().map(|r| r.final_ms).collect();
        let positions: Vec<i32> = results.iter().map(|r| r.position).collect();

        sqlx::query(
            r#"
            UPDATE timing_records t
            SET start_offset_ms = r.start_offset_ms,
                bonus_ms = r.bonus_ms,
                final_ms = r.final_ms,
                position = r.position
            FROM UNNEST($2::bigint[], $3::bigint[], $4::bigint[], $5::bigint[], $6::int[])
                AS r(timing_id, start_offset_ms, bonus_ms, final_ms, position)
            WHERE t.timing_id = r.timing_id AND t.stage_id = $1
            "#,
        )
        .bind(stage_id)
        .bind(&ids)
        .bind(&offsets)
        .bind(&bonuses)
        .bind(&finals)
        .bind(&positions)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(true)
    }
}

fn push_filters<'q>(query: &mut QueryBuilder<'q, Postgres>, filter: &TimingFilter) {
    if let Some(stage_id) = filter.stage_id {
        query.push(" AND t.stage_id = ");
        query.push_bind(stage_id);
    }

    if let Some(category_id) = filter.category_id {
        query.push(" AND p.category_id = ");
        query.push_bind(category_id);
    }
}
