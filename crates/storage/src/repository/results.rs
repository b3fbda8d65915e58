use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::dto::results::{ResultsSummary, StageResultEntry};
use crate::error::Result;
use crate::timing::StageTime;

/// Participant columns shown next to standings.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantLabel {
    pub participant_id: Uuid,
    pub bib: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub team: Option<String>,
}

#[derive(FromRow)]
struct StageTimeRow {
    participant_id: Uuid,
    bib: Option<String>,
    final_ms: i64,
}

/// Read-only queries behind the public results pages
pub struct ResultsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ResultsRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Leaderboard of a stage, in ranking order
    pub async fn stage_leaderboard(&self, stage_id: i32) -> Result<Vec<StageResultEntry>> {
        let entries = sqlx::query_as::<_, StageResultEntry>(
            r#"
            SELECT t.timing_id, t.position, p.participant_id, p.bib, p.first_name, p.last_name,
                   p.team, c.category_id, c.name AS category_name, t.raw_ms, t.penalty_ms,
                   t.start_offset_ms, t.bonus_ms, t.final_ms, t.note
            FROM timing_records t
            INNER JOIN participants p ON p.participant_id = t.participant_id
            INNER JOIN categories c ON c.category_id = p.category_id
            WHERE t.stage_id = $1
            ORDER BY t.position NULLS LAST, t.final_ms, t.timing_id
            "#,
        )
        .bind(stage_id)
        .fetch_all(self.pool)
        .await?;

        Ok(entries
            .into_iter()
            .map(StageResultEntry::with_formatted_time)
            .collect())
    }

    pub async fn stage_final_times(&self, stage_id: i32) -> Result<Vec<i64>> {
        let times = sqlx::query_scalar::<_, i64>(
            "SELECT final_ms FROM timing_records WHERE stage_id = $1",
        )
        .bind(stage_id)
        .fetch_all(self.pool)
        .await?;

        Ok(times)
    }

    /// Final times of every participant of a category, across all stages
    pub async fn category_stage_times(&self, category_id: i32) -> Result<Vec<StageTime>> {
        let rows = sqlx::query_as::<_, StageTimeRow>(
            r#"
            SELECT p.participant_id, p.bib, t.final_ms
            FROM timing_records t
            INNER JOIN participants p ON p.participant_id = t.participant_id
            WHERE p.category_id = $1
            "#,
        )
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StageTime {
                participant_id: row.participant_id,
                bib: row.bib,
                final_ms: row.final_ms,
            })
            .collect())
    }

    pub async fn category_participants(&self, category_id: i32) -> Result<Vec<ParticipantLabel>> {
        let labels = sqlx::query_as::<_, ParticipantLabel>(
            r#"
            SELECT participant_id, bib, first_name, last_name, team
            FROM participants
            WHERE category_id = $1
            "#,
        )
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;

        Ok(labels)
    }

    pub async fn summary(&self) -> Result<ResultsSummary> {
        let summary = sqlx::query_as::<_, ResultsSummary>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM categories) AS categories,
                (SELECT COUNT(*) FROM stages WHERE is_active) AS active_stages,
                (SELECT COUNT(*) FROM participants) AS participants,
                (SELECT COUNT(*) FROM timing_records) AS timings,
                (SELECT COUNT(DISTINCT participant_id) FROM timing_records) AS participants_with_times,
                EXISTS(SELECT 1 FROM timing_records) AS has_results
            "#,
        )
        .fetch_one(self.pool)
        .await?;

        Ok(summary)
    }
}
