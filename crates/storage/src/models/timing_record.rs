use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One stopwatch reading of one participant in one stage.
///
/// `raw_ms` and `penalty_ms` are operator inputs. `start_offset_ms`,
/// `bonus_ms`, `final_ms` and `position` are derived and rewritten by every
/// ranking pass of the stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TimingRecord {
    pub timing_id: i64,
    pub participant_id: Uuid,
    pub stage_id: i32,
    pub raw_ms: i64,
    pub penalty_ms: i64,
    pub start_offset_ms: i64,
    pub bonus_ms: i64,
    pub final_ms: i64,
    pub position: Option<i32>,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
