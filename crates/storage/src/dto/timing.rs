use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::PaginationParams;
use crate::error::Result;
use crate::models::TimingRecord;
use crate::timing::{DurationInput, format_time, validate_duration, validate_penalty};

/// Request payload for recording a stage time
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTimingRequest {
    pub participant_id: Uuid,

    pub stage_id: i32,

    /// Stopwatch reading, milliseconds or `MM:SS.cc` / `HH:MM:SS.cc`.
    #[schema(value_type = String, example = "58:12.40")]
    pub raw_time: DurationInput,

    #[schema(value_type = Option<String>, example = "00:30.00")]
    pub penalty: Option<DurationInput>,

    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Request payload for correcting a stage time
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTimingRequest {
    pub participant_id: Option<Uuid>,

    pub stage_id: Option<i32>,

    #[schema(value_type = Option<String>)]
    pub raw_time: Option<DurationInput>,

    #[schema(value_type = Option<String>)]
    pub penalty: Option<DurationInput>,

    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// Operator inputs of a record once parsed and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingInput {
    pub participant_id: Uuid,
    pub stage_id: i32,
    pub raw_ms: i64,
    pub penalty_ms: i64,
    pub note: Option<String>,
}

impl CreateTimingRequest {
    pub fn into_input(self) -> Result<TimingInput> {
        Ok(TimingInput {
            participant_id: self.participant_id,
            stage_id: self.stage_id,
            raw_ms: parse_raw(&self.raw_time)?,
            penalty_ms: parse_penalty(self.penalty.as_ref())?,
            note: self.note,
        })
    }
}

impl UpdateTimingRequest {
    /// Overlay the requested changes on an existing record.
    pub fn merge_into(self, current: &TimingRecord) -> Result<TimingInput> {
        let raw_ms = match &self.raw_time {
            Some(raw) => parse_raw(raw)?,
            None => current.raw_ms,
        };
        let penalty_ms = match &self.penalty {
            Some(penalty) => parse_penalty(Some(penalty))?,
            None => current.penalty_ms,
        };

        Ok(TimingInput {
            participant_id: self.participant_id.unwrap_or(current.participant_id),
            stage_id: self.stage_id.unwrap_or(current.stage_id),
            raw_ms,
            penalty_ms,
            note: self.note.or_else(|| current.note.clone()),
        })
    }
}

fn parse_raw(raw: &DurationInput) -> Result<i64> {
    Ok(validate_duration(raw.to_millis()?)?)
}

fn parse_penalty(penalty: Option<&DurationInput>) -> Result<i64> {
    match penalty {
        Some(penalty) => Ok(validate_penalty(penalty.to_millis()?)?),
        None => Ok(0),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TimingFilter {
    pub stage_id: Option<i32>,
    pub category_id: Option<i32>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl TimingFilter {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimingResponse {
    pub timing_id: i64,
    pub participant_id: Uuid,
    pub stage_id: i32,
    pub raw_ms: i64,
    pub penalty_ms: i64,
    pub start_offset_ms: i64,
    pub bonus_ms: i64,
    pub final_ms: i64,
    pub position: Option<i32>,
    pub raw_time: String,
    pub final_time: String,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<TimingRecord> for TimingResponse {
    fn from(record: TimingRecord) -> Self {
        Self {
            timing_id: record.timing_id,
            participant_id: record.participant_id,
            stage_id: record.stage_id,
            raw_ms: record.raw_ms,
            penalty_ms: record.penalty_ms,
            start_offset_ms: record.start_offset_ms,
            bonus_ms: record.bonus_ms,
            final_ms: record.final_ms,
            position: record.position,
            raw_time: format_time(record.raw_ms),
            final_time: format_time(record.final_ms),
            note: record.note,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Outcome of the ranking pass that follows a timing write.
///
/// A failed pass never fails the write: positions stay stale until the next
/// successful pass of the stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecalculationStatus {
    Completed { ranked: usize },
    Skipped { reason: String },
    Failed { warning: String },
}

impl RecalculationStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimingMutationResponse {
    pub timing: TimingResponse,
    pub recalculation: RecalculationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimingDeletedResponse {
    pub timing_id: i64,
    pub stage_id: i32,
    pub recalculation: RecalculationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageRecalculationResponse {
    pub stage_id: i32,
    pub recalculation: RecalculationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::timing::{MAX_READING_MS, TimingError};
    use chrono::NaiveDate;

    fn record() -> TimingRecord {
        let at = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        TimingRecord {
            timing_id: 4,
            participant_id: Uuid::nil(),
            stage_id: 2,
            raw_ms: 125_430,
            penalty_ms: 5_000,
            start_offset_ms: 0,
            bonus_ms: 0,
            final_ms: 130_430,
            position: Some(1),
            note: Some("photo finish".to_string()),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_create_accepts_reading_text() {
        let req: CreateTimingRequest = serde_json::from_value(serde_json::json!({
            "participant_id": Uuid::nil(),
            "stage_id": 1,
            "raw_time": "01:00:00.00",
            "penalty": 2000
        }))
        .unwrap();
        let input = req.into_input().unwrap();
        assert_eq!(input.raw_ms, 3_600_000);
        assert_eq!(input.penalty_ms, 2_000);
    }

    #[test]
    fn test_negative_penalty_rejected() {
        let req = CreateTimingRequest {
            participant_id: Uuid::nil(),
            stage_id: 1,
            raw_time: DurationInput::Millis(60_000),
            penalty: Some(DurationInput::Millis(-1)),
            note: None,
        };
        assert!(matches!(
            req.into_input(),
            Err(StorageError::Timing(TimingError::InvalidPenalty(-1)))
        ));
    }

    #[test]
    fn test_zero_raw_time_rejected() {
        let req = CreateTimingRequest {
            participant_id: Uuid::nil(),
            stage_id: 1,
            raw_time: DurationInput::Millis(0),
            penalty: None,
            note: None,
        };
        assert!(req.into_input().is_err());
    }

    #[test]
    fn test_raw_time_beyond_longest_reading_rejected() {
        let req = CreateTimingRequest {
            participant_id: Uuid::nil(),
            stage_id: 1,
            raw_time: DurationInput::Millis(5_000_000_000_000_000_000),
            penalty: None,
            note: None,
        };
        assert!(matches!(
            req.into_input(),
            Err(StorageError::Timing(TimingError::InvalidDuration(5_000_000_000_000_000_000)))
        ));

        let longest = CreateTimingRequest {
            participant_id: Uuid::nil(),
            stage_id: 1,
            raw_time: DurationInput::Reading("99:59:59.99".to_string()),
            penalty: Some(DurationInput::Millis(MAX_READING_MS)),
            note: None,
        };
        let input = longest.into_input().unwrap();
        assert_eq!(input.raw_ms, MAX_READING_MS);
        assert_eq!(input.penalty_ms, MAX_READING_MS);
    }

    #[test]
    fn test_huge_penalty_rejected_on_update() {
        let update = UpdateTimingRequest {
            participant_id: None,
            stage_id: None,
            raw_time: None,
            penalty: Some(DurationInput::Millis(i64::MAX)),
            note: None,
        };
        assert!(matches!(
            update.merge_into(&record()),
            Err(StorageError::Timing(TimingError::InvalidPenalty(i64::MAX)))
        ));
    }

    #[test]
    fn test_update_keeps_unspecified_fields() {
        let update = UpdateTimingRequest {
            participant_id: None,
            stage_id: None,
            raw_time: Some(DurationInput::Reading("02:00.00".to_string())),
            penalty: None,
            note: None,
        };
        let input = update.merge_into(&record()).unwrap();
        assert_eq!(input.raw_ms, 120_000);
        assert_eq!(input.penalty_ms, 5_000);
        assert_eq!(input.stage_id, 2);
        assert_eq!(input.note.as_deref(), Some("photo finish"));
    }

    #[test]
    fn test_response_formats_times() {
        let response = TimingResponse::from(record());
        assert_eq!(response.raw_time, "02:05.43");
        assert_eq!(response.final_time, "02:10.43");
    }

    #[test]
    fn test_recalculation_status_is_tagged() {
        let json = serde_json::to_value(RecalculationStatus::Failed {
            warning: "timed out".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["warning"], "timed out");
    }
}
