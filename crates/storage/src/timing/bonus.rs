use serde::Serialize;
use utoipa::ToSchema;

use super::clock::MAX_READING_MS;
use super::error::TimingError;

/// Time bonus per finishing position. Only the first five qualify.
pub const BONUS_TABLE: [(i32, i64); 5] = [(1, 10_000), (2, 6_000), (3, 4_000), (4, 2_000), (5, 1_000)];

pub fn bonus_for(position: Option<i32>) -> i64 {
    position
        .and_then(|p| BONUS_TABLE.iter().find(|(pos, _)| *pos == p))
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0)
}

/// Raw time minus the positional bonus, floored at zero.
pub fn apply_bonus(raw_ms: i64, position: Option<i32>) -> i64 {
    raw_ms.saturating_sub(bonus_for(position)).max(0)
}

pub fn validate_penalty(penalty_ms: i64) -> Result<i64, TimingError> {
    if !(0..=MAX_READING_MS).contains(&penalty_ms) {
        return Err(TimingError::InvalidPenalty(penalty_ms));
    }
    Ok(penalty_ms)
}

/// A measured stage time must be positive and fit in a stopwatch reading.
pub fn validate_duration(raw_ms: i64) -> Result<i64, TimingError> {
    if !(1..=MAX_READING_MS).contains(&raw_ms) {
        return Err(TimingError::InvalidDuration(raw_ms));
    }
    Ok(raw_ms)
}

/// Final time of a record: bonus-adjusted raw time plus the start offset and
/// the manual penalty.
pub fn final_time(raw_ms: i64, position: Option<i32>, offset_ms: i64, penalty_ms: i64) -> i64 {
    apply_bonus(raw_ms, position)
        .saturating_add(offset_ms)
        .saturating_add(penalty_ms)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BonusEntry {
    pub position: i32,
    pub bonus_ms: i64,
    pub bonus_seconds: f64,
}

pub fn bonus_schedule() -> Vec<BonusEntry> {
    BONUS_TABLE
        .iter()
        .map(|(position, bonus_ms)| BonusEntry {
            position: *position,
            bonus_ms: *bonus_ms,
            bonus_seconds: *bonus_ms as f64 / 1_000.0,
        })
        .collect()
}
