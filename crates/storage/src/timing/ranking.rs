//! Stage ranking: derives offsets, bonuses, final times and dense positions
//! for every record of a stage from the records' immutable inputs.
//!
//! Because nothing derived is fed back into the computation, ranking the same
//! inputs twice always produces the same results.

use chrono::NaiveTime;

use super::bonus::{bonus_for, final_time};
use super::error::TimingError;
use super::start_offset::offset_or_unadjusted;

/// Number of provisional positions that earn a bonus.
pub const BONUS_POSITIONS: usize = 5;

/// Inputs of one timing record, as loaded for a ranking pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEntry {
    pub timing_id: i64,
    pub raw_ms: i64,
    pub penalty_ms: i64,
    pub category_start: NaiveTime,
}

/// Derived values to persist for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageResult {
    pub timing_id: i64,
    pub start_offset_ms: i64,
    pub bonus_ms: i64,
    pub final_ms: i64,
    pub position: i32,
}

/// Rank every entry of a stage.
///
/// Provisional order is by `raw + offset + penalty`, ties broken by the
/// record identifier. The first five provisional positions receive their
/// bonus, then entries are ordered by final time (ties keep provisional
/// order) and numbered `1..=N`.
pub fn rank_stage(
    entries: &[StageEntry],
    base_start: Option<NaiveTime>,
) -> Result<Vec<StageResult>, TimingError> {
    let mut provisional = entries
        .iter()
        .map(|entry| {
            let offset = offset_or_unadjusted(entry.category_start, base_start)?;
            let unbonused = entry
                .raw_ms
                .saturating_add(offset)
                .saturating_add(entry.penalty_ms);
            Ok((entry, offset, unbonused))
        })
        .collect::<Result<Vec<_>, TimingError>>()?;

    provisional.sort_by_key(|(entry, _, unbonused)| (*unbonused, entry.timing_id));

    let mut results: Vec<StageResult> = provisional
        .iter()
        .enumerate()
        .map(|(idx, (entry, offset, _))| {
            let provisional_position = (idx < BONUS_POSITIONS).then(|| idx as i32 + 1);
            StageResult {
                timing_id: entry.timing_id,
                start_offset_ms: *offset,
                bonus_ms: entry.raw_ms.min(bonus_for(provisional_position)),
                final_ms: final_time(entry.raw_ms, provisional_position, *offset, entry.penalty_ms),
                position: 0,
            }
        })
        .collect();

    // stable: equal final times keep provisional order
    results.sort_by_key(|r| r.final_ms);

    for (idx, result) in results.iter_mut().enumerate() {
        result.position = idx as i32 + 1;
    }

    Ok(results)
}
