//! Staggered-start compensation between categories.
//!
//! Each category leaves at its own time of day. A raw reading taken in a
//! later wave is shifted by the gap between that wave and the earliest
//! ("base") wave so results are comparable across categories.

use chrono::{NaiveTime, Timelike};

use super::error::TimingError;

/// Parse a wall-clock start time in `HH:MM` or `HH:MM:SS` form.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, TimingError> {
    let trimmed = text.trim();

    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| TimingError::InvalidTimeOfDay(text.to_string()))
}

/// Milliseconds to add to a raw reading of a category starting at
/// `category_start` when the earliest category starts at `base_start`.
pub fn offset_for(category_start: NaiveTime, base_start: NaiveTime) -> Result<i64, TimingError> {
    let category_secs = i64::from(category_start.num_seconds_from_midnight());
    let base_secs = i64::from(base_start.num_seconds_from_midnight());

    if base_secs > category_secs {
        return Err(TimingError::BaseAfterCategory {
            category: category_start.format("%H:%M:%S").to_string(),
            base: base_start.format("%H:%M:%S").to_string(),
        });
    }

    Ok((category_secs - base_secs) * 1_000)
}

/// Text-level variant used when start times arrive as strings.
pub fn offset_for_text(category_start: &str, base_start: &str) -> Result<i64, TimingError> {
    offset_for(
        parse_time_of_day(category_start)?,
        parse_time_of_day(base_start)?,
    )
}

/// Offset for a participant given the (possibly missing) base start.
///
/// Without a base there are no categories to compare against, so the raw
/// reading is used unadjusted.
pub fn offset_or_unadjusted(
    category_start: NaiveTime,
    base_start: Option<NaiveTime>,
) -> Result<i64, TimingError> {
    match base_start {
        Some(base) => offset_for(category_start, base),
        None => {
            tracing::warn!(
                "{}; using raw time as final time",
                TimingError::NoCategories
            );
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_ten_minute_gap_is_600_seconds() {
        assert_eq!(offset_for(at(8, 10), at(8, 0)).unwrap(), 600_000);
        assert_eq!(3_600_000 + offset_for(at(8, 10), at(8, 0)).unwrap(), 4_200_000);
    }

    #[test]
    fn test_base_category_has_no_offset() {
        assert_eq!(offset_for(at(8, 0), at(8, 0)).unwrap(), 0);
    }

    #[test]
    fn test_seconds_are_honoured() {
        assert_eq!(offset_for_text("08:10:30", "08:00").unwrap(), 630_000);
    }

    #[test]
    fn test_reversed_arguments_are_rejected() {
        assert!(matches!(
            offset_for(at(8, 0), at(8, 10)),
            Err(TimingError::BaseAfterCategory { .. })
        ));
    }

    #[test]
    fn test_malformed_time_of_day() {
        assert_eq!(
            offset_for_text("8h10", "08:00"),
            Err(TimingError::InvalidTimeOfDay("8h10".to_string()))
        );
        assert_eq!(
            offset_for_text("08:10", "25:00"),
            Err(TimingError::InvalidTimeOfDay("25:00".to_string()))
        );
    }

    #[test]
    fn test_missing_base_leaves_raw_time() {
        assert_eq!(offset_or_unadjusted(at(9, 30), None).unwrap(), 0);
        assert_eq!(
            offset_or_unadjusted(at(9, 30), Some(at(9, 0))).unwrap(),
            1_800_000
        );
    }
}
