//! Conversion between stopwatch readings (`MM:SS.cc` / `HH:MM:SS.cc`) and
//! integer milliseconds.
//!
//! Readings are centisecond-granular, so formatting truncates the last
//! millisecond digit: `parse_time(&format_time(n))` is `n` rounded down to
//! the nearest multiple of 10.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::TimingError;

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_SECOND: i64 = 1_000;
const MS_PER_CENTISECOND: i64 = 10;

/// Longest reading `parse_time` can produce: `99:59:59.99`.
pub const MAX_READING_MS: i64 =
    99 * MS_PER_HOUR + 59 * MS_PER_MINUTE + 59 * MS_PER_SECOND + 99 * MS_PER_CENTISECOND;

lazy_static! {
    static ref READING: Regex =
        Regex::new(r"^(?:(\d{2}):)?(\d{2}):(\d{2})\.(\d{2})$").expect("valid reading regex");
}

/// Parse a stopwatch reading into milliseconds.
pub fn parse_time(text: &str) -> Result<i64, TimingError> {
    let format_error = || TimingError::Format(text.to_string());

    let captures = READING.captures(text.trim()).ok_or_else(format_error)?;

    let segment = |idx: usize| -> i64 {
        captures
            .get(idx)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };

    let has_hours = captures.get(1).is_some();
    let hours = segment(1);
    let minutes = segment(2);
    let seconds = segment(3);
    let centiseconds = segment(4);

    if seconds >= 60 || (has_hours && minutes >= 60) {
        return Err(format_error());
    }

    Ok(hours * MS_PER_HOUR
        + minutes * MS_PER_MINUTE
        + seconds * MS_PER_SECOND
        + centiseconds * MS_PER_CENTISECOND)
}

/// Format milliseconds as a stopwatch reading. Zero and negative values
/// render as `00:00.00`.
pub fn format_time(ms: i64) -> String {
    if ms <= 0 {
        return "00:00.00".to_string();
    }

    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let centiseconds = (ms % MS_PER_SECOND) / MS_PER_CENTISECOND;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{centiseconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}.{centiseconds:02}")
    }
}

/// A duration as accepted by timing endpoints: integer milliseconds or a
/// stopwatch reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum DurationInput {
    Millis(i64),
    Reading(String),
}

impl DurationInput {
    pub fn to_millis(&self) -> Result<i64, TimingError> {
        match self {
            Self::Millis(ms) => Ok(*ms),
            Self::Reading(text) => parse_time(text),
        }
    }
}

impl From<i64> for DurationInput {
    fn from(ms: i64) -> Self {
        Self::Millis(ms)
    }
}
