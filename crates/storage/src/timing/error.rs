use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("Invalid time format '{0}', expected MM:SS.cc or HH:MM:SS.cc")]
    Format(String),

    #[error("Invalid time of day '{0}', expected HH:MM or HH:MM:SS")]
    InvalidTimeOfDay(String),

    #[error("No categories configured, start offsets cannot be computed")]
    NoCategories,

    #[error("Base start time {base} is later than category start time {category}")]
    BaseAfterCategory { category: String, base: String },

    #[error("Penalty must be between 0 and 99:59:59.99 (got {0} ms)")]
    InvalidPenalty(i64),

    #[error("Measured time must be between 1 ms and 99:59:59.99 (got {0} ms)")]
    InvalidDuration(i64),
}
