//! Pure timing engine: reading parsing, start offsets, bonuses, stage ranking
//! and overall classification. Nothing in here touches the database.

pub mod bonus;
pub mod classification;
pub mod clock;
pub mod error;
pub mod ranking;
pub mod start_offset;

pub use bonus::{
    apply_bonus, bonus_for, bonus_schedule, final_time, validate_duration, validate_penalty,
};
pub use classification::{StageTime, Standing, classify};
pub use clock::{DurationInput, MAX_READING_MS, format_time, parse_time};
pub use error::TimingError;
pub use ranking::{StageEntry, StageResult, rank_stage};
pub use start_offset::{offset_for, parse_time_of_day};
