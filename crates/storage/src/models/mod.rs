mod category;
mod normalized_name;
mod participant;
mod stage;
mod timing_record;
mod user;

pub use category::Category;
pub use normalized_name::NormalizedName;
pub use participant::Participant;
pub use stage::{Stage, StageCategory};
pub use timing_record::TimingRecord;
pub use user::User;
