pub mod category;
pub mod participant;
pub mod results;
pub mod stage;
pub mod timing;
pub mod user;
