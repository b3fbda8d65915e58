pub mod auth;
pub mod category;
pub mod common;
pub mod participant;
pub mod results;
pub mod stage;
pub mod timing;
