pub mod auth;
pub mod categories;
pub mod health;
pub mod participants;
pub mod results;
pub mod stages;
pub mod timings;
