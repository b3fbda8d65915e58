pub mod eligibility;
pub mod identity;
pub mod timing;
