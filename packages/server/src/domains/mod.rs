// Business domains
pub mod admin;
pub mod broadcast;
pub mod reconciliation;
pub mod static_profiles;
pub mod users;
