//! Profiles not bound to any user (shared devices, guests).
//!
//! They live outside the user lifecycle: reconciliation never reads them and
//! only an admin removes them.

pub mod actions;
pub mod models;

pub use actions::*;
pub use models::StaticProfile;
