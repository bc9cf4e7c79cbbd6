//! User domain - registry records and the interactive paths that keep them fresh
//!
//! Architecture:
//!   request handler → actions (touch / grant / roster / traffic) → ServerDeps traits

pub mod actions;
pub mod models;

// Re-export commonly used types
pub use actions::*;
pub use models::{NewUser, User, UserChanges};
