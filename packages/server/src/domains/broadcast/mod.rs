//! Broadcast domain - one message body delivered to a selected audience
//!
//! Architecture:
//!   admin conversation → dispatch_broadcast → registry snapshot → deliver (per recipient)

pub mod audience;
pub mod dispatcher;

pub use audience::Audience;
pub use dispatcher::{deliver, dispatch_broadcast, BroadcastError, BroadcastOutcome};
