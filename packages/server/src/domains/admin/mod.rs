//! Admin domain - broadcast conversations and the admin overview
//!
//! Architecture:
//!   inbound admin message → AdminConversations::handle → machines::decide → command
//!       └─► Dispatch → broadcast::dispatch_broadcast

pub mod conversation;
pub mod machines;
pub mod overview;
pub mod sweeper;

pub use conversation::{AdminConversations, AdminReply};
pub use machines::{AdminCommand, AdminInput, AdminState};
pub use overview::{admin_overview, network_traffic, AdminOverview};
pub use sweeper::AdminSessionSweeper;
