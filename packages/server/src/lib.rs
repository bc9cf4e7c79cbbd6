// VPN Gatekeeper - Core
//
// Keeps provisioned VPN profiles in line with membership of an authorized
// group and delivers administrator broadcasts to the registered users.
//
// The reconciliation worker runs as a long-lived service next to the
// request-handling loop; admin conversations drive the broadcast dispatcher.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
