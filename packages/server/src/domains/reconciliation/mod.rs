//! Reconciliation domain - revokes VPN profiles of users who left the group
//!
//! Architecture:
//!   ServiceHost → ReconciliationWorker (every interval) → run_pass → reconcile_user (per user)
//!
//! Retry is implicit in the schedule: a user whose revocation could not be
//! completed keeps their profile and is examined again on the next pass, for
//! as long as the oracle says they are not a member.

pub mod pass;
pub mod worker;

pub use pass::{reconcile_user, run_pass, PassReport, ReconcileError, UserOutcome, REVOCATION_NOTICE};
pub use worker::{PassError, ReconciliationWorker, ReconciliationWorkerConfig};
