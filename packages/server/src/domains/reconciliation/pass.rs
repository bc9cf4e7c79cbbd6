//! A single reconciliation pass.
//!
//! ```text
//! run_pass
//!     ├─► registry.list(All)                      (failure aborts the pass)
//!     └─► for each user: reconcile_user           (failure stays with that user)
//!             ├─► oracle.is_member
//!             ├─► profile.resource_key
//!             ├─► provisioner.delete_by_key
//!             ├─► registry.clear_provisioned_profile
//!             └─► channel.send(REVOCATION_NOTICE)
//! ```
//!
//! The per-user steps are strictly sequential: the registry is only cleared
//! after the provisioner confirmed the deletion, and the user is only told
//! after the registry was cleared. Once the resource is gone the clear is
//! retried in place, since a later pass could no longer delete it.

use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::{MembershipFilter, ProfileError, UserId};
use crate::domains::users::models::User;
use crate::kernel::ServerDeps;

pub const REVOCATION_NOTICE: &str = "❌ Your VPN profile has been removed.";

/// Attempts at clearing the registry after a confirmed deletion
const CLEAR_ATTEMPTS: u32 = 3;
const CLEAR_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Why one user's reconciliation could not complete.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("membership lookup failed: {0:#}")]
    Oracle(anyhow::Error),

    #[error(transparent)]
    MalformedProfile(#[from] ProfileError),

    #[error("provisioner failed: {0:#}")]
    Provisioner(anyhow::Error),

    #[error("registry update failed: {0:#}")]
    Registry(anyhow::Error),
}

/// What happened to one user during a pass.
#[derive(Debug)]
pub enum UserOutcome {
    /// Oracle confirmed membership; nothing to do
    Verified,
    /// Not a member, but there was no profile to revoke
    NothingToRevoke,
    /// Profile deleted and cleared from the registry
    Revoked { notified: bool },
    /// The provisioner refused the deletion; retried next pass
    DeletionRefused,
    Failed(ReconcileError),
}

/// Tally of a pass, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub examined: usize,
    pub verified: usize,
    pub nothing_to_revoke: usize,
    pub revoked: usize,
    pub notified: usize,
    pub refused: usize,
    pub failed: usize,
    /// True when shutdown stopped the pass before every user was examined
    pub interrupted: bool,
}

impl PassReport {
    pub fn record(&mut self, outcome: &UserOutcome) {
        self.examined += 1;
        match outcome {
            UserOutcome::Verified => self.verified += 1,
            UserOutcome::NothingToRevoke => self.nothing_to_revoke += 1,
            UserOutcome::Revoked { notified } => {
                self.revoked += 1;
                if *notified {
                    self.notified += 1;
                }
            }
            UserOutcome::DeletionRefused => self.refused += 1,
            UserOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Run one pass over every registered user.
///
/// Only a failure to enumerate users is returned as an error. Once shutdown
/// is requested no further users are started; the current one finishes.
pub async fn run_pass(deps: &ServerDeps, shutdown: &CancellationToken) -> Result<PassReport> {
    let users = deps.registry.list(MembershipFilter::All).await?;
    debug!(count = users.len(), "reconciliation pass started");

    let mut report = PassReport::default();
    for user in &users {
        if shutdown.is_cancelled() {
            report.interrupted = true;
            info!(
                examined = report.examined,
                remaining = users.len() - report.examined,
                "reconciliation pass interrupted by shutdown"
            );
            break;
        }

        let outcome = reconcile_user(deps, user).await;
        report.record(&outcome);
    }

    info!(
        examined = report.examined,
        revoked = report.revoked,
        refused = report.refused,
        failed = report.failed,
        "reconciliation pass complete"
    );
    Ok(report)
}

/// Reconcile a single user. Never fails: errors become `UserOutcome::Failed`.
pub async fn reconcile_user(deps: &ServerDeps, user: &User) -> UserOutcome {
    match try_reconcile_user(deps, user).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(user_id = %user.user_id, error = %e, "reconciliation failed for user");
            UserOutcome::Failed(e)
        }
    }
}

async fn try_reconcile_user(
    deps: &ServerDeps,
    user: &User,
) -> Result<UserOutcome, ReconcileError> {
    let is_member = deps
        .oracle
        .is_member(user.user_id)
        .await
        .map_err(ReconcileError::Oracle)?;

    if is_member {
        return Ok(UserOutcome::Verified);
    }

    let Some(profile) = &user.provisioned_profile else {
        return Ok(UserOutcome::NothingToRevoke);
    };

    let key = profile.resource_key()?;

    let deleted = deps
        .provisioner
        .delete_by_key(&key)
        .await
        .map_err(ReconcileError::Provisioner)?;

    if !deleted {
        warn!(user_id = %user.user_id, key = %key, "provisioner refused to delete client");
        return Ok(UserOutcome::DeletionRefused);
    }

    if let Err(e) = clear_after_delete(deps, user.user_id).await {
        error!(
            user_id = %user.user_id,
            key = %key,
            error = %e,
            "resource deleted but registry still holds the profile"
        );
        return Err(ReconcileError::Registry(e));
    }

    info!(user_id = %user.user_id, key = %key, "revoked VPN profile");

    let notified = match deps.channel.send(user.user_id, REVOCATION_NOTICE).await {
        Ok(()) => true,
        Err(e) => {
            warn!(user_id = %user.user_id, error = %e, "failed to deliver revocation notice");
            false
        }
    };

    Ok(UserOutcome::Revoked { notified })
}

/// Clear the stored profile, retrying with a growing delay.
async fn clear_after_delete(deps: &ServerDeps, user_id: UserId) -> Result<()> {
    let mut attempt = 1;
    loop {
        match deps.registry.clear_provisioned_profile(user_id).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < CLEAR_ATTEMPTS => {
                warn!(
                    user_id = %user_id,
                    attempt,
                    error = %e,
                    "failed to clear revoked profile, retrying"
                );
                tokio::time::sleep(CLEAR_RETRY_DELAY * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
