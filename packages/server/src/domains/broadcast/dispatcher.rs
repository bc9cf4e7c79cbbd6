//! Broadcast dispatcher.
//!
//! The audience is resolved once, at dispatch start; users who join or
//! change membership afterwards are not re-evaluated during the run. Each
//! delivery is its own unit of work, so a failing recipient only moves the
//! `failed` counter.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::audience::Audience;
use crate::common::UserId;
use crate::kernel::{DeliveryError, ServerDeps};

/// Final tally of a broadcast run. `attempted == succeeded + failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BroadcastOutcome {
    /// Report shown to the admin who started the broadcast
    pub fn summary(&self) -> String {
        format!(
            "📨 Broadcast results:\n\n• Delivered: {}\n• Failed: {}\n• Total: {}",
            self.succeeded, self.failed, self.attempted
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("broadcast message is empty")]
    EmptyMessage,

    #[error("failed to resolve audience: {0:#}")]
    Snapshot(anyhow::Error),
}

/// Send `body` to every user in `audience`, in registry order.
pub async fn dispatch_broadcast(
    deps: &ServerDeps,
    audience: Audience,
    body: &str,
) -> Result<BroadcastOutcome, BroadcastError> {
    if body.trim().is_empty() {
        return Err(BroadcastError::EmptyMessage);
    }

    let recipients = deps
        .registry
        .list(audience.filter())
        .await
        .map_err(BroadcastError::Snapshot)?;

    info!(
        audience = audience.label(),
        recipients = recipients.len(),
        "broadcast started"
    );

    let mut outcome = BroadcastOutcome {
        attempted: recipients.len(),
        ..Default::default()
    };

    for user in &recipients {
        match deliver(deps, user.user_id, body).await {
            Ok(()) => outcome.succeeded += 1,
            Err(_) => outcome.failed += 1,
        }
    }

    info!(
        attempted = outcome.attempted,
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        "broadcast complete"
    );
    Ok(outcome)
}

/// Deliver one message, logging the failure instead of propagating it further.
pub async fn deliver(deps: &ServerDeps, user_id: UserId, body: &str) -> Result<(), DeliveryError> {
    match deps.channel.send(user_id, body).await {
        Ok(()) => {
            debug!(user_id = %user_id, "broadcast delivered");
            Ok(())
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "broadcast delivery failed");
            Err(e)
        }
    }
}
