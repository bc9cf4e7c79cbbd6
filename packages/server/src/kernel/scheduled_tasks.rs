//! Scheduled background tasks.
//!
//! Periodic work runs as services on the [`ServiceHost`] next to the
//! request-handling loop:
//! - Membership reconciliation (every `RECONCILE_INTERVAL_SECS`, one instance)
//! - Admin session sweep (drops conversations idle past the timeout)
//!
//! ```text
//! ReconciliationWorker (interval after each pass)
//!     │
//!     └─► registry.list(All)
//!             └─► For each user → oracle → provisioner → registry → channel
//! ```

use std::sync::Arc;

use crate::config::Config;
use crate::domains::admin::{AdminConversations, AdminSessionSweeper};
use crate::domains::reconciliation::{ReconciliationWorker, ReconciliationWorkerConfig};
use crate::kernel::{ServerDeps, ServiceHost};

/// Build the host carrying every scheduled service.
pub fn build_service_host(
    deps: &ServerDeps,
    conversations: Arc<AdminConversations>,
    config: &Config,
) -> ServiceHost {
    let worker = ReconciliationWorker::with_config(
        deps.clone(),
        ReconciliationWorkerConfig {
            interval: config.reconcile_interval,
        },
    );
    let sweeper = AdminSessionSweeper::new(conversations, config.admin_session_timeout);

    tracing::info!(
        interval_secs = config.reconcile_interval.as_secs(),
        session_timeout_secs = config.admin_session_timeout.as_secs(),
        "Scheduled tasks configured (membership reconciliation, admin session sweep)"
    );

    ServiceHost::new().with_service(worker).with_service(sweeper)
}
