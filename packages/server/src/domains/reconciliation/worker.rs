//! Periodic reconciliation service.
//!
//! Passes are separated by a fixed delay measured from the end of the
//! previous pass, so a slow pass pushes the next one back instead of
//! overlapping it. A failed pass is logged and the worker carries on.

use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::pass::{run_pass, PassReport};
use crate::kernel::service_host::Service;
use crate::kernel::ServerDeps;

/// Configuration for the reconciliation worker.
#[derive(Debug, Clone)]
pub struct ReconciliationWorkerConfig {
    /// Delay between the end of one pass and the start of the next
    pub interval: Duration,
}

impl Default for ReconciliationWorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("a reconciliation pass is already running")]
    InProgress,

    #[error("failed to enumerate users: {0:#}")]
    Enumeration(anyhow::Error),
}

/// Workers built from clones of the same `ServerDeps` share one pass guard,
/// so at most one pass runs at a time however many workers exist.
pub struct ReconciliationWorker {
    deps: ServerDeps,
    config: ReconciliationWorkerConfig,
}

impl ReconciliationWorker {
    pub fn with_config(deps: ServerDeps, config: ReconciliationWorkerConfig) -> Self {
        Self { deps, config }
    }

    /// Run one pass now. Rejected while another pass over the same deps is running.
    pub async fn run_pass(&self, shutdown: &CancellationToken) -> Result<PassReport, PassError> {
        let _guard = self
            .deps
            .reconcile_guard
            .try_lock()
            .map_err(|_| PassError::InProgress)?;

        run_pass(&self.deps, shutdown)
            .await
            .map_err(PassError::Enumeration)
    }
}

#[async_trait::async_trait]
impl Service for ReconciliationWorker {
    fn name(&self) -> &'static str {
        "reconciliation-worker"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "reconciliation worker starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if let Err(e) = self.run_pass(&shutdown).await {
                error!(error = %e, "reconciliation pass failed");
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!("reconciliation worker stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ReconciliationWorkerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(3600));
    }
}
