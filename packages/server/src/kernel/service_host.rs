//! Long-running services and their shared shutdown signal.
//!
//! ```text
//! ServiceHost
//!     ├─► spawn every Service with a child CancellationToken
//!     ├─► wait for Ctrl-C (or an explicit cancel of the host token)
//!     └─► cancel, then join every service so in-flight work can finish
//! ```

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A background service driven until its shutdown token is cancelled.
#[async_trait]
pub trait Service: Send + 'static {
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()>;
}

pub struct ServiceHost {
    services: Vec<Box<dyn Service>>,
    shutdown: CancellationToken,
}

impl ServiceHost {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_service(mut self, service: impl Service) -> Self {
        self.services.push(Box::new(service));
        self
    }

    /// Token that stops the host when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn service_names(&self) -> Vec<&'static str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    /// Run every service until Ctrl-C or the host token is cancelled.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown;
        let mut handles = Vec::with_capacity(self.services.len());

        for service in self.services {
            let name = service.name();
            let token = shutdown.child_token();
            info!(service = name, "starting service");
            handles.push(tokio::spawn(async move {
                if let Err(e) = service.run(token).await {
                    error!(service = name, error = %e, "service exited with error");
                }
                info!(service = name, "service stopped");
            }));
        }

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "failed to listen for shutdown signal");
                }
                info!("shutdown signal received");
            }
            _ = shutdown.cancelled() => {}
        }

        shutdown.cancel();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "service task panicked");
            }
        }

        Ok(())
    }
}

impl Default for ServiceHost {
    fn default() -> Self {
        Self::new()
    }
}
