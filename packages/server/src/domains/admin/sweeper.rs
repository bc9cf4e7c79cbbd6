use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::conversation::AdminConversations;
use crate::kernel::service_host::Service;

/// Periodically drops admin conversations that went idle.
///
/// Expired sessions already read as idle on access; the sweep only bounds
/// how long abandoned ones stay in memory.
pub struct AdminSessionSweeper {
    conversations: Arc<AdminConversations>,
    every: Duration,
}

impl AdminSessionSweeper {
    pub fn new(conversations: Arc<AdminConversations>, every: Duration) -> Self {
        Self {
            conversations,
            every,
        }
    }
}

#[async_trait::async_trait]
impl Service for AdminSessionSweeper {
    fn name(&self) -> &'static str {
        "admin-session-sweeper"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.every) => {
                    self.conversations.expire_stale().await;
                }
            }
        }

        info!("admin session sweeper stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::UserId;
    use crate::domains::admin::AdminState;
    use crate::kernel::test_dependencies::{test_user, InMemoryUserRegistry};
    use crate::kernel::TestDependencies;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_drops_abandoned_session() {
        let mut admin = test_user(100, true, None);
        admin.is_privileged = true;
        let td = TestDependencies::new()
            .with_registry(InMemoryUserRegistry::new().with_user(admin));
        let conversations = Arc::new(AdminConversations::new(td.deps(), Duration::from_secs(60)));
        conversations.select_broadcast(UserId::new(100)).await;

        let shutdown = CancellationToken::new();
        let sweeper = AdminSessionSweeper::new(conversations.clone(), Duration::from_secs(60));
        let handle = tokio::spawn(Box::new(sweeper).run(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(121)).await;
        assert!(conversations.expire_stale().await.is_empty());
        assert_eq!(conversations.state(UserId::new(100)).await, AdminState::Idle);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }
}
