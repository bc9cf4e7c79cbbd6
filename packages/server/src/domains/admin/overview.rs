//! Admin overview and network statistics.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::{MembershipCounts, TrafficStats};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminOverview {
    pub counts: MembershipCounts,
    /// `None` when the provisioner could not report connected clients
    pub online: Option<u64>,
}

/// Registry head-counts plus the provisioner's online count.
pub async fn admin_overview(deps: &ServerDeps) -> Result<AdminOverview> {
    let counts = deps.registry.membership_counts().await?;

    let online = match deps.provisioner.online_count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "failed to fetch online client count");
            None
        }
    };

    Ok(AdminOverview { counts, online })
}

/// Traffic across every provisioned resource.
pub async fn network_traffic(deps: &ServerDeps) -> Result<TrafficStats> {
    deps.provisioner.global_stats().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{test_user, InMemoryUserRegistry, MockProvisioner};
    use crate::kernel::TestDependencies;

    #[tokio::test]
    async fn test_overview_counts() {
        let td = TestDependencies::new()
            .with_registry(
                InMemoryUserRegistry::new()
                    .with_user(test_user(1, true, None))
                    .with_user(test_user(2, true, None))
                    .with_user(test_user(3, false, None)),
            )
            .with_provisioner(MockProvisioner::new().with_online(Some(7)));

        let overview = admin_overview(&td.deps()).await.unwrap();

        assert_eq!(overview.counts.total, 3);
        assert_eq!(overview.counts.members, 2);
        assert_eq!(overview.counts.non_members, 1);
        assert_eq!(overview.online, Some(7));
    }

    #[tokio::test]
    async fn test_online_failure_is_not_fatal() {
        let td = TestDependencies::new()
            .with_provisioner(MockProvisioner::new().with_online(None));

        let overview = admin_overview(&td.deps()).await.unwrap();

        assert_eq!(overview.online, None);
    }

    #[tokio::test]
    async fn test_network_traffic() {
        let stats = TrafficStats {
            upload_bytes: 10,
            download_bytes: 20,
        };
        let td = TestDependencies::new()
            .with_provisioner(MockProvisioner::new().with_global_stats(stats));

        assert_eq!(network_traffic(&td.deps()).await.unwrap(), stats);
    }
}
