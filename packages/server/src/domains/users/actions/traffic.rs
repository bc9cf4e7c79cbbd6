use anyhow::Result;

use crate::common::{TrafficStats, UserId};
use crate::kernel::ServerDeps;

/// Traffic of the user's own profile, `None` when they hold none.
pub async fn user_traffic(deps: &ServerDeps, user_id: UserId) -> Result<Option<TrafficStats>> {
    let Some(profile) = deps
        .registry
        .get(user_id)
        .await?
        .and_then(|user| user.provisioned_profile)
    else {
        return Ok(None);
    };

    let key = profile.resource_key()?;
    let stats = deps.provisioner.stats(&key).await?;
    Ok(Some(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{test_user, InMemoryUserRegistry, MockProvisioner};
    use crate::kernel::TestDependencies;

    #[tokio::test]
    async fn test_traffic_of_profile_holder() {
        let stats = TrafficStats {
            upload_bytes: 1024,
            download_bytes: 2048,
        };
        let td = TestDependencies::new()
            .with_registry(
                InMemoryUserRegistry::new()
                    .with_user(test_user(1, true, Some("1")))
                    .with_user(test_user(2, true, None)),
            )
            .with_provisioner(MockProvisioner::new().with_stats("1", stats));
        let deps = td.deps();

        assert_eq!(user_traffic(&deps, UserId::new(1)).await.unwrap(), Some(stats));
        assert_eq!(user_traffic(&deps, UserId::new(2)).await.unwrap(), None);
    }
}
