use anyhow::{Context, Result};
use tracing::info;

use crate::kernel::ServerDeps;

/// Align the privileged flag in the registry with the configured admins.
///
/// Runs at startup; admins who never talked to the bot get a placeholder row.
pub async fn sync_admins(deps: &ServerDeps) -> Result<()> {
    deps.registry
        .sync_privileged(&deps.admin_identifiers)
        .await
        .context("failed to update admin status")?;

    info!(count = deps.admin_identifiers.len(), "admin status updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{test_user, InMemoryUserRegistry};
    use crate::kernel::TestDependencies;

    #[tokio::test]
    async fn test_sync_admins_flags_configured_ids_only() {
        let mut former = test_user(1, true, None);
        former.is_privileged = true;
        let td = TestDependencies::new()
            .with_registry(
                InMemoryUserRegistry::new()
                    .with_user(former)
                    .with_user(test_user(2, true, None)),
            )
            .with_admin(2)
            .with_admin(9);

        sync_admins(&td.deps()).await.unwrap();

        assert!(!td.registry.user(1).unwrap().is_privileged);
        assert!(td.registry.user(2).unwrap().is_privileged);
        assert!(td.registry.user(9).unwrap().is_privileged);
    }
}
