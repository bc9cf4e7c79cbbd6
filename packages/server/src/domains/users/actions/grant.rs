//! Explicit grant of a VPN profile - the only path that creates one.

use anyhow::{Context, Result};
use tracing::info;

use crate::common::{ProfileBlob, UserId};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted(ProfileBlob),
    AlreadyHeld(ProfileBlob),
    /// Unknown user or not a verified member
    NotEligible,
}

/// Provision a profile for a registered member, or return the one they hold.
///
/// Grants are serialized: the check for an existing profile and the store of
/// a new one happen under one lock, so concurrent requests never provision
/// twice.
pub async fn grant_profile(deps: &ServerDeps, user_id: UserId) -> Result<GrantOutcome> {
    let _guard = deps.grant_guard.lock().await;

    let Some(user) = deps.registry.get(user_id).await? else {
        return Ok(GrantOutcome::NotEligible);
    };

    if !user.is_member {
        info!(user_id = %user_id, "grant refused for non-member");
        return Ok(GrantOutcome::NotEligible);
    }

    if let Some(profile) = user.provisioned_profile {
        return Ok(GrantOutcome::AlreadyHeld(profile));
    }

    let profile = deps
        .provisioner
        .create(&user_id.to_string())
        .await
        .with_context(|| format!("failed to create VPN profile for {}", user_id))?;

    deps.registry
        .set_provisioned_profile(user_id, &profile)
        .await
        .with_context(|| format!("failed to store VPN profile for {}", user_id))?;

    info!(user_id = %user_id, "granted VPN profile");
    Ok(GrantOutcome::Granted(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{
        test_profile, test_user, InMemoryUserRegistry, MockProvisioner,
    };
    use crate::kernel::TestDependencies;

    #[tokio::test]
    async fn test_grant_creates_and_stores_profile() {
        let td = TestDependencies::new()
            .with_registry(InMemoryUserRegistry::new().with_user(test_user(1, true, None)));

        let outcome = grant_profile(&td.deps(), UserId::new(1)).await.unwrap();

        assert_eq!(outcome, GrantOutcome::Granted(test_profile("1")));
        assert_eq!(td.provisioner.create_calls(), vec!["1".to_string()]);
        assert_eq!(
            td.registry.user(1).unwrap().provisioned_profile,
            Some(test_profile("1"))
        );
    }

    #[tokio::test]
    async fn test_existing_profile_is_returned_without_provisioning() {
        let td = TestDependencies::new()
            .with_registry(InMemoryUserRegistry::new().with_user(test_user(1, true, Some("1"))));

        let outcome = grant_profile(&td.deps(), UserId::new(1)).await.unwrap();

        assert_eq!(outcome, GrantOutcome::AlreadyHeld(test_profile("1")));
        assert!(td.provisioner.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_member_and_unknown_are_not_eligible() {
        let td = TestDependencies::new()
            .with_registry(InMemoryUserRegistry::new().with_user(test_user(2, false, None)));
        let deps = td.deps();

        assert_eq!(
            grant_profile(&deps, UserId::new(2)).await.unwrap(),
            GrantOutcome::NotEligible
        );
        assert_eq!(
            grant_profile(&deps, UserId::new(3)).await.unwrap(),
            GrantOutcome::NotEligible
        );
        assert!(td.provisioner.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_grants_provision_once() {
        let td = TestDependencies::new()
            .with_registry(InMemoryUserRegistry::new().with_user(test_user(1, true, None)));
        let deps = td.deps();

        let (first, second) = tokio::join!(
            grant_profile(&deps, UserId::new(1)),
            grant_profile(&deps, UserId::new(1))
        );

        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|o| matches!(o, GrantOutcome::AlreadyHeld(_)));
        assert_eq!(
            outcomes,
            vec![
                GrantOutcome::Granted(test_profile("1")),
                GrantOutcome::AlreadyHeld(test_profile("1")),
            ]
        );
        assert_eq!(td.provisioner.create_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_record_empty() {
        let td = TestDependencies::new()
            .with_registry(InMemoryUserRegistry::new().with_user(test_user(1, true, None)))
            .with_provisioner(MockProvisioner::new().failing_create());

        assert!(grant_profile(&td.deps(), UserId::new(1)).await.is_err());
        assert_eq!(td.registry.user(1).unwrap().provisioned_profile, None);
    }
}
