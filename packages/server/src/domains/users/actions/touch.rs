//! Refresh a user's record when they interact with the bot.
//!
//! Only fields that actually differ are written, so a touch never overwrites
//! the profile slot the reconciliation worker clears.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::common::UserId;
use crate::domains::users::models::{NewUser, User, UserChanges};
use crate::kernel::ServerDeps;

/// Profile data carried by an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TouchOutcome {
    /// First contact from a verified member
    Registered(User),
    /// Known user, with the names of the fields that were rewritten
    Known {
        user: User,
        changed: Vec<&'static str>,
    },
    /// Unknown user who is not a member; nothing was stored
    Denied,
}

impl TouchOutcome {
    /// Whether the user may use the service after this touch
    pub fn has_access(&self) -> bool {
        match self {
            TouchOutcome::Registered(_) => true,
            TouchOutcome::Known { user, .. } => user.is_member,
            TouchOutcome::Denied => false,
        }
    }
}

/// Fields of `user` that disagree with what was just observed.
///
/// `membership` is `None` when the oracle could not answer; the stored flag
/// is then left alone.
pub fn diff_profile(user: &User, observed: &ObservedProfile, membership: Option<bool>) -> UserChanges {
    let mut changes = UserChanges::default();

    if user.display_name != observed.display_name {
        changes.display_name = Some(observed.display_name.clone());
    }
    if user.handle != observed.handle {
        changes.handle = Some(observed.handle.clone());
    }
    if let Some(is_member) = membership {
        if user.is_member != is_member {
            changes.is_member = Some(is_member);
        }
    }

    changes
}

pub async fn touch_user(deps: &ServerDeps, observed: &ObservedProfile) -> Result<TouchOutcome> {
    let user_id = observed.user_id;

    let membership = match deps.oracle.is_member(user_id).await {
        Ok(is_member) => Some(is_member),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "membership check failed during touch");
            None
        }
    };

    let Some(mut user) = deps.registry.get(user_id).await? else {
        if membership != Some(true) {
            info!(user_id = %user_id, "denied access to unregistered non-member");
            return Ok(TouchOutcome::Denied);
        }

        let user = deps
            .registry
            .create(NewUser {
                user_id,
                display_name: observed.display_name.clone(),
                handle: observed.handle.clone(),
                is_member: true,
                is_privileged: deps.is_configured_admin(user_id),
            })
            .await?;

        info!(user_id = %user_id, "new user registered");
        return Ok(TouchOutcome::Registered(user));
    };

    let changes = diff_profile(&user, observed, membership);
    let changed = changes.field_names();

    if changes.is_empty() {
        debug!(user_id = %user_id, "user data unchanged");
    } else {
        deps.registry.update_fields(user_id, &changes).await?;
        changes.apply_to(&mut user);
        info!(user_id = %user_id, fields = ?changed, "updated user data");
    }

    Ok(TouchOutcome::Known { user, changed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{
        test_profile, test_user, InMemoryUserRegistry, MockMembershipOracle, OracleAnswer,
    };
    use crate::kernel::TestDependencies;

    fn observed(user: &User) -> ObservedProfile {
        ObservedProfile {
            user_id: user.user_id,
            display_name: user.display_name.clone(),
            handle: user.handle.clone(),
        }
    }

    #[test]
    fn test_no_diff_when_nothing_changed() {
        let user = test_user(1, true, None);
        assert!(diff_profile(&user, &observed(&user), Some(true)).is_empty());
    }

    #[test]
    fn test_unknown_membership_is_not_written() {
        let user = test_user(1, true, None);
        assert!(diff_profile(&user, &observed(&user), None).is_empty());
    }

    #[test]
    fn test_diff_picks_changed_fields_only() {
        let user = test_user(1, true, None);
        let mut seen = observed(&user);
        seen.handle = None;

        let changes = diff_profile(&user, &seen, Some(false));

        assert_eq!(changes.display_name, None);
        assert_eq!(changes.handle, Some(None));
        assert_eq!(changes.is_member, Some(false));
    }

    #[tokio::test]
    async fn test_unknown_member_is_registered() {
        let td = TestDependencies::new()
            .with_oracle(MockMembershipOracle::new().with_answer(5, OracleAnswer::Member))
            .with_admin(5);
        let seen = ObservedProfile {
            user_id: UserId::new(5),
            display_name: "Ann".to_string(),
            handle: Some("ann".to_string()),
        };

        let outcome = touch_user(&td.deps(), &seen).await.unwrap();

        assert!(matches!(outcome, TouchOutcome::Registered(_)));
        let stored = td.registry.user(5).unwrap();
        assert!(stored.is_member);
        assert!(stored.is_privileged);
        assert_eq!(stored.provisioned_profile, None);
    }

    #[tokio::test]
    async fn test_unknown_non_member_is_denied() {
        let td = TestDependencies::new();
        let seen = ObservedProfile {
            user_id: UserId::new(6),
            display_name: "Bob".to_string(),
            handle: None,
        };

        let outcome = touch_user(&td.deps(), &seen).await.unwrap();

        assert_eq!(outcome, TouchOutcome::Denied);
        assert!(td.registry.user(6).is_none());
    }

    #[tokio::test]
    async fn test_known_user_gets_partial_update_and_keeps_profile() {
        let td = TestDependencies::new()
            .with_registry(InMemoryUserRegistry::new().with_user(test_user(1, true, Some("1"))))
            .with_oracle(MockMembershipOracle::new().with_answer(1, OracleAnswer::Member));
        let seen = ObservedProfile {
            user_id: UserId::new(1),
            display_name: "Renamed".to_string(),
            handle: Some("user1".to_string()),
        };

        let outcome = touch_user(&td.deps(), &seen).await.unwrap();

        assert!(outcome.has_access());
        let updates = td.registry.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.field_names(), vec!["display_name"]);
        assert_eq!(
            td.registry.user(1).unwrap().provisioned_profile,
            Some(test_profile("1"))
        );
    }

    #[tokio::test]
    async fn test_oracle_outage_falls_back_to_stored_flag() {
        let td = TestDependencies::new()
            .with_registry(InMemoryUserRegistry::new().with_user(test_user(1, true, None)))
            .with_oracle(MockMembershipOracle::new().with_answer(1, OracleAnswer::Unavailable));
        let user = td.registry.user(1).unwrap();

        let outcome = touch_user(&td.deps(), &observed(&user)).await.unwrap();

        assert!(outcome.has_access());
        assert!(td.registry.updates().is_empty());
    }
}
