//! Member roster for the admin user list.

use anyhow::Result;
use tracing::{info, warn};

use crate::common::MembershipFilter;
use crate::domains::users::models::{User, UserChanges};
use crate::kernel::ServerDeps;

/// Re-verify every stored member and clear the flag of those who left.
///
/// Oracle failures leave the user untouched. Returns how many flags flipped.
pub async fn refresh_member_flags(deps: &ServerDeps) -> Result<usize> {
    let members = deps.registry.list(MembershipFilter::Members).await?;
    let mut flipped = 0;

    for user in &members {
        match deps.oracle.is_member(user.user_id).await {
            Ok(true) => {}
            Ok(false) => {
                let changes = UserChanges {
                    is_member: Some(false),
                    ..Default::default()
                };
                match deps.registry.update_fields(user.user_id, &changes).await {
                    Ok(()) => flipped += 1,
                    Err(e) => {
                        warn!(user_id = %user.user_id, error = %e, "failed to clear membership flag")
                    }
                }
            }
            Err(e) => {
                warn!(user_id = %user.user_id, error = %e, "membership check failed during roster refresh")
            }
        }
    }

    if flipped > 0 {
        info!(count = flipped, "cleared membership of users who left the group");
    }
    Ok(flipped)
}

/// Current members, after a refresh of their flags.
pub async fn member_roster(deps: &ServerDeps) -> Result<Vec<User>> {
    refresh_member_flags(deps).await?;
    deps.registry.list(MembershipFilter::Members).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{
        test_user, InMemoryUserRegistry, MockMembershipOracle, OracleAnswer,
    };
    use crate::kernel::TestDependencies;

    #[tokio::test]
    async fn test_refresh_clears_only_confirmed_leavers() {
        let td = TestDependencies::new()
            .with_registry(
                InMemoryUserRegistry::new()
                    .with_user(test_user(1, true, None))
                    .with_user(test_user(2, true, None))
                    .with_user(test_user(3, true, None)),
            )
            .with_oracle(
                MockMembershipOracle::new()
                    .with_answer(1, OracleAnswer::Member)
                    .with_answer(2, OracleAnswer::NotMember)
                    .with_answer(3, OracleAnswer::Unavailable),
            );

        let roster = member_roster(&td.deps()).await.unwrap();

        let ids: Vec<i64> = roster.iter().map(|u| u.user_id.as_i64()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(!td.registry.user(2).unwrap().is_member);
    }
}
