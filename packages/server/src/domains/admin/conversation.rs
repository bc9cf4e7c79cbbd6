//! Per-admin broadcast conversations.
//!
//! Sessions are keyed by admin identity, so two admins mid-flow never see
//! each other's state. A session exists only while the admin is in a non-idle
//! state and is dropped after `timeout` without input.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::machines::{decide, AdminCommand, AdminInput, AdminState};
use crate::common::UserId;
use crate::domains::broadcast::{dispatch_broadcast, Audience, BroadcastOutcome};
use crate::kernel::ServerDeps;

/// In-progress selection of one admin.
#[derive(Debug, Clone)]
struct AdminSession {
    state: AdminState,
    last_activity: Instant,
}

/// What the admin should be shown after an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminReply {
    ChooseAudience(Vec<Audience>),
    EnterMessage(Audience),
    Delivered(BroadcastOutcome),
    BroadcastFailed(String),
    EmptyMessage,
    Cancelled,
    /// The sender may not start a broadcast
    Denied,
    /// Not part of a broadcast conversation; handle as an ordinary message
    Ignored,
}

pub struct AdminConversations {
    deps: ServerDeps,
    sessions: Mutex<HashMap<UserId, AdminSession>>,
    timeout: Duration,
}

impl AdminConversations {
    pub fn new(deps: ServerDeps, timeout: Duration) -> Self {
        Self {
            deps,
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Current state of an admin's conversation (expired sessions read as idle)
    pub async fn state(&self, admin: UserId) -> AdminState {
        let sessions = self.sessions.lock().await;
        match sessions.get(&admin) {
            Some(session) if !self.is_expired(session, Instant::now()) => session.state,
            _ => AdminState::Idle,
        }
    }

    pub async fn handle(&self, admin: UserId, input: AdminInput) -> AdminReply {
        if input == AdminInput::SelectBroadcast && !self.is_privileged(admin).await {
            warn!(user_id = %admin, "broadcast requested by non-admin");
            return AdminReply::Denied;
        }

        let command = {
            let mut sessions = self.sessions.lock().await;
            let now = Instant::now();

            let existing = sessions
                .get(&admin)
                .map(|session| (session.state, self.is_expired(session, now)));
            let current = match existing {
                Some((_, true)) => {
                    debug!(user_id = %admin, "admin session expired");
                    sessions.remove(&admin);
                    AdminState::Idle
                }
                Some((state, false)) => state,
                None => AdminState::Idle,
            };

            let (next, command) = decide(current, &input);
            if next == AdminState::Idle {
                sessions.remove(&admin);
            } else {
                sessions.insert(
                    admin,
                    AdminSession {
                        state: next,
                        last_activity: now,
                    },
                );
            }
            command
        };

        self.execute(admin, command).await
    }

    pub async fn select_broadcast(&self, admin: UserId) -> AdminReply {
        self.handle(admin, AdminInput::SelectBroadcast).await
    }

    pub async fn choose_audience(&self, admin: UserId, audience: Audience) -> AdminReply {
        self.handle(admin, AdminInput::ChooseAudience(audience)).await
    }

    pub async fn submit_text(&self, admin: UserId, body: impl Into<String>) -> AdminReply {
        self.handle(admin, AdminInput::SubmitText(body.into())).await
    }

    pub async fn cancel(&self, admin: UserId) -> AdminReply {
        self.handle(admin, AdminInput::Cancel).await
    }

    /// Drop every session idle for longer than the timeout.
    pub async fn expire_stale(&self) -> Vec<UserId> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<UserId> = sessions
            .iter()
            .filter(|(_, session)| self.is_expired(session, now))
            .map(|(admin, _)| *admin)
            .collect();

        for admin in &expired {
            sessions.remove(admin);
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "expired stale admin sessions");
        }
        expired
    }

    fn is_expired(&self, session: &AdminSession, now: Instant) -> bool {
        now.duration_since(session.last_activity) > self.timeout
    }

    async fn is_privileged(&self, admin: UserId) -> bool {
        match self.deps.registry.get(admin).await {
            Ok(Some(user)) => user.is_privileged,
            Ok(None) => false,
            Err(e) => {
                warn!(user_id = %admin, error = %e, "failed to look up admin");
                false
            }
        }
    }

    async fn execute(&self, admin: UserId, command: AdminCommand) -> AdminReply {
        match command {
            AdminCommand::PresentAudiences => {
                AdminReply::ChooseAudience(Audience::CHOICES.to_vec())
            }
            AdminCommand::PromptForMessage(audience) => AdminReply::EnterMessage(audience),
            AdminCommand::Dispatch { audience, body } => {
                info!(user_id = %admin, audience = audience.label(), "admin started broadcast");
                match dispatch_broadcast(&self.deps, audience, &body).await {
                    Ok(outcome) => AdminReply::Delivered(outcome),
                    Err(e) => {
                        warn!(user_id = %admin, error = %e, "broadcast could not start");
                        AdminReply::BroadcastFailed(e.to_string())
                    }
                }
            }
            AdminCommand::RejectEmptyMessage => AdminReply::EmptyMessage,
            AdminCommand::Discard => AdminReply::Cancelled,
            AdminCommand::Ignore => AdminReply::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{test_user, InMemoryUserRegistry};
    use crate::kernel::{BaseUserRegistry, TestDependencies};

    fn admin_fixture() -> TestDependencies {
        let mut admin = test_user(100, true, None);
        admin.is_privileged = true;
        TestDependencies::new().with_registry(
            InMemoryUserRegistry::new()
                .with_user(admin)
                .with_user(test_user(1, true, None)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_expires() {
        let td = admin_fixture();
        let conversations = AdminConversations::new(td.deps(), Duration::from_secs(60));
        let admin = UserId::new(100);

        conversations.select_broadcast(admin).await;
        conversations.choose_audience(admin, Audience::All).await;
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(conversations.state(admin).await, AdminState::Idle);
        assert_eq!(
            conversations.submit_text(admin, "late message").await,
            AdminReply::Ignored
        );
        assert!(td.channel.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_stale_only_drops_idle_sessions() {
        let td = admin_fixture();
        td.registry
            .sync_privileged(&[UserId::new(100), UserId::new(200)])
            .await
            .unwrap();
        let conversations = AdminConversations::new(td.deps(), Duration::from_secs(60));

        conversations.select_broadcast(UserId::new(100)).await;
        tokio::time::advance(Duration::from_secs(45)).await;
        conversations.select_broadcast(UserId::new(200)).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let expired = conversations.expire_stale().await;

        assert_eq!(expired, vec![UserId::new(100)]);
        assert_eq!(
            conversations.state(UserId::new(200)).await,
            AdminState::AwaitingAudience
        );
    }

    #[tokio::test]
    async fn test_non_admin_is_denied() {
        let td = admin_fixture();
        let conversations = AdminConversations::new(td.deps(), Duration::from_secs(60));

        let reply = conversations.select_broadcast(UserId::new(1)).await;

        assert_eq!(reply, AdminReply::Denied);
        assert_eq!(conversations.state(UserId::new(1)).await, AdminState::Idle);
    }
}
