//! Server dependencies for domain actions (using traits for testability)
//!
//! This module provides the central dependency container used by the worker,
//! the dispatcher and the admin conversations. All external services use
//! trait abstractions to enable testing.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use telegram::{TelegramError, TelegramService};
use tokio::sync::Mutex;

use crate::common::{MembershipCounts, MembershipFilter, ProfileBlob, UserId};
use crate::domains::users::models::{NewUser, User, UserChanges};
use crate::kernel::{
    BaseMembershipOracle, BaseNotificationChannel, BaseProvisioner, BaseUserRegistry,
    DeliveryError,
};

// =============================================================================
// TelegramService Adapter (implements oracle + notification channel)
// =============================================================================

/// Wrapper around TelegramService bound to the authorized group
pub struct TelegramAdapter {
    service: Arc<TelegramService>,
    chat_id: i64,
}

impl TelegramAdapter {
    pub fn new(service: Arc<TelegramService>, chat_id: i64) -> Self {
        Self { service, chat_id }
    }
}

#[async_trait]
impl BaseMembershipOracle for TelegramAdapter {
    async fn is_member(&self, user_id: UserId) -> Result<bool> {
        match self
            .service
            .get_chat_member(self.chat_id, user_id.as_i64())
            .await
        {
            Ok(member) => Ok(member.is_present()),
            // Users that never joined are reported as unknown participants
            Err(TelegramError::Api { code: 400, description })
                if description.to_lowercase().contains("user not found") =>
            {
                Ok(false)
            }
            Err(e) => Err(anyhow::anyhow!("membership lookup failed: {}", e)),
        }
    }
}

#[async_trait]
impl BaseNotificationChannel for TelegramAdapter {
    async fn send(&self, user_id: UserId, text: &str) -> Result<(), DeliveryError> {
        self.service
            .send_message(user_id.as_i64(), text)
            .await
            .map_err(|e| match e {
                TelegramError::Forbidden(description) => DeliveryError::Blocked(description),
                TelegramError::Api { description, .. } => DeliveryError::Rejected(description),
                TelegramError::Http(e) => DeliveryError::Transport(e.to_string()),
            })
    }
}

// =============================================================================
// SQLite registry (implements BaseUserRegistry)
// =============================================================================

/// Registry backed by the `users` table
#[derive(Clone)]
pub struct SqliteUserRegistry {
    pool: SqlitePool,
}

impl SqliteUserRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseUserRegistry for SqliteUserRegistry {
    async fn get(&self, user_id: UserId) -> Result<Option<User>> {
        User::find_by_id(user_id, &self.pool).await
    }

    async fn list(&self, filter: MembershipFilter) -> Result<Vec<User>> {
        User::find_all(filter, &self.pool).await
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        User::insert(&new_user, &self.pool).await
    }

    async fn update_fields(&self, user_id: UserId, changes: &UserChanges) -> Result<()> {
        User::update_fields(user_id, changes, &self.pool).await
    }

    async fn set_provisioned_profile(
        &self,
        user_id: UserId,
        profile: &ProfileBlob,
    ) -> Result<()> {
        User::set_provisioned_profile(user_id, profile, &self.pool).await
    }

    async fn clear_provisioned_profile(&self, user_id: UserId) -> Result<()> {
        User::clear_provisioned_profile(user_id, &self.pool).await
    }

    async fn sync_privileged(&self, admins: &[UserId]) -> Result<()> {
        User::sync_privileged(admins, &self.pool).await
    }

    async fn membership_counts(&self) -> Result<MembershipCounts> {
        User::membership_counts(&self.pool).await
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to domain actions (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub registry: Arc<dyn BaseUserRegistry>,
    pub oracle: Arc<dyn BaseMembershipOracle>,
    pub provisioner: Arc<dyn BaseProvisioner>,
    pub channel: Arc<dyn BaseNotificationChannel>,
    /// Identities configured as administrators
    pub admin_identifiers: Vec<UserId>,
    /// Held for the duration of a reconciliation pass; shared by every clone
    pub reconcile_guard: Arc<Mutex<()>>,
    /// Serializes profile grants so a user never gets two resources
    pub grant_guard: Arc<Mutex<()>>,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        registry: Arc<dyn BaseUserRegistry>,
        oracle: Arc<dyn BaseMembershipOracle>,
        provisioner: Arc<dyn BaseProvisioner>,
        channel: Arc<dyn BaseNotificationChannel>,
        admin_identifiers: Vec<UserId>,
    ) -> Self {
        Self {
            registry,
            oracle,
            provisioner,
            channel,
            admin_identifiers,
            reconcile_guard: Arc::new(Mutex::new(())),
            grant_guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_configured_admin(&self, user_id: UserId) -> bool {
        self.admin_identifiers.contains(&user_id)
    }
}
