// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (reconciliation, broadcasts) lives in domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseProvisioner, BaseUserRegistry)

use anyhow::Result;
use async_trait::async_trait;

use crate::common::{MembershipCounts, MembershipFilter, ProfileBlob, TrafficStats, UserId};
use crate::domains::users::models::{NewUser, User, UserChanges};

// =============================================================================
// Membership Oracle Trait (Infrastructure - external group authority)
// =============================================================================

#[async_trait]
pub trait BaseMembershipOracle: Send + Sync {
    /// Whether the user currently belongs to the authorized group.
    ///
    /// An error means "unknown"; callers must not treat it as "not a member".
    async fn is_member(&self, user_id: UserId) -> Result<bool>;
}

// =============================================================================
// Resource Provisioner Trait (Infrastructure - VPN panel)
// =============================================================================

#[async_trait]
pub trait BaseProvisioner: Send + Sync {
    /// Create an access profile labelled `label` and return its serialized record
    async fn create(&self, label: &str) -> Result<ProfileBlob>;

    /// Delete the resource identified by `key`. `Ok(false)` means the panel refused.
    async fn delete_by_key(&self, key: &str) -> Result<bool>;

    /// Traffic counters of a single resource
    async fn stats(&self, key: &str) -> Result<TrafficStats>;

    /// Traffic counters across every resource
    async fn global_stats(&self) -> Result<TrafficStats>;

    /// Number of clients currently connected
    async fn online_count(&self) -> Result<u64>;
}

// =============================================================================
// Notification Channel Trait (Infrastructure - outbound messages)
// =============================================================================

/// Why a message did not reach its recipient.
///
/// Recipient-side blocking is an ordinary delivery failure, never a panic or a
/// pass-level error.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("recipient blocked the bot: {0}")]
    Blocked(String),

    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait BaseNotificationChannel: Send + Sync {
    async fn send(&self, user_id: UserId, text: &str) -> Result<(), DeliveryError>;
}

// =============================================================================
// User Registry Trait (Infrastructure - durable user store)
// =============================================================================

#[async_trait]
pub trait BaseUserRegistry: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<User>>;

    /// Snapshot of every user passing `filter`, in a stable order
    async fn list(&self, filter: MembershipFilter) -> Result<Vec<User>>;

    async fn create(&self, new_user: NewUser) -> Result<User>;

    /// Write only the fields present in `changes`
    async fn update_fields(&self, user_id: UserId, changes: &UserChanges) -> Result<()>;

    async fn set_provisioned_profile(&self, user_id: UserId, profile: &ProfileBlob)
        -> Result<()>;

    async fn clear_provisioned_profile(&self, user_id: UserId) -> Result<()>;

    /// Make exactly `admins` privileged
    async fn sync_privileged(&self, admins: &[UserId]) -> Result<()>;

    async fn membership_counts(&self) -> Result<MembershipCounts>;
}
