// TestDependencies - mock implementations for testing
//
// Provides recording mocks that can be injected into ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    BaseMembershipOracle, BaseNotificationChannel, BaseProvisioner, BaseUserRegistry,
    DeliveryError, ServerDeps,
};
use crate::common::{
    MembershipCounts, MembershipFilter, ProfileBlob, TrafficStats, UserId,
};
use crate::domains::users::models::{NewUser, User, UserChanges};

/// Build a user record for fixtures.
pub fn test_user(id: i64, is_member: bool, profile_key: Option<&str>) -> User {
    User {
        user_id: UserId::new(id),
        display_name: format!("User {}", id),
        handle: Some(format!("user{}", id)),
        is_member,
        provisioned_profile: profile_key.map(test_profile),
        is_privileged: false,
        registered_at: Utc::now(),
    }
}

/// Profile blob in the provisioner's format, keyed by `key`.
pub fn test_profile(key: &str) -> ProfileBlob {
    ProfileBlob::from_json(&json!({
        "email": key,
        "id": format!("client-{}", key),
        "port": 443,
    }))
}

// =============================================================================
// Mock Membership Oracle
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleAnswer {
    Member,
    NotMember,
    Unavailable,
}

pub struct MockMembershipOracle {
    answers: Arc<Mutex<HashMap<UserId, OracleAnswer>>>,
    default_answer: OracleAnswer,
    calls: Arc<Mutex<Vec<UserId>>>,
}

impl MockMembershipOracle {
    pub fn new() -> Self {
        Self {
            answers: Arc::new(Mutex::new(HashMap::new())),
            default_answer: OracleAnswer::NotMember,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_answer(self, id: i64, answer: OracleAnswer) -> Self {
        self.set(id, answer);
        self
    }

    /// Change the answer for a user between calls
    pub fn set(&self, id: i64, answer: OracleAnswer) {
        self.answers.lock().unwrap().insert(UserId::new(id), answer);
    }

    /// Get every identity the oracle was asked about
    pub fn calls(&self) -> Vec<UserId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseMembershipOracle for MockMembershipOracle {
    async fn is_member(&self, user_id: UserId) -> Result<bool> {
        self.calls.lock().unwrap().push(user_id);

        let answer = self
            .answers
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .unwrap_or(self.default_answer);

        match answer {
            OracleAnswer::Member => Ok(true),
            OracleAnswer::NotMember => Ok(false),
            OracleAnswer::Unavailable => Err(anyhow::anyhow!("oracle timed out for {}", user_id)),
        }
    }
}

// =============================================================================
// Mock Provisioner
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteBehavior {
    Succeed,
    Refuse,
    Fail,
}

pub struct MockProvisioner {
    delete_behaviors: Arc<Mutex<HashMap<String, DeleteBehavior>>>,
    delete_calls: Arc<Mutex<Vec<String>>>,
    create_calls: Arc<Mutex<Vec<String>>>,
    fail_create: AtomicBool,
    stats: Arc<Mutex<HashMap<String, TrafficStats>>>,
    global: TrafficStats,
    online: Option<u64>,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self {
            delete_behaviors: Arc::new(Mutex::new(HashMap::new())),
            delete_calls: Arc::new(Mutex::new(Vec::new())),
            create_calls: Arc::new(Mutex::new(Vec::new())),
            fail_create: AtomicBool::new(false),
            stats: Arc::new(Mutex::new(HashMap::new())),
            global: TrafficStats::default(),
            online: Some(0),
        }
    }

    pub fn with_delete(self, key: &str, behavior: DeleteBehavior) -> Self {
        self.set_delete(key, behavior);
        self
    }

    pub fn set_delete(&self, key: &str, behavior: DeleteBehavior) {
        self.delete_behaviors
            .lock()
            .unwrap()
            .insert(key.to_string(), behavior);
    }

    pub fn with_stats(self, key: &str, stats: TrafficStats) -> Self {
        self.stats.lock().unwrap().insert(key.to_string(), stats);
        self
    }

    pub fn with_global_stats(mut self, stats: TrafficStats) -> Self {
        self.global = stats;
        self
    }

    /// `None` makes `online_count` fail
    pub fn with_online(mut self, online: Option<u64>) -> Self {
        self.online = online;
        self
    }

    pub fn failing_create(self) -> Self {
        self.fail_create.store(true, Ordering::SeqCst);
        self
    }

    /// Get every key a deletion was requested for
    pub fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().unwrap().clone()
    }

    /// Get every label a profile was created for
    pub fn create_calls(&self) -> Vec<String> {
        self.create_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseProvisioner for MockProvisioner {
    async fn create(&self, label: &str) -> Result<ProfileBlob> {
        self.create_calls.lock().unwrap().push(label.to_string());
        // Let concurrent callers interleave as they would on a real panel
        tokio::task::yield_now().await;
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("panel rejected client {}", label);
        }
        Ok(test_profile(label))
    }

    async fn delete_by_key(&self, key: &str) -> Result<bool> {
        self.delete_calls.lock().unwrap().push(key.to_string());

        let behavior = self
            .delete_behaviors
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(DeleteBehavior::Succeed);

        match behavior {
            DeleteBehavior::Succeed => Ok(true),
            DeleteBehavior::Refuse => Ok(false),
            DeleteBehavior::Fail => Err(anyhow::anyhow!("panel unreachable deleting {}", key)),
        }
    }

    async fn stats(&self, key: &str) -> Result<TrafficStats> {
        self.stats
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no client {}", key))
    }

    async fn global_stats(&self) -> Result<TrafficStats> {
        Ok(self.global)
    }

    async fn online_count(&self) -> Result<u64> {
        self.online
            .ok_or_else(|| anyhow::anyhow!("online list unavailable"))
    }
}

// =============================================================================
// Mock Notification Channel
// =============================================================================

pub struct MockNotificationChannel {
    sent: Arc<Mutex<Vec<(UserId, String)>>>,
    blocked: Arc<Mutex<HashSet<UserId>>>,
}

impl MockNotificationChannel {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            blocked: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Deliveries to `id` fail as if the user blocked the bot
    pub fn with_blocked(self, id: i64) -> Self {
        self.blocked.lock().unwrap().insert(UserId::new(id));
        self
    }

    /// Get every successfully delivered message
    pub fn sent(&self) -> Vec<(UserId, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Get messages delivered to one user
    pub fn sent_to(&self, id: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(user_id, _)| *user_id == UserId::new(id))
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl BaseNotificationChannel for MockNotificationChannel {
    async fn send(&self, user_id: UserId, text: &str) -> Result<(), DeliveryError> {
        if self.blocked.lock().unwrap().contains(&user_id) {
            return Err(DeliveryError::Blocked(
                "Forbidden: bot was blocked by the user".to_string(),
            ));
        }
        self.sent.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }
}

// =============================================================================
// In-memory User Registry
// =============================================================================

pub struct InMemoryUserRegistry {
    users: Arc<Mutex<Vec<User>>>,
    unreachable: AtomicBool,
    failing_clears: AtomicUsize,
    updates: Arc<Mutex<Vec<(UserId, UserChanges)>>>,
}

impl InMemoryUserRegistry {
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(Vec::new())),
            unreachable: AtomicBool::new(false),
            failing_clears: AtomicUsize::new(0),
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_user(self, user: User) -> Self {
        self.users.lock().unwrap().push(user);
        self
    }

    /// Make scans fail as if the database were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make the next `count` profile clears fail
    pub fn with_failing_clears(self, count: usize) -> Self {
        self.failing_clears.store(count, Ordering::SeqCst);
        self
    }

    /// Current copy of a user record
    pub fn user(&self, id: i64) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == UserId::new(id))
            .cloned()
    }

    /// Get every partial update written through `update_fields`
    pub fn updates(&self) -> Vec<(UserId, UserChanges)> {
        self.updates.lock().unwrap().clone()
    }

    fn with_user_mut<T>(&self, user_id: UserId, f: impl FnOnce(&mut User) -> T) -> Result<T> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| anyhow::anyhow!("user {} not found", user_id))?;
        Ok(f(user))
    }
}

#[async_trait]
impl BaseUserRegistry for InMemoryUserRegistry {
    async fn get(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }

    async fn list(&self, filter: MembershipFilter) -> Result<Vec<User>> {
        if self.unreachable.load(Ordering::SeqCst) {
            anyhow::bail!("registry unreachable");
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| filter.matches(u.is_member))
            .cloned()
            .collect())
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.user_id == new_user.user_id) {
            anyhow::bail!("user {} already exists", new_user.user_id);
        }
        let user = new_user.into_user(Utc::now());
        users.push(user.clone());
        Ok(user)
    }

    async fn update_fields(&self, user_id: UserId, changes: &UserChanges) -> Result<()> {
        self.with_user_mut(user_id, |user| changes.apply_to(user))?;
        self.updates
            .lock()
            .unwrap()
            .push((user_id, changes.clone()));
        Ok(())
    }

    async fn set_provisioned_profile(
        &self,
        user_id: UserId,
        profile: &ProfileBlob,
    ) -> Result<()> {
        self.with_user_mut(user_id, |user| {
            user.provisioned_profile = Some(profile.clone())
        })
    }

    async fn clear_provisioned_profile(&self, user_id: UserId) -> Result<()> {
        let pending = self.failing_clears.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_clears.store(pending - 1, Ordering::SeqCst);
            anyhow::bail!("database is locked");
        }
        self.with_user_mut(user_id, |user| user.provisioned_profile = None)
    }

    async fn sync_privileged(&self, admins: &[UserId]) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        for user in users.iter_mut() {
            user.is_privileged = admins.contains(&user.user_id);
        }
        for admin in admins {
            if !users.iter().any(|u| u.user_id == *admin) {
                users.push(
                    NewUser {
                        user_id: *admin,
                        display_name: format!("Admin {}", admin),
                        handle: None,
                        is_member: false,
                        is_privileged: true,
                    }
                    .into_user(Utc::now()),
                );
            }
        }
        Ok(())
    }

    async fn membership_counts(&self) -> Result<MembershipCounts> {
        let users = self.users.lock().unwrap();
        let total = users.len() as u64;
        let members = users.iter().filter(|u| u.is_member).count() as u64;
        Ok(MembershipCounts {
            total,
            members,
            non_members: total - members,
        })
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mock dependencies with handles kept for assertions
pub struct TestDependencies {
    pub registry: Arc<InMemoryUserRegistry>,
    pub oracle: Arc<MockMembershipOracle>,
    pub provisioner: Arc<MockProvisioner>,
    pub channel: Arc<MockNotificationChannel>,
    pub admins: Vec<UserId>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(InMemoryUserRegistry::new()),
            oracle: Arc::new(MockMembershipOracle::new()),
            provisioner: Arc::new(MockProvisioner::new()),
            channel: Arc::new(MockNotificationChannel::new()),
            admins: Vec::new(),
        }
    }

    pub fn with_registry(mut self, registry: InMemoryUserRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_oracle(mut self, oracle: MockMembershipOracle) -> Self {
        self.oracle = Arc::new(oracle);
        self
    }

    pub fn with_provisioner(mut self, provisioner: MockProvisioner) -> Self {
        self.provisioner = Arc::new(provisioner);
        self
    }

    pub fn with_channel(mut self, channel: MockNotificationChannel) -> Self {
        self.channel = Arc::new(channel);
        self
    }

    pub fn with_admin(mut self, id: i64) -> Self {
        self.admins.push(UserId::new(id));
        self
    }

    /// Build ServerDeps wired to the mocks
    pub fn deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.registry.clone(),
            self.oracle.clone(),
            self.provisioner.clone(),
            self.channel.clone(),
            self.admins.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
