//! Test harness with an in-memory SQLite registry for integration testing.
//!
//! Every harness owns a private database: the pool is capped at a single
//! connection that never idles out, so the in-memory schema lives exactly as
//! long as the harness.

use anyhow::{Context, Result};
use gatekeeper_core::common::UserId;
use gatekeeper_core::domains::users::models::{NewUser, User};
use gatekeeper_core::kernel::test_dependencies::{
    test_profile, MockMembershipOracle, MockNotificationChannel, MockProvisioner,
};
use gatekeeper_core::kernel::{ServerDeps, SqliteUserRegistry};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use test_context::AsyncTestContext;

/// Test harness holding a migrated database and recording mocks
pub struct TestHarness {
    pub db_pool: SqlitePool,
    pub oracle: Arc<MockMembershipOracle>,
    pub provisioner: Arc<MockProvisioner>,
    pub channel: Arc<MockNotificationChannel>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    /// Creates a new harness with a fresh, migrated in-memory database.
    pub async fn new() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_pool,
            oracle: Arc::new(MockMembershipOracle::new()),
            provisioner: Arc::new(MockProvisioner::new()),
            channel: Arc::new(MockNotificationChannel::new()),
        })
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

    pub fn registry(&self) -> SqliteUserRegistry {
        SqliteUserRegistry::new(self.db_pool.clone())
    }

    /// ServerDeps backed by the SQLite registry and the harness mocks
    pub fn deps(&self) -> ServerDeps {
        self.deps_with_admins(Vec::new())
    }

    pub fn deps_with_admins(&self, admins: Vec<UserId>) -> ServerDeps {
        ServerDeps::new(
            Arc::new(self.registry()),
            self.oracle.clone(),
            self.provisioner.clone(),
            self.channel.clone(),
            admins,
        )
    }

    /// Insert a user, optionally holding a profile keyed by `profile_key`.
    pub async fn seed_user(&self, id: i64, is_member: bool, profile_key: Option<&str>) -> User {
        let user_id = UserId::new(id);
        User::insert(
            &NewUser {
                user_id,
                display_name: format!("User {}", id),
                handle: Some(format!("user{}", id)),
                is_member,
                is_privileged: false,
            },
            &self.db_pool,
        )
        .await
        .expect("Failed to seed user");

        if let Some(key) = profile_key {
            User::set_provisioned_profile(user_id, &test_profile(key), &self.db_pool)
                .await
                .expect("Failed to seed profile");
        }

        User::find_by_id(user_id, &self.db_pool)
            .await
            .expect("Failed to reload user")
            .expect("Seeded user missing")
    }

    pub async fn user(&self, id: i64) -> Option<User> {
        User::find_by_id(UserId::new(id), &self.db_pool)
            .await
            .expect("Failed to load user")
    }
}
