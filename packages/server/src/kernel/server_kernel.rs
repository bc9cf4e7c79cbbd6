// ServerKernel - core infrastructure with all dependencies
//
// The ServerKernel opens the registry database, wires the Telegram-backed
// oracle and channel together with the caller's provisioner, and hands out
// the long-lived pieces built on top of ServerDeps.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use telegram::{TelegramOptions, TelegramService};

use super::{
    build_service_host, BaseProvisioner, ServerDeps, ServiceHost, SqliteUserRegistry,
    TelegramAdapter,
};
use crate::config::Config;
use crate::domains::admin::AdminConversations;
use crate::domains::users::sync_admins;

/// ServerKernel holds all server dependencies
pub struct ServerKernel {
    pub db_pool: SqlitePool,
    pub deps: ServerDeps,
    pub conversations: Arc<AdminConversations>,
}

impl ServerKernel {
    /// Connect to the registry, run migrations and sync admin privileges.
    pub async fn start(config: &Config, provisioner: Arc<dyn BaseProvisioner>) -> Result<Self> {
        let db_pool = connect_database(&config.database_url).await?;

        let telegram = TelegramService::new(TelegramOptions {
            api_base: config.telegram_api_base.clone(),
            timeout: config.telegram_timeout,
            ..TelegramOptions::new(config.bot_token.clone())
        })
        .context("Failed to create Telegram client")?;
        let adapter = Arc::new(TelegramAdapter::new(Arc::new(telegram), config.chat_id));

        let deps = ServerDeps::new(
            Arc::new(SqliteUserRegistry::new(db_pool.clone())),
            adapter.clone(),
            provisioner,
            adapter,
            config.admins.clone(),
        );

        sync_admins(&deps).await?;

        let conversations = Arc::new(AdminConversations::new(
            deps.clone(),
            config.admin_session_timeout,
        ));

        Ok(Self {
            db_pool,
            deps,
            conversations,
        })
    }

    /// Host carrying the reconciliation worker and the admin session sweeper
    pub fn service_host(&self, config: &Config) -> ServiceHost {
        build_service_host(&self.deps, self.conversations.clone(), config)
    }
}

/// Open the SQLite registry, creating the file if needed, and apply migrations.
pub async fn connect_database(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid DATABASE_URL: {}", database_url))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    Ok(pool)
}
