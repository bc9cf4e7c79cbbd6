use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::common::UserId;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// Group whose membership decides who may hold a VPN profile
    pub chat_id: i64,
    pub admins: Vec<UserId>,
    pub database_url: String,
    pub telegram_api_base: String,
    /// Bound on every Bot API request, so a silent API cannot stall a pass
    pub telegram_timeout: Duration,
    /// Delay between the end of one reconciliation pass and the start of the next
    pub reconcile_interval: Duration,
    /// Idle time after which an unfinished admin conversation is dropped
    pub admin_session_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").context("BOT_TOKEN must be set")?,
            chat_id: env::var("CHAT_ID")
                .context("CHAT_ID must be set")?
                .trim()
                .parse()
                .context("CHAT_ID must be a valid number")?,
            admins: parse_admins(&env::var("ADMINS").unwrap_or_default())?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/users.db".to_string()),
            telegram_api_base: env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            telegram_timeout: Duration::from_secs(
                env::var("TELEGRAM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("TELEGRAM_TIMEOUT_SECS must be a valid number")?,
            ),
            reconcile_interval: Duration::from_secs(
                env::var("RECONCILE_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .context("RECONCILE_INTERVAL_SECS must be a valid number")?,
            ),
            admin_session_timeout: Duration::from_secs(
                env::var("ADMIN_SESSION_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "900".to_string())
                    .parse()
                    .context("ADMIN_SESSION_TIMEOUT_SECS must be a valid number")?,
            ),
        })
    }
}

/// Parse a comma-separated list of admin identities, skipping blank entries.
pub fn parse_admins(raw: &str) -> Result<Vec<UserId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<UserId>()
                .with_context(|| format!("ADMINS entry '{}' is not a valid id", entry))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admins_skips_blanks() {
        let admins = parse_admins(" 1, ,2,,3 ").unwrap();
        assert_eq!(admins, vec![UserId::new(1), UserId::new(2), UserId::new(3)]);
    }

    #[test]
    fn test_parse_admins_empty() {
        assert!(parse_admins("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_admins_rejects_garbage() {
        let err = parse_admins("1,two").unwrap_err();
        assert!(err.to_string().contains("two"));
    }
}
