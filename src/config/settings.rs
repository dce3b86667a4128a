//! Application settings and Telegram configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::{DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_UTC_OFFSET_MINUTES};

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by @BotFather.
    pub bot_token: String,

    /// Base URL of the Bot API server.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// How long `getUpdates` holds the connection open, in seconds.
    #[serde(default = "default_long_poll_timeout")]
    pub long_poll_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_owned()
}

fn default_long_poll_timeout() -> u64 {
    30
}

impl TelegramConfig {
    /// Creates a new Telegram configuration with default endpoint settings.
    #[must_use]
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            api_url: default_api_url(),
            long_poll_timeout_secs: default_long_poll_timeout(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `BOT_TOKEN` to be set.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar("BOT_TOKEN"))?;

        let api_url = std::env::var("TELEGRAM_API_URL").unwrap_or_else(|_| default_api_url());

        let long_poll_timeout_secs = match std::env::var("LONG_POLL_TIMEOUT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("LONG_POLL_TIMEOUT"))?,
            Err(_) => default_long_poll_timeout(),
        };

        Ok(Self {
            bot_token,
            api_url,
            long_poll_timeout_secs,
        })
    }

    /// Base URL for bot method calls, e.g. `https://api.telegram.org/bot<token>`.
    #[must_use]
    pub fn method_base_url(&self) -> String {
        format!("{}/bot{}", self.api_url.trim_end_matches('/'), self.bot_token)
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Base URL of the participation mini-app.
    #[serde(default = "default_webapp_url")]
    pub webapp_url: String,

    /// Address the HTTP API listens on.
    #[serde(default = "default_api_bind")]
    pub api_bind: SocketAddr,

    /// Interval between completion scheduler ticks in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Offset from UTC in which creators enter and read dates.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_webapp_url() -> String {
    "https://example.com/webapp".to_owned()
}

fn default_api_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_utc_offset() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("giveaways.db"),
            webapp_url: default_webapp_url(),
            api_bind: default_api_bind(),
            check_interval_secs: default_check_interval(),
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    ///
    /// Unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        let defaults = Self::default();
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .map_or(defaults.database_path, PathBuf::from),
            webapp_url: std::env::var("WEBAPP_URL").unwrap_or(defaults.webapp_url),
            api_bind: std::env::var("API_BIND")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.api_bind),
            check_interval_secs: std::env::var("CHECK_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&secs: &u64| secs > 0)
                .unwrap_or(defaults.check_interval_secs),
            utc_offset_minutes: std::env::var("UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.utc_offset_minutes),
        }
    }

    /// Scheduler tick interval.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// The configured offset, or UTC when the value is out of range.
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Environment variable {0} must be a non-negative integer")]
    InvalidNumber(&'static str),
}
