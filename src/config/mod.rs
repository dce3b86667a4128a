//! Configuration module for the giveaway bot.
//!
//! Handles loading of Telegram credentials and runtime settings
//! from the environment.

mod settings;

pub use settings::{BotSettings, ConfigError, TelegramConfig};

/// Format creators use for giveaway end dates (`31.12.2099 23:59`).
pub const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Default interval between completion checks, in seconds.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

/// Default offset for dates shown to and typed by creators (UTC+3).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 180;
