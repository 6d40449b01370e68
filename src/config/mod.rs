//! Configuration module for the chat bot.
//!
//! Handles loading of Telegram credentials and process settings from the
//! environment, plus the runtime-adjustable system configuration that
//! admins change from inside the bot.

mod settings;
mod system;

pub use settings::{AdminPrivileges, BotSettings, ConfigError, Privilege, TelegramConfig};
pub use system::SystemConfig;

/// Version reported on the admin dashboard.
pub const BOT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default web front-end bind address.
pub const DEFAULT_WEB_ADDR: &str = "0.0.0.0:5000";
