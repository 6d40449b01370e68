//! Process settings and Telegram configuration.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::DEFAULT_WEB_ADDR;

/// Telegram API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Bot token issued by `@BotFather`.
    #[serde(skip_serializing)]
    pub bot_token: String,

    /// Path to the session file.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("bot.session")
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String, bot_token: String) -> Self {
        Self {
            api_id,
            api_hash,
            bot_token,
            session_path: default_session_path(),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Expects `TG_API_ID`, `TG_API_HASH` and `TELEGRAM_BOT_TOKEN` to be set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_id: i32 = std::env::var("TG_API_ID")
            .map_err(|_| ConfigError::MissingEnvVar("TG_API_ID"))?
            .parse()
            .map_err(|_| ConfigError::InvalidApiId)?;

        let api_hash =
            std::env::var("TG_API_HASH").map_err(|_| ConfigError::MissingEnvVar("TG_API_HASH"))?;

        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN"))?;
        if bot_token.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN"));
        }

        let session_path = std::env::var("TG_SESSION_PATH")
            .map_or_else(|_| default_session_path(), PathBuf::from);

        Ok(Self {
            api_id,
            api_hash,
            bot_token,
            session_path,
        })
    }
}

/// Admin capabilities that can be switched off per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    Broadcast,
    UserMgmt,
    SystemMgmt,
    StatsView,
    LogsView,
}

impl Privilege {
    /// Parses the names used in `DISABLED_ADMIN_PRIVILEGES`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "broadcast" => Some(Self::Broadcast),
            "user_mgmt" => Some(Self::UserMgmt),
            "system_mgmt" => Some(Self::SystemMgmt),
            "stats_view" => Some(Self::StatsView),
            "logs_view" => Some(Self::LogsView),
            _ => None,
        }
    }
}

/// Privileges granted to every admin. All are enabled by default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminPrivileges {
    disabled: HashSet<Privilege>,
}

impl AdminPrivileges {
    /// Builds privileges from a comma separated list of disabled names.
    #[must_use]
    pub fn with_disabled(list: &str) -> Self {
        Self {
            disabled: list.split(',').filter_map(Privilege::from_name).collect(),
        }
    }

    /// Whether the privilege is granted.
    #[must_use]
    pub fn allows(&self, privilege: Privilege) -> bool {
        !self.disabled.contains(&privilege)
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Telegram user ids allowed to use admin commands.
    #[serde(default)]
    pub admin_ids: HashSet<i64>,

    /// Privileges granted to admins.
    #[serde(default)]
    pub privileges: AdminPrivileges,

    /// Path of the JSON file holding bans, config and statistics.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Address the web front-end binds to.
    #[serde(default = "default_web_addr")]
    pub web_addr: String,

    /// Interval between waiting-queue timeout sweeps in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Minimum interval between outgoing messages in milliseconds.
    #[serde(default = "default_send_interval")]
    pub min_send_interval_ms: u64,

    /// Log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("bot_state.json")
}

fn default_web_addr() -> String {
    DEFAULT_WEB_ADDR.to_owned()
}

fn default_sweep_interval() -> u64 {
    5
}

fn default_send_interval() -> u64 {
    35 // keeps bulk sends under Telegram's ~30 messages per second
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            admin_ids: HashSet::new(),
            privileges: AdminPrivileges::default(),
            state_path: default_state_path(),
            web_addr: default_web_addr(),
            sweep_interval_secs: default_sweep_interval(),
            min_send_interval_ms: default_send_interval(),
            log_level: default_log_level(),
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            admin_ids: std::env::var("ADMIN_IDS")
                .map(|s| parse_admin_ids(&s))
                .unwrap_or_default(),
            privileges: std::env::var("DISABLED_ADMIN_PRIVILEGES")
                .map(|s| AdminPrivileges::with_disabled(&s))
                .unwrap_or_default(),
            state_path: std::env::var("STATE_PATH")
                .map_or_else(|_| default_state_path(), PathBuf::from),
            web_addr: std::env::var("WEB_ADDR").unwrap_or_else(|_| default_web_addr()),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&secs| secs > 0)
                .unwrap_or_else(default_sweep_interval),
            min_send_interval_ms: std::env::var("MIN_SEND_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_send_interval),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level()),
        }
    }

    /// Whether the user is a configured admin.
    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Whether the user is an admin holding the given privilege.
    #[must_use]
    pub fn has_privilege(&self, user_id: i64, privilege: Privilege) -> bool {
        self.is_admin(user_id) && self.privileges.allows(privilege)
    }
}

/// Parses a comma separated admin id list, skipping malformed entries.
fn parse_admin_ids(list: &str) -> HashSet<i64> {
    list.split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid API ID format (must be a positive integer)")]
    InvalidApiId,

    #[error("{name} must be between {min} and {max}")]
    OutOfRange {
        name: &'static str,
        min: u64,
        max: u64,
    },

    #[error("'{0}' is already in the banned words list")]
    DuplicateWord(String),

    #[error("'{0}' is not in the banned words list")]
    UnknownWord(String),

    #[error("Banned word must not be empty")]
    EmptyWord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BotSettings::default();
        assert_eq!(settings.web_addr, "0.0.0.0:5000");
        assert_eq!(settings.sweep_interval_secs, 5);
        assert_eq!(settings.state_path, PathBuf::from("bot_state.json"));
        assert!(settings.admin_ids.is_empty());
    }

    #[test]
    fn test_telegram_config_new() {
        let config = TelegramConfig::new(12345, "abc123".to_owned(), "1:token".to_owned());
        assert_eq!(config.api_id, 12345);
        assert_eq!(config.api_hash, "abc123");
        assert_eq!(config.session_path, PathBuf::from("bot.session"));
    }

    #[test]
    fn test_parse_admin_ids_skips_garbage() {
        let ids = parse_admin_ids("1, 2,,abc, 3");
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&2));
        assert!(parse_admin_ids("").is_empty());
    }

    #[test]
    fn test_privileges() {
        let mut settings = BotSettings::default();
        settings.admin_ids.insert(7);
        settings.privileges = AdminPrivileges::with_disabled("broadcast, logs_view, bogus");

        assert!(settings.is_admin(7));
        assert!(!settings.has_privilege(7, Privilege::Broadcast));
        assert!(!settings.has_privilege(7, Privilege::LogsView));
        assert!(settings.has_privilege(7, Privilege::UserMgmt));
        assert!(!settings.has_privilege(8, Privilege::UserMgmt));
    }
}
