//! State that survives restarts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Statistics, UserId};
use crate::config::SystemConfig;

/// Errors while writing the state file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to write state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Bans, admin configuration and counters saved to a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentState {
    pub banned_users: Vec<UserId>,
    pub config: SystemConfig,
    pub statistics: Statistics,
}

impl PersistentState {
    /// Loads state from a JSON file, returns default if not found or invalid.
    pub fn load(path: impl AsRef<Path>) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Saves state to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = PersistentState::load(dir.path().join("absent.json"));
        let default = PersistentState::default();
        assert!(state.banned_users.is_empty());
        assert_eq!(state.config, default.config);
        assert_eq!(state.statistics.total_messages, 0);
        assert_eq!(state.statistics.connections_made, 0);
        assert_eq!(state.statistics.groups_created, 0);
    }

    #[test]
    fn test_invalid_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(PersistentState::load(&path).banned_users.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = PersistentState::default();
        state.banned_users.push(42);
        state.config.maintenance_mode = true;
        state.config.banned_words.push("spam".to_owned());
        state.statistics.total_messages = 17;
        state.save(&path).unwrap();

        let loaded = PersistentState::load(&path);
        assert_eq!(loaded.banned_users, vec![42]);
        assert!(loaded.config.maintenance_mode);
        assert_eq!(loaded.statistics.total_messages, 17);
    }
}
