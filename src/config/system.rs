//! Runtime system configuration changed by admins.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::ConfigError;

const CONNECTION_TIMEOUT_RANGE: RangeInclusive<u64> = 5..=300;
const GROUP_SIZE_RANGE: RangeInclusive<u64> = 2..=50;
const REVEAL_TIMEOUT_RANGE: RangeInclusive<u64> = 30..=3600;

/// Settings admins can adjust while the bot runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Seconds a user waits in a queue before the search times out.
    pub connection_timeout: u64,

    /// Maximum members of a newly created group.
    pub max_group_size: usize,

    /// Seconds an identity reveal request stays valid.
    pub reveal_timeout: u64,

    /// Lower-cased words that block a message from being relayed.
    pub banned_words: Vec<String>,

    /// When set, only admins can use the bot.
    pub maintenance_mode: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            connection_timeout: 45,
            max_group_size: 10,
            reveal_timeout: 300,
            banned_words: Vec::new(),
            maintenance_mode: false,
        }
    }
}

fn check_range(
    name: &'static str,
    value: u64,
    range: &RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            name,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

impl SystemConfig {
    pub fn set_connection_timeout(&mut self, secs: u64) -> Result<(), ConfigError> {
        self.connection_timeout = check_range("Timeout", secs, &CONNECTION_TIMEOUT_RANGE)?;
        Ok(())
    }

    pub fn set_max_group_size(&mut self, size: u64) -> Result<(), ConfigError> {
        let size = check_range("Group size", size, &GROUP_SIZE_RANGE)?;
        self.max_group_size = usize::try_from(size).unwrap_or(usize::MAX);
        Ok(())
    }

    pub fn set_reveal_timeout(&mut self, secs: u64) -> Result<(), ConfigError> {
        self.reveal_timeout = check_range("Reveal timeout", secs, &REVEAL_TIMEOUT_RANGE)?;
        Ok(())
    }

    /// Adds a banned word, returning the normalized form.
    pub fn add_banned_word(&mut self, word: &str) -> Result<String, ConfigError> {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Err(ConfigError::EmptyWord);
        }
        if self.banned_words.contains(&word) {
            return Err(ConfigError::DuplicateWord(word));
        }
        self.banned_words.push(word.clone());
        Ok(word)
    }

    /// Removes a banned word, returning the normalized form.
    pub fn remove_banned_word(&mut self, word: &str) -> Result<String, ConfigError> {
        let word = word.trim().to_lowercase();
        let Some(pos) = self.banned_words.iter().position(|w| *w == word) else {
            return Err(ConfigError::UnknownWord(word));
        };
        self.banned_words.remove(pos);
        Ok(word)
    }

    /// Whether the text contains any banned word (case-insensitive).
    #[must_use]
    pub fn contains_banned_word(&self, text: &str) -> bool {
        if self.banned_words.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        self.banned_words.iter().any(|w| lower.contains(w.as_str()))
    }
}
