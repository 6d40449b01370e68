//! Domain types shared by the pairing pool, rooms and handlers.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telegram user id.
pub type UserId = i64;

/// What the bot knows about a user, refreshed on every interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl UserProfile {
    /// Creates a profile seen right now.
    #[must_use]
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: None,
            username: None,
            last_seen: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// First and last name joined by a space.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name),
            _ => self.first_name.clone(),
        }
    }

    /// Identity card shown to the other side after a successful reveal.
    #[must_use]
    pub fn identity_card(&self) -> String {
        let username = self
            .username
            .as_ref()
            .map(|u| format!("\n*Username:* @{u}"))
            .unwrap_or_default();
        format!(
            "🎭 *Identity Revealed!*\n\nYou're chatting with:\n\n👤 *Name:* {}{username}",
            self.full_name()
        )
    }
}

/// How a user wants to be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    OneOnOne,
    Topic,
    Group,
}

impl ChatMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneOnOne => "one_on_one",
            Self::Topic => "topic",
            Self::Group => "group",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "one_on_one" => Some(Self::OneOnOne),
            "topic" => Some(Self::Topic),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    /// Human label used in menus.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OneOnOne => "One-on-One Chat",
            Self::Topic => "Topic-Based Chat",
            Self::Group => "Group Chat",
        }
    }
}

/// Interest topics for topic-based matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Arts,
    Books,
    Movies,
    Music,
    Sports,
    Technology,
    Gaming,
    Travel,
    Food,
    Science,
    Languages,
    Pets,
    Other,
}

impl Topic {
    /// Every topic in menu order.
    pub const ALL: [Self; 13] = [
        Self::Arts,
        Self::Books,
        Self::Movies,
        Self::Music,
        Self::Sports,
        Self::Technology,
        Self::Gaming,
        Self::Travel,
        Self::Food,
        Self::Science,
        Self::Languages,
        Self::Pets,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arts => "arts",
            Self::Books => "books",
            Self::Movies => "movies",
            Self::Music => "music",
            Self::Sports => "sports",
            Self::Technology => "technology",
            Self::Gaming => "gaming",
            Self::Travel => "travel",
            Self::Food => "food",
            Self::Science => "science",
            Self::Languages => "languages",
            Self::Pets => "pets",
            Self::Other => "other",
        }
    }

    /// Case-insensitive lookup by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Capitalized name for buttons.
    #[must_use]
    pub fn label(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user matching preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub mode: ChatMode,
    pub topic: Option<Topic>,
    pub group_id: Option<String>,
}

/// An anonymous group room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChat {
    pub id: String,
    pub name: String,
    pub creator_id: UserId,
    /// Members in join order; the position gives the anonymous member number.
    pub members: Vec<UserId>,
    pub max_size: usize,
}

impl GroupChat {
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_size
    }

    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }

    /// 1-based anonymous number of a member.
    #[must_use]
    pub fn member_number(&self, user_id: UserId) -> Option<usize> {
        self.members
            .iter()
            .position(|&m| m == user_id)
            .map(|pos| pos + 1)
    }

    /// Members except the given user.
    #[must_use]
    pub fn others(&self, user_id: UserId) -> Vec<UserId> {
        self.members
            .iter()
            .copied()
            .filter(|&m| m != user_id)
            .collect()
    }
}

/// A pending identity reveal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealRequest {
    pub partner_id: UserId,
    pub created_at: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_lookup() {
        assert_eq!(Topic::from_name("Music"), Some(Topic::Music));
        assert_eq!(Topic::from_name(" pets "), Some(Topic::Pets));
        assert_eq!(Topic::from_name("cooking"), None);
        assert_eq!(Topic::Technology.label(), "Technology");
    }

    #[test]
    fn test_identity_card() {
        let plain = UserProfile::new(1, "Ann");
        assert!(plain.identity_card().contains("*Name:* Ann"));
        assert!(!plain.identity_card().contains("Username"));

        let full = UserProfile::new(2, "Bob").with_last_name("Stone").with_username("bobs");
        let card = full.identity_card();
        assert!(card.contains("Bob Stone"));
        assert!(card.contains("@bobs"));
    }

    #[test]
    fn test_group_member_numbers() {
        let group = GroupChat {
            id: "grp_1_1000".to_owned(),
            name: "Tech".to_owned(),
            creator_id: 10,
            members: vec![10, 20, 30],
            max_size: 3,
        };
        assert!(group.is_full());
        assert_eq!(group.member_number(20), Some(2));
        assert_eq!(group.member_number(99), None);
        assert_eq!(group.others(20), vec![10, 30]);
    }
}
