//! Usage statistics and the admin audit log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Maximum admin log entries kept in memory.
pub const ADMIN_LOG_CAPACITY: usize = 200;

/// Counters shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub total_messages: u64,
    pub connections_made: u64,
    pub groups_created: u64,

    /// Known users in this process, recomputed from the live user table.
    #[serde(skip)]
    pub unique_users: u64,
    pub active_users_today: u64,
    pub last_reset: DateTime<Utc>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            total_messages: 0,
            connections_made: 0,
            groups_created: 0,
            unique_users: 0,
            active_users_today: 0,
            last_reset: Utc::now(),
        }
    }
}

/// Snapshot of live counts for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStatus {
    pub connections: usize,
    pub waiting_users: usize,
    pub total_users: usize,
    pub active_groups: usize,
    pub banned_users: usize,
    pub maintenance_mode: bool,
    pub started_at: DateTime<Utc>,
}

impl SystemStatus {
    /// Uptime as `HH:MM:SS`, or `Nd HH:MM:SS` past one day.
    #[must_use]
    pub fn uptime(&self, now: DateTime<Utc>) -> String {
        let secs = (now - self.started_at).num_seconds().max(0);
        let days = secs / 86_400;
        let hours = (secs % 86_400) / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;
        if days > 0 {
            format!("{days}d {hours:02}:{mins:02}:{secs:02}")
        } else {
            format!("{hours:02}:{mins:02}:{secs:02}")
        }
    }
}

/// One audited admin action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLogEntry {
    pub admin_id: UserId,
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded admin audit log, newest last.
#[derive(Debug, Clone, Default)]
pub struct AdminLog {
    entries: VecDeque<AdminLogEntry>,
}

impl AdminLog {
    pub fn record(&mut self, admin_id: UserId, action: &str, details: impl Into<String>) {
        if self.entries.len() >= ADMIN_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(AdminLogEntry {
            admin_id,
            action: action.to_owned(),
            details: details.into(),
            timestamp: Utc::now(),
        });
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &AdminLogEntry> {
        self.entries.iter().rev().take(limit)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_admin_log_is_bounded() {
        let mut log = AdminLog::default();
        for i in 0..(ADMIN_LOG_CAPACITY + 5) {
            log.record(1, "action", format!("#{i}"));
        }
        assert_eq!(log.len(), ADMIN_LOG_CAPACITY);
        let newest = log.recent(1).next().unwrap();
        assert_eq!(newest.details, format!("#{}", ADMIN_LOG_CAPACITY + 4));
    }

    #[test]
    fn test_unique_users_not_persisted() {
        let stats = Statistics {
            unique_users: 7,
            total_messages: 3,
            ..Statistics::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(!json.contains("unique_users"));

        let loaded: Statistics = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.unique_users, 0);
        assert_eq!(loaded.total_messages, 3);
    }

    #[test]
    fn test_uptime_format() {
        let started_at = Utc::now();
        let status = SystemStatus {
            connections: 0,
            waiting_users: 0,
            total_users: 0,
            active_groups: 0,
            banned_users: 0,
            maintenance_mode: false,
            started_at,
        };
        assert_eq!(status.uptime(started_at + Duration::seconds(3725)), "01:02:05");
        assert_eq!(
            status.uptime(started_at + Duration::seconds(90_061)),
            "1d 01:01:01"
        );
    }
}
