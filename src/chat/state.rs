//! The pairing pool, group rooms and moderation state.
//!
//! `ChatState` is a plain synchronous structure shared behind one lock.
//! Every operation returns an outcome describing what changed so that the
//! caller can send notifications after the lock is released.
//!
//! Invariants kept by every operation:
//! - a user is in at most one of: a connection, a waiting queue, a group
//! - connections are symmetric
//! - queues hold no duplicates and a user is never matched with themself
//! - a group never stays empty

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use super::persist::PersistentState;
use super::stats::{AdminLog, Statistics, SystemStatus};
use super::types::{ChatMode, GroupChat, Preferences, RevealRequest, Topic, UserId, UserProfile};
use crate::config::SystemConfig;

/// Waiting time after which a user gets a "still searching" notice.
pub const WARN_AFTER: Duration = Duration::from_secs(30);

/// The notice is only sent while the wait is shorter than this.
pub const WARN_UNTIL: Duration = Duration::from_secs(35);

/// Longest group name kept.
pub const MAX_GROUP_NAME_CHARS: usize = 64;

/// Result of the ban/maintenance gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Banned,
    Maintenance,
}

/// Result of asking for a chat partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    AlreadyConnected,
    InGroup { name: String },
    AlreadyWaiting,
    /// Topic mode without a chosen topic.
    NeedsTopic,
    /// Group mode: the user has to create or join a room instead.
    NeedsGroup,
    Matched {
        partner: UserId,
        topic: Option<Topic>,
    },
    Queued {
        topic: Option<Topic>,
    },
}

/// Result of `/disconnect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    Ended { partner: UserId },
    CancelledSearch { topic: Option<Topic> },
    Idle,
}

/// Where a plain text message from a user goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayTarget {
    Partner(UserId),
    Group {
        group_id: String,
        recipients: Vec<UserId>,
        sender_number: usize,
    },
    Nobody,
}

/// Errors when creating or joining a group.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("already in a one-on-one conversation")]
    Connected,

    #[error("already in group '{0}'")]
    AlreadyInGroup(String),

    #[error("group no longer exists")]
    Missing,

    #[error("group is full")]
    Full,

    #[error("group name must not be empty")]
    InvalidName,
}

/// Result of leaving a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The last member left and the group was removed.
    Deleted { name: String },
    /// The creator left; the oldest remaining member took over.
    Transferred { group: GroupChat, new_creator: UserId },
    Left { group: GroupChat },
    NotInGroup,
}

/// Result of `/reveal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    NotConnected,
    AlreadyPending,
    Sent { partner: UserId },
}

/// Result of answering a reveal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealAnswer {
    Revealed {
        requester: UserProfile,
        responder: UserProfile,
    },
    Declined,
    /// The request is gone, expired or addressed to someone else.
    Invalid,
    MissingProfile,
}

/// Result of banning a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanOutcome {
    UnknownUser,
    Banned {
        former_partner: Option<UserId>,
        left_group: LeaveOutcome,
    },
}

/// Broadcast audiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Active,
    Waiting,
    Groups,
}

impl Audience {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Self::All),
            "active" => Some(Self::Active),
            "waiting" => Some(Self::Waiting),
            "groups" => Some(Self::Groups),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Waiting => "waiting",
            Self::Groups => "groups",
        }
    }

    /// Plural noun used in broadcast reports.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::All => "all users",
            Self::Active => "active users",
            Self::Waiting => "waiting users",
            Self::Groups => "group members",
        }
    }
}

/// A search that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut {
    pub user_id: UserId,
    pub topic: Option<Topic>,
}

/// What a timeout sweep changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub warnings: Vec<UserId>,
    pub timed_out: Vec<TimedOut>,
    /// `(requester, partner)` pairs whose reveal request expired.
    pub expired_reveals: Vec<(UserId, UserId)>,
}

impl SweepReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.timed_out.is_empty() && self.expired_reveals.is_empty()
    }
}

/// Group details in a user lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub members: usize,
    pub is_creator: bool,
}

/// Everything an admin sees about one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub profile: UserProfile,
    pub banned: bool,
    pub connected: bool,
    pub waiting: bool,
    pub mode: ChatMode,
    pub topic: Option<Topic>,
    pub group: Option<GroupSummary>,
}

/// In-memory state of the whole bot.
#[derive(Debug)]
pub struct ChatState {
    users: HashMap<UserId, UserProfile>,
    preferences: HashMap<UserId, Preferences>,
    waiting: Vec<UserId>,
    waiting_by_topic: HashMap<Topic, Vec<UserId>>,
    waiting_since: HashMap<UserId, Instant>,
    warned: HashSet<UserId>,
    connections: HashMap<UserId, UserId>,
    groups: BTreeMap<String, GroupChat>,
    reveals: HashMap<UserId, RevealRequest>,
    awaiting_group_name: HashSet<UserId>,
    banned: HashSet<UserId>,
    started_at: chrono::DateTime<Utc>,

    /// Admin-adjustable settings.
    pub config: SystemConfig,

    /// Usage counters.
    pub stats: Statistics,

    /// Audit log of admin actions.
    pub admin_log: AdminLog,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(SystemConfig::default())
    }
}

impl ChatState {
    /// Creates an empty state with the given configuration.
    #[must_use]
    pub fn new(config: SystemConfig) -> Self {
        Self {
            users: HashMap::new(),
            preferences: HashMap::new(),
            waiting: Vec::new(),
            waiting_by_topic: HashMap::new(),
            waiting_since: HashMap::new(),
            warned: HashSet::new(),
            connections: HashMap::new(),
            groups: BTreeMap::new(),
            reveals: HashMap::new(),
            awaiting_group_name: HashSet::new(),
            banned: HashSet::new(),
            started_at: Utc::now(),
            config,
            stats: Statistics::default(),
            admin_log: AdminLog::default(),
        }
    }

    /// Restores bans, configuration and counters saved earlier.
    #[must_use]
    pub fn from_persistent(persistent: PersistentState) -> Self {
        let mut state = Self::new(persistent.config);
        state.banned = persistent.banned_users.into_iter().collect();
        state.stats = persistent.statistics;
        state
    }

    /// Converts to persistent state for saving.
    #[must_use]
    pub fn to_persistent(&self) -> PersistentState {
        let mut banned_users: Vec<UserId> = self.banned.iter().copied().collect();
        banned_users.sort_unstable();
        PersistentState {
            banned_users,
            config: self.config.clone(),
            statistics: self.stats.clone(),
        }
    }

    // ----- users -----

    /// Inserts or refreshes a user profile.
    pub fn register_user(&mut self, mut profile: UserProfile) {
        profile.last_seen = Utc::now();
        self.users.insert(profile.id, profile);
        self.stats.unique_users = self.users.len() as u64;
    }

    #[must_use]
    pub fn user(&self, user_id: UserId) -> Option<&UserProfile> {
        self.users.get(&user_id)
    }

    /// Ban and maintenance gate. Admins always pass.
    #[must_use]
    pub fn access(&self, user_id: UserId, is_admin: bool) -> Access {
        if is_admin {
            Access::Allowed
        } else if self.banned.contains(&user_id) {
            Access::Banned
        } else if self.config.maintenance_mode {
            Access::Maintenance
        } else {
            Access::Allowed
        }
    }

    /// Preferences of a user, default when never set.
    #[must_use]
    pub fn preferences(&self, user_id: UserId) -> Preferences {
        self.preferences.get(&user_id).cloned().unwrap_or_default()
    }

    /// Switches the matching mode, cancelling any running search.
    pub fn set_mode(&mut self, user_id: UserId, mode: ChatMode) {
        self.cancel_search(user_id);
        let prefs = self.preferences.entry(user_id).or_default();
        prefs.mode = mode;
        if mode == ChatMode::OneOnOne {
            prefs.topic = None;
        }
    }

    /// Selects a topic and switches to topic mode.
    pub fn set_topic(&mut self, user_id: UserId, topic: Topic) {
        self.cancel_search(user_id);
        let prefs = self.preferences.entry(user_id).or_default();
        prefs.mode = ChatMode::Topic;
        prefs.topic = Some(topic);
    }

    fn reset_preferences(&mut self, user_id: UserId) {
        self.preferences.insert(user_id, Preferences::default());
    }

    // ----- pairing -----

    #[must_use]
    pub fn partner_of(&self, user_id: UserId) -> Option<UserId> {
        self.connections.get(&user_id).copied()
    }

    #[must_use]
    pub fn is_waiting(&self, user_id: UserId) -> bool {
        self.waiting_since.contains_key(&user_id)
    }

    /// Picks a random waiting partner matching the user's preferences.
    #[must_use]
    pub fn find_partner(&self, user_id: UserId) -> Option<UserId> {
        let prefs = self.preferences(user_id);
        match prefs.mode {
            ChatMode::OneOnOne => self.pick_partner(user_id, None),
            ChatMode::Topic => prefs
                .topic
                .and_then(|topic| self.pick_partner(user_id, Some(topic))),
            ChatMode::Group => None,
        }
    }

    fn pick_partner(&self, user_id: UserId, topic: Option<Topic>) -> Option<UserId> {
        let queue = match topic {
            None => self.waiting.as_slice(),
            Some(topic) => self
                .waiting_by_topic
                .get(&topic)
                .map_or(&[][..], Vec::as_slice),
        };
        let candidates: Vec<UserId> = queue.iter().copied().filter(|&id| id != user_id).collect();
        candidates.choose(&mut rand::rng()).copied()
    }

    /// Connects the user with a waiting partner or queues them.
    pub fn request_connection(&mut self, user_id: UserId) -> ConnectOutcome {
        self.request_connection_at(user_id, Instant::now())
    }

    /// Same as [`Self::request_connection`] with an explicit queue timestamp.
    pub fn request_connection_at(&mut self, user_id: UserId, now: Instant) -> ConnectOutcome {
        self.awaiting_group_name.remove(&user_id);
        if self.connections.contains_key(&user_id) {
            return ConnectOutcome::AlreadyConnected;
        }
        if let Some(group) = self.current_group(user_id) {
            return ConnectOutcome::InGroup {
                name: group.name.clone(),
            };
        }
        if self.is_waiting(user_id) {
            return ConnectOutcome::AlreadyWaiting;
        }

        let prefs = self.preferences(user_id);
        let topic = match prefs.mode {
            ChatMode::OneOnOne => None,
            ChatMode::Topic => match prefs.topic {
                Some(topic) => Some(topic),
                None => return ConnectOutcome::NeedsTopic,
            },
            ChatMode::Group => return ConnectOutcome::NeedsGroup,
        };

        if let Some(partner) = self.pick_partner(user_id, topic) {
            self.remove_from_queues(partner);
            self.connections.insert(user_id, partner);
            self.connections.insert(partner, user_id);
            self.stats.connections_made += 1;
            debug!("Matched {} with {}", user_id, partner);
            ConnectOutcome::Matched { partner, topic }
        } else {
            match topic {
                None => self.waiting.push(user_id),
                Some(topic) => self.waiting_by_topic.entry(topic).or_default().push(user_id),
            }
            self.waiting_since.insert(user_id, now);
            ConnectOutcome::Queued { topic }
        }
    }

    /// Removes the user from whichever queue holds them.
    ///
    /// Returns `None` when the user was not waiting, otherwise the topic of
    /// the queue they left (`None` for the one-on-one queue).
    fn remove_from_queues(&mut self, user_id: UserId) -> Option<Option<Topic>> {
        self.waiting_since.remove(&user_id);
        self.warned.remove(&user_id);

        if let Some(pos) = self.waiting.iter().position(|&id| id == user_id) {
            self.waiting.remove(pos);
            return Some(None);
        }
        for (topic, queue) in &mut self.waiting_by_topic {
            if let Some(pos) = queue.iter().position(|&id| id == user_id) {
                queue.remove(pos);
                return Some(Some(*topic));
            }
        }
        None
    }

    /// Stops a running search. Returns whether the user was waiting.
    pub fn cancel_search(&mut self, user_id: UserId) -> bool {
        self.remove_from_queues(user_id).is_some()
    }

    /// Ends a conversation or a search.
    pub fn disconnect(&mut self, user_id: UserId) -> DisconnectOutcome {
        self.awaiting_group_name.remove(&user_id);
        if let Some(partner) = self.connections.remove(&user_id) {
            self.connections.remove(&partner);
            self.reveals.remove(&user_id);
            self.reveals.remove(&partner);
            self.reset_preferences(user_id);
            self.reset_preferences(partner);
            return DisconnectOutcome::Ended { partner };
        }
        match self.remove_from_queues(user_id) {
            Some(topic) => DisconnectOutcome::CancelledSearch { topic },
            None => DisconnectOutcome::Idle,
        }
    }

    /// Resolves where a plain message from the user goes.
    #[must_use]
    pub fn relay_target(&self, user_id: UserId) -> RelayTarget {
        if let Some(&partner) = self.connections.get(&user_id) {
            return RelayTarget::Partner(partner);
        }
        if let Some(group) = self.current_group(user_id) {
            return RelayTarget::Group {
                group_id: group.id.clone(),
                recipients: group.others(user_id),
                sender_number: group.member_number(user_id).unwrap_or(0),
            };
        }
        RelayTarget::Nobody
    }

    // ----- groups -----

    /// The group the user is a member of.
    #[must_use]
    pub fn current_group(&self, user_id: UserId) -> Option<&GroupChat> {
        let group_id = self.preferences.get(&user_id)?.group_id.as_ref()?;
        self.groups.get(group_id).filter(|g| g.contains(user_id))
    }

    #[must_use]
    pub fn group(&self, group_id: &str) -> Option<&GroupChat> {
        self.groups.get(group_id)
    }

    /// Groups that still have room, in id order.
    #[must_use]
    pub fn open_groups(&self) -> Vec<GroupChat> {
        self.groups.values().filter(|g| !g.is_full()).cloned().collect()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn ensure_free_for_group(&self, user_id: UserId) -> Result<(), RoomError> {
        if self.connections.contains_key(&user_id) {
            return Err(RoomError::Connected);
        }
        if let Some(group) = self.current_group(user_id) {
            return Err(RoomError::AlreadyInGroup(group.name.clone()));
        }
        Ok(())
    }

    fn generate_group_id(&self) -> String {
        let mut rng = rand::rng();
        loop {
            let id = format!(
                "grp_{}_{}",
                Utc::now().timestamp(),
                rng.random_range(1000..=9999)
            );
            if !self.groups.contains_key(&id) {
                return id;
            }
        }
    }

    /// Creates a group with the user as creator and first member.
    pub fn create_group(&mut self, creator_id: UserId, name: &str) -> Result<GroupChat, RoomError> {
        self.ensure_free_for_group(creator_id)?;
        let name: String = name.trim().chars().take(MAX_GROUP_NAME_CHARS).collect();
        if name.is_empty() {
            return Err(RoomError::InvalidName);
        }

        self.cancel_search(creator_id);
        let group = GroupChat {
            id: self.generate_group_id(),
            name,
            creator_id,
            members: vec![creator_id],
            max_size: self.config.max_group_size,
        };
        self.groups.insert(group.id.clone(), group.clone());

        let prefs = self.preferences.entry(creator_id).or_default();
        prefs.mode = ChatMode::Group;
        prefs.group_id = Some(group.id.clone());
        self.stats.groups_created += 1;

        debug!("Group {} created by {}", group.id, creator_id);
        Ok(group)
    }

    /// Adds the user to an existing group.
    pub fn join_group(&mut self, user_id: UserId, group_id: &str) -> Result<GroupChat, RoomError> {
        self.awaiting_group_name.remove(&user_id);
        self.ensure_free_for_group(user_id)?;
        let group = self.groups.get_mut(group_id).ok_or(RoomError::Missing)?;
        if group.is_full() {
            return Err(RoomError::Full);
        }
        group.members.push(user_id);
        let joined = group.clone();

        self.cancel_search(user_id);
        let prefs = self.preferences.entry(user_id).or_default();
        prefs.mode = ChatMode::Group;
        prefs.group_id = Some(joined.id.clone());
        Ok(joined)
    }

    /// Removes the user from their group.
    pub fn leave_group(&mut self, user_id: UserId) -> LeaveOutcome {
        let Some(group_id) = self
            .preferences
            .get(&user_id)
            .and_then(|p| p.group_id.clone())
        else {
            return LeaveOutcome::NotInGroup;
        };
        self.reset_preferences(user_id);

        let Some(group) = self.groups.get_mut(&group_id) else {
            return LeaveOutcome::NotInGroup;
        };
        if !group.contains(user_id) {
            return LeaveOutcome::NotInGroup;
        }
        group.members.retain(|&m| m != user_id);

        if group.members.is_empty() {
            let name = group.name.clone();
            self.groups.remove(&group_id);
            return LeaveOutcome::Deleted { name };
        }
        if group.creator_id == user_id {
            let new_creator = group.members[0];
            group.creator_id = new_creator;
            return LeaveOutcome::Transferred {
                group: group.clone(),
                new_creator,
            };
        }
        LeaveOutcome::Left {
            group: group.clone(),
        }
    }

    /// Marks that the next plain message of the user is a group name.
    pub fn await_group_name(&mut self, user_id: UserId) {
        self.awaiting_group_name.insert(user_id);
    }

    /// Consumes the pending group-name request, if any.
    ///
    /// A request only counts while the user is free to create a group.
    pub fn take_group_name_request(&mut self, user_id: UserId) -> bool {
        self.awaiting_group_name.remove(&user_id)
            && !self.connections.contains_key(&user_id)
            && self.current_group(user_id).is_none()
    }

    // ----- reveal handshake -----

    /// Records a reveal request towards the current partner.
    pub fn request_reveal(&mut self, user_id: UserId) -> RevealOutcome {
        self.request_reveal_at(user_id, Instant::now())
    }

    pub fn request_reveal_at(&mut self, user_id: UserId, now: Instant) -> RevealOutcome {
        let Some(&partner) = self.connections.get(&user_id) else {
            return RevealOutcome::NotConnected;
        };
        if self.reveals.contains_key(&user_id) {
            return RevealOutcome::AlreadyPending;
        }
        self.reveals.insert(
            user_id,
            RevealRequest {
                partner_id: partner,
                created_at: now,
            },
        );
        RevealOutcome::Sent { partner }
    }

    /// Applies the partner's answer to a reveal request.
    pub fn answer_reveal(
        &mut self,
        responder_id: UserId,
        requester_id: UserId,
        accept: bool,
    ) -> RevealAnswer {
        self.answer_reveal_at(responder_id, requester_id, accept, Instant::now())
    }

    /// Same as [`Self::answer_reveal`] as of `now`. Requests older than
    /// `reveal_timeout` are dropped and answer as `Invalid`.
    pub fn answer_reveal_at(
        &mut self,
        responder_id: UserId,
        requester_id: UserId,
        accept: bool,
        now: Instant,
    ) -> RevealAnswer {
        let created_at = match self.reveals.get(&requester_id) {
            Some(request) if request.partner_id == responder_id => request.created_at,
            _ => return RevealAnswer::Invalid,
        };
        self.reveals.remove(&requester_id);

        let reveal_timeout = Duration::from_secs(self.config.reveal_timeout);
        if now.saturating_duration_since(created_at) > reveal_timeout {
            debug!("Reveal request from {} expired before the answer", requester_id);
            return RevealAnswer::Invalid;
        }

        if self.connections.get(&requester_id) != Some(&responder_id) {
            return RevealAnswer::Invalid;
        }
        if !accept {
            return RevealAnswer::Declined;
        }
        match (self.users.get(&requester_id), self.users.get(&responder_id)) {
            (Some(requester), Some(responder)) => RevealAnswer::Revealed {
                requester: requester.clone(),
                responder: responder.clone(),
            },
            _ => RevealAnswer::MissingProfile,
        }
    }

    #[must_use]
    pub fn has_pending_reveal(&self, user_id: UserId) -> bool {
        self.reveals.contains_key(&user_id)
    }

    // ----- moderation -----

    #[must_use]
    pub fn is_banned(&self, user_id: UserId) -> bool {
        self.banned.contains(&user_id)
    }

    /// Bans a known user and removes them from every conversation.
    pub fn ban(&mut self, user_id: UserId) -> BanOutcome {
        if !self.users.contains_key(&user_id) {
            return BanOutcome::UnknownUser;
        }
        self.banned.insert(user_id);
        self.awaiting_group_name.remove(&user_id);

        let former_partner = match self.disconnect(user_id) {
            DisconnectOutcome::Ended { partner } => Some(partner),
            _ => None,
        };
        let left_group = self.leave_group(user_id);
        BanOutcome::Banned {
            former_partner,
            left_group,
        }
    }

    /// Lifts a ban. Returns whether the user was banned.
    pub fn unban(&mut self, user_id: UserId) -> bool {
        self.banned.remove(&user_id)
    }

    #[must_use]
    pub fn banned_users(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.banned.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Toggles maintenance mode.
    ///
    /// Enabling it ends every conversation between two non-admins and
    /// returns those pairs.
    pub fn set_maintenance(
        &mut self,
        enable: bool,
        admins: &HashSet<UserId>,
    ) -> Vec<(UserId, UserId)> {
        self.config.maintenance_mode = enable;
        if !enable {
            return Vec::new();
        }

        let mut pairs: Vec<(UserId, UserId)> = self
            .connections
            .iter()
            .filter(|&(a, b)| a < b && !admins.contains(a) && !admins.contains(b))
            .map(|(&a, &b)| (a, b))
            .collect();
        pairs.sort_unstable();
        for &(a, _) in &pairs {
            self.disconnect(a);
        }
        pairs
    }

    // ----- broadcast -----

    /// Recipients of a broadcast, deduplicated, banned users excluded.
    #[must_use]
    pub fn audience(&self, audience: Audience) -> Vec<UserId> {
        let mut ids: Vec<UserId> = match audience {
            Audience::All => self.users.keys().copied().collect(),
            Audience::Active => self.connections.keys().copied().collect(),
            Audience::Waiting => self.waiting_since.keys().copied().collect(),
            Audience::Groups => self
                .groups
                .values()
                .flat_map(|g| g.members.iter().copied())
                .collect(),
        };
        ids.retain(|id| !self.banned.contains(id));
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    // ----- timeouts -----

    /// Warns long waiters, times out expired searches and drops stale
    /// reveal requests.
    pub fn sweep_waiting(&mut self, now: Instant) -> SweepReport {
        let timeout = Duration::from_secs(self.config.connection_timeout);
        let mut report = SweepReport::default();

        let mut waiters: Vec<(UserId, Instant)> =
            self.waiting_since.iter().map(|(&id, &t)| (id, t)).collect();
        waiters.sort_unstable_by_key(|&(id, _)| id);

        for (user_id, since) in waiters {
            let waited = now.saturating_duration_since(since);
            if waited > timeout {
                if let Some(topic) = self.remove_from_queues(user_id) {
                    report.timed_out.push(TimedOut { user_id, topic });
                }
            } else if waited >= WARN_AFTER && waited < WARN_UNTIL && self.warned.insert(user_id) {
                report.warnings.push(user_id);
            }
        }

        let reveal_timeout = Duration::from_secs(self.config.reveal_timeout);
        let mut expired: Vec<(UserId, UserId)> = self
            .reveals
            .iter()
            .filter(|(_, r)| now.saturating_duration_since(r.created_at) > reveal_timeout)
            .map(|(&requester, r)| (requester, r.partner_id))
            .collect();
        expired.sort_unstable();
        for (requester, _) in &expired {
            self.reveals.remove(requester);
        }
        report.expired_reveals = expired;

        report
    }

    // ----- statistics and lookup -----

    /// Counts a relayed message.
    pub fn record_message(&mut self) {
        self.stats.total_messages += 1;
    }

    /// Recomputes user counters for the given day.
    pub fn refresh_statistics(&mut self, today: NaiveDate) {
        self.stats.unique_users = self.users.len() as u64;
        self.stats.active_users_today = self
            .users
            .values()
            .filter(|u| u.last_seen.date_naive() == today)
            .count() as u64;
    }

    /// Live counts for the dashboard.
    #[must_use]
    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            connections: self.connections.len() / 2,
            waiting_users: self.waiting_since.len(),
            total_users: self.users.len(),
            active_groups: self.groups.len(),
            banned_users: self.banned.len(),
            maintenance_mode: self.config.maintenance_mode,
            started_at: self.started_at,
        }
    }

    /// Finds a user by numeric id or username (leading `@` optional).
    #[must_use]
    pub fn find_user(&self, term: &str) -> Option<UserId> {
        let term = term.trim();
        if let Ok(id) = term.parse::<UserId>() {
            return self.users.contains_key(&id).then_some(id);
        }
        let wanted = term.trim_start_matches('@').to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.users
            .values()
            .find(|u| {
                u.username
                    .as_ref()
                    .is_some_and(|name| name.to_lowercase() == wanted)
            })
            .map(|u| u.id)
    }

    /// Detailed information about a known user.
    #[must_use]
    pub fn user_info(&self, user_id: UserId) -> Option<UserInfo> {
        let profile = self.users.get(&user_id)?.clone();
        let prefs = self.preferences(user_id);
        let group = self.current_group(user_id).map(|g| GroupSummary {
            id: g.id.clone(),
            name: g.name.clone(),
            members: g.members.len(),
            is_creator: g.creator_id == user_id,
        });
        Some(UserInfo {
            profile,
            banned: self.banned.contains(&user_id),
            connected: self.connections.contains_key(&user_id),
            waiting: self.is_waiting(user_id),
            mode: prefs.mode,
            topic: prefs.topic,
            group,
        })
    }
}
