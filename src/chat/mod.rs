//! Chat domain: users, the pairing pool, group rooms and moderation.

mod persist;
mod state;
mod stats;
mod types;

pub use persist::{PersistError, PersistentState};
pub use state::{
    Access, Audience, BanOutcome, ChatState, ConnectOutcome, DisconnectOutcome, GroupSummary,
    LeaveOutcome, MAX_GROUP_NAME_CHARS, RelayTarget, RevealAnswer, RevealOutcome, RoomError,
    SweepReport, TimedOut, UserInfo, WARN_AFTER, WARN_UNTIL,
};
pub use stats::{ADMIN_LOG_CAPACITY, AdminLog, AdminLogEntry, Statistics, SystemStatus};
pub use types::{ChatMode, GroupChat, Preferences, RevealRequest, Topic, UserId, UserProfile};
