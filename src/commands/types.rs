//! Command, callback and reply types.

use std::fmt;

use crate::chat::{Audience, ChatMode, Topic, UserId};

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Welcome message and mode selection.
    Start,

    Help,

    /// Find a partner according to the current mode.
    Connect,

    /// End the conversation or cancel the search.
    Disconnect,

    /// Ask the partner for a mutual identity reveal.
    Reveal,

    /// Create an invite link for the current chat.
    Invite,

    /// Legacy broadcast to every user.
    Broadcast(String),

    /// Topic menu, or select the named topic directly.
    Topic(Option<String>),

    /// Group menu, or create a group with the given name.
    Group(Option<String>),

    Mode,
    Leave,

    /// Mood menu, or send the named mood directly.
    Mood(Option<String>),

    Admin,
    AdminUsers,
    AdminBroadcast,
    AdminConfig,
    AdminFindUser(String),
    BroadcastTo(Audience, String),
    SetTimeout(u64),
    SetGroupSize(u64),
    SetRevealTimeout(u64),
    AddBannedWord(String),
    RemoveBannedWord(String),
    Ban {
        user_id: UserId,
        reason: Option<String>,
    },
    Unban(UserId),

    /// A known command with missing or malformed arguments.
    Usage(String),

    /// A slash command the bot does not know.
    Unknown(String),
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Returns `None` if the message is not a command or is addressed to a
    /// different bot (`/cmd@otherbot`).
    #[must_use]
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let text = text.trim();
        let after_slash = text.strip_prefix('/')?;

        let (head, args) = match after_slash.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (after_slash, ""),
        };
        let (name, mention) = match head.split_once('@') {
            Some((name, mention)) => (name, Some(mention)),
            None => (head, None),
        };
        if let (Some(mention), Some(me)) = (mention, bot_username) {
            if !mention.eq_ignore_ascii_case(me.trim_start_matches('@')) {
                return None;
            }
        }

        let name = name.to_lowercase();
        let optional = (!args.is_empty()).then(|| args.to_owned());

        let command = match name.as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "reveal" => Self::Reveal,
            "invite" => Self::Invite,
            "broadcast" => required(args, "⚠️ Please provide a message to broadcast: /broadcast <message>")
                .map_or_else(Self::Usage, Self::Broadcast),
            "topic" => Self::Topic(optional),
            "group" => Self::Group(optional),
            "mode" => Self::Mode,
            "leave" => Self::Leave,
            "mood" => Self::Mood(optional.map(|m| m.to_lowercase())),
            "admin" => Self::Admin,
            "admin_users" => Self::AdminUsers,
            "admin_broadcast" => Self::AdminBroadcast,
            "admin_config" => Self::AdminConfig,
            "admin_find_user" => required(
                args,
                "⚠️ Please provide a user ID or username to search for: /admin_find_user <user_id or username>",
            )
            .map_or_else(Self::Usage, |term| {
                Self::AdminFindUser(term.split_whitespace().next().unwrap_or_default().to_owned())
            }),
            "set_timeout" => parse_number(args, "set_timeout", "Timeout")
                .map_or_else(Self::Usage, Self::SetTimeout),
            "set_group_size" => parse_number(args, "set_group_size", "Group size")
                .map_or_else(Self::Usage, Self::SetGroupSize),
            "set_reveal_timeout" => parse_number(args, "set_reveal_timeout", "Reveal timeout")
                .map_or_else(Self::Usage, Self::SetRevealTimeout),
            "add_banned_word" => first_word(args, "add_banned_word")
                .map_or_else(Self::Usage, Self::AddBannedWord),
            "remove_banned_word" => first_word(args, "remove_banned_word")
                .map_or_else(Self::Usage, Self::RemoveBannedWord),
            "ban" => Self::parse_ban(args),
            "unban" => args
                .split_whitespace()
                .next()
                .and_then(|id| id.parse().ok())
                .map_or_else(|| Self::Usage("⚠️ Usage: /unban <user_id>".to_owned()), Self::Unban),
            other => match other.strip_prefix("broadcast_") {
                Some(target) => match Audience::from_name(target) {
                    Some(audience) => required(
                        args,
                        &format!("⚠️ Please provide a message to broadcast: /broadcast_{target} <message>"),
                    )
                    .map_or_else(Self::Usage, |msg| Self::BroadcastTo(audience, msg)),
                    None => Self::Unknown(other.to_owned()),
                },
                None => Self::Unknown(other.to_owned()),
            },
        };
        Some(command)
    }

    /// Parses ban arguments: `<user_id> [reason]`
    fn parse_ban(args: &str) -> Self {
        let (id, reason) = match args.split_once(char::is_whitespace) {
            Some((id, reason)) => (id, Some(reason.trim().to_owned())),
            None => (args, None),
        };
        match id.parse() {
            Ok(user_id) => Self::Ban {
                user_id,
                reason: reason.filter(|r| !r.is_empty()),
            },
            Err(_) => Self::Usage("⚠️ Usage: /ban <user_id> [reason]".to_owned()),
        }
    }

    /// Whether the command is restricted to admins.
    #[must_use]
    pub const fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::Broadcast(_)
                | Self::Admin
                | Self::AdminUsers
                | Self::AdminBroadcast
                | Self::AdminConfig
                | Self::AdminFindUser(_)
                | Self::BroadcastTo(..)
                | Self::SetTimeout(_)
                | Self::SetGroupSize(_)
                | Self::SetRevealTimeout(_)
                | Self::AddBannedWord(_)
                | Self::RemoveBannedWord(_)
                | Self::Ban { .. }
                | Self::Unban(_)
        )
    }

    /// Returns the command name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Reveal => "reveal",
            Self::Invite => "invite",
            Self::Broadcast(_) => "broadcast",
            Self::Topic(_) => "topic",
            Self::Group(_) => "group",
            Self::Mode => "mode",
            Self::Leave => "leave",
            Self::Mood(_) => "mood",
            Self::Admin => "admin",
            Self::AdminUsers => "admin_users",
            Self::AdminBroadcast => "admin_broadcast",
            Self::AdminConfig => "admin_config",
            Self::AdminFindUser(_) => "admin_find_user",
            Self::BroadcastTo(..) => "broadcast_to",
            Self::SetTimeout(_) => "set_timeout",
            Self::SetGroupSize(_) => "set_group_size",
            Self::SetRevealTimeout(_) => "set_reveal_timeout",
            Self::AddBannedWord(_) => "add_banned_word",
            Self::RemoveBannedWord(_) => "remove_banned_word",
            Self::Ban { .. } => "ban",
            Self::Unban(_) => "unban",
            Self::Usage(_) => "usage",
            Self::Unknown(_) => "unknown",
        }
    }

    /// User-facing commands with their descriptions, in help order.
    #[must_use]
    pub fn user_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("/start", "Start the bot and see the welcome message"),
            ("/connect", "Find a random chat partner"),
            ("/disconnect", "End the current conversation"),
            ("/reveal", "Request to reveal identities with your partner"),
            ("/invite", "Create an invite link for a group or channel"),
            ("/broadcast <message>", "Send a message to all users (admin only)"),
            ("/topic", "Choose a conversation topic"),
            ("/group", "Create or join an anonymous group chat"),
            ("/mode", "Switch between chat modes"),
            ("/leave", "Leave the current group chat"),
            ("/mood", "Send an emoji reaction to your partner"),
        ]
    }

    /// Admin commands with their descriptions.
    #[must_use]
    pub fn admin_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("/admin", "Open the admin dashboard"),
            ("/admin_users", "User management"),
            ("/admin_find_user <id or username>", "Look up a user"),
            ("/admin_broadcast", "Targeted broadcast options"),
            ("/broadcast_all|active|waiting|groups <message>", "Broadcast to an audience"),
            ("/admin_config", "Show system configuration"),
            ("/set_timeout <seconds>", "Set connection timeout"),
            ("/set_group_size <number>", "Set max group size"),
            ("/set_reveal_timeout <seconds>", "Set identity reveal timeout"),
            ("/add_banned_word <word>", "Add a banned word"),
            ("/remove_banned_word <word>", "Remove a banned word"),
            ("/ban <user_id> [reason]", "Ban a user"),
            ("/unban <user_id>", "Unban a user"),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topic(Some(topic)) => write!(f, "topic {topic}"),
            Self::Mood(Some(mood)) => write!(f, "mood {mood}"),
            Self::AdminFindUser(term) => write!(f, "admin_find_user {term}"),
            Self::BroadcastTo(audience, _) => write!(f, "broadcast_{}", audience.as_str()),
            Self::SetTimeout(n) => write!(f, "set_timeout {n}"),
            Self::SetGroupSize(n) => write!(f, "set_group_size {n}"),
            Self::SetRevealTimeout(n) => write!(f, "set_reveal_timeout {n}"),
            Self::Ban { user_id, .. } => write!(f, "ban {user_id}"),
            Self::Unban(user_id) => write!(f, "unban {user_id}"),
            Self::Unknown(name) => write!(f, "unknown /{name}"),
            _ => f.write_str(self.name()),
        }
    }
}

fn required(args: &str, usage: &str) -> Result<String, String> {
    if args.is_empty() {
        Err(usage.to_owned())
    } else {
        Ok(args.to_owned())
    }
}

fn first_word(args: &str, action: &str) -> Result<String, String> {
    args.split_whitespace()
        .next()
        .map(str::to_owned)
        .ok_or_else(|| format!("⚠️ Please provide a value for the {action} setting."))
}

fn parse_number(args: &str, action: &str, label: &str) -> Result<u64, String> {
    let value = first_word(args, action)?;
    value
        .parse()
        .map_err(|_| format!("⚠️ {label} must be a number."))
}

/// Emoji reactions attached to relayed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Heart,
    Laugh,
    Wow,
    Sad,
    Angry,
    Clap,
}

impl Reaction {
    /// Buttons under a one-on-one message.
    pub const DIRECT: [Self; 5] = [Self::Heart, Self::Laugh, Self::Wow, Self::Sad, Self::Angry];

    /// Buttons under a group message.
    pub const GROUP: [Self; 5] = [Self::Like, Self::Heart, Self::Laugh, Self::Wow, Self::Clap];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Heart => "heart",
            Self::Laugh => "laugh",
            Self::Wow => "wow",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Clap => "clap",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "like" => Some(Self::Like),
            "heart" => Some(Self::Heart),
            "laugh" => Some(Self::Laugh),
            "wow" => Some(Self::Wow),
            "sad" => Some(Self::Sad),
            "angry" => Some(Self::Angry),
            "clap" => Some(Self::Clap),
            _ => None,
        }
    }

    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Like => "👍",
            Self::Heart => "❤️",
            Self::Laugh => "😂",
            Self::Wow => "😮",
            Self::Sad => "😢",
            Self::Angry => "😡",
            Self::Clap => "👏",
        }
    }

    /// Text the partner sees for a one-on-one reaction.
    #[must_use]
    pub fn partner_notice(self) -> String {
        let emoji = self.emoji();
        let headline = match self {
            Self::Heart => "❤️ *Someone liked your message* ❤️",
            Self::Laugh => "😂 *Someone found your message funny* 😂",
            Self::Wow => "😮 *Someone was surprised by your message* 😮",
            Self::Sad => "😢 *Someone felt sad about your message* 😢",
            Self::Angry => "😡 *Someone reacted strongly to your message* 😡",
            Self::Like | Self::Clap => "👍 *Someone reacted to your message*",
        };
        format!("{headline}\n\nYour chat partner reacted with {emoji}")
    }

    /// Text the author of a group message sees.
    #[must_use]
    pub fn author_notice(self, reactor_number: usize) -> String {
        let emoji = self.emoji();
        match self {
            Self::Heart => format!(
                "❤️ *Someone liked your message in the group*\n\nGroup Member #{reactor_number} reacted with {emoji}"
            ),
            Self::Clap => format!(
                "👏 *Your message received applause*\n\nGroup Member #{reactor_number} is clapping for your message {emoji}"
            ),
            Self::Laugh => format!(
                "😂 *Your message made someone laugh*\n\nGroup Member #{reactor_number} found your message funny {emoji}"
            ),
            _ => format!(
                "💫 *Group Member #{reactor_number} reacted to your message*\n\nThey sent: {emoji}"
            ),
        }
    }
}

/// Moods sent with `/mood`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Happy,
    Laugh,
    Love,
    Wow,
    Sad,
    Angry,
    Thumbsup,
    Fire,
    Clap,
    Thinking,
    Cool,
    Party,
}

impl Mood {
    /// Every mood in menu order.
    pub const ALL: [Self; 12] = [
        Self::Happy,
        Self::Laugh,
        Self::Love,
        Self::Wow,
        Self::Sad,
        Self::Angry,
        Self::Thumbsup,
        Self::Fire,
        Self::Clap,
        Self::Thinking,
        Self::Cool,
        Self::Party,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Laugh => "laugh",
            Self::Love => "love",
            Self::Wow => "wow",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Thumbsup => "thumbsup",
            Self::Fire => "fire",
            Self::Clap => "clap",
            Self::Thinking => "thinking",
            Self::Cool => "cool",
            Self::Party => "party",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Happy => "😊",
            Self::Laugh => "😂",
            Self::Love => "❤️",
            Self::Wow => "😮",
            Self::Sad => "😢",
            Self::Angry => "😡",
            Self::Thumbsup => "👍",
            Self::Fire => "🔥",
            Self::Clap => "👏",
            Self::Thinking => "🤔",
            Self::Cool => "😎",
            Self::Party => "🎉",
        }
    }

    /// Decoration line for the more expressive moods.
    #[must_use]
    pub const fn decoration(self) -> Option<&'static str> {
        match self {
            Self::Love => Some("❤️ 💕 ❤️ 💕 ❤️"),
            Self::Fire => Some("🔥 🔥 🔥 🔥 🔥"),
            Self::Party => Some("🎉 🎊 🎉 🎊 🎉"),
            _ => None,
        }
    }

    /// Text the partner receives.
    #[must_use]
    pub fn partner_display(self) -> String {
        let emoji = self.emoji();
        match self.decoration() {
            Some(deco) => format!(
                "💫 *Reaction Received!*\n\n{deco}\n\nYour chat partner reacted with {emoji}\n{deco}"
            ),
            None => format!("💭 Your chat partner sent a reaction: {emoji}"),
        }
    }
}

/// Admin inline-button actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Dashboard,
    Users,
    Stats,
    Broadcast,
    BroadcastTo(Audience),
    Config,
    Logs,
    ViewBanned,
    ActiveUsers,
    WaitingUsers,
    Maintenance(bool),
    Ban(UserId),
    Unban(UserId),
    Disconnect(UserId),
    RemoveWaiting(UserId),
    RemoveGroup(UserId),
    SetTimeout(u64),
    SetGroupSize(u64),
    Unknown,
}

impl AdminAction {
    fn parse(action: &str) -> Self {
        let id = |rest: &str| rest.parse::<i64>().ok();
        let num = |rest: &str| rest.parse::<u64>().ok();

        match action {
            "dashboard" => return Self::Dashboard,
            "users" => return Self::Users,
            "stats" => return Self::Stats,
            "broadcast" => return Self::Broadcast,
            "config" => return Self::Config,
            "logs" => return Self::Logs,
            "view_banned" => return Self::ViewBanned,
            "active_users" => return Self::ActiveUsers,
            "waiting_users" => return Self::WaitingUsers,
            "maint_on" => return Self::Maintenance(true),
            "maint_off" => return Self::Maintenance(false),
            _ => {}
        }

        let parsed = if let Some(rest) = action.strip_prefix("broadcast_") {
            Audience::from_name(rest).map(Self::BroadcastTo)
        } else if let Some(rest) = action.strip_prefix("ban_") {
            id(rest).map(Self::Ban)
        } else if let Some(rest) = action.strip_prefix("unban_") {
            id(rest).map(Self::Unban)
        } else if let Some(rest) = action.strip_prefix("disconnect_") {
            id(rest).map(Self::Disconnect)
        } else if let Some(rest) = action.strip_prefix("remove_waiting_") {
            id(rest).map(Self::RemoveWaiting)
        } else if let Some(rest) = action.strip_prefix("remove_group_") {
            id(rest).map(Self::RemoveGroup)
        } else if let Some(rest) = action.strip_prefix("set_timeout_") {
            num(rest).map(Self::SetTimeout)
        } else if let Some(rest) = action.strip_prefix("set_group_") {
            num(rest).map(Self::SetGroupSize)
        } else {
            None
        };
        parsed.unwrap_or(Self::Unknown)
    }
}

/// Inline-button payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    RevealAnswer { requester: UserId, accept: bool },
    SelectMode(ChatMode),
    SelectTopic(Topic),
    GroupCreate,
    GroupBrowse,
    JoinGroup(String),
    LeaveGroup,
    ConnectNow,
    TryAgain,
    ChangeMode,
    CancelSearch,
    ContinueChat,
    ShowTips,
    CloseTips,
    RequestReveal,
    React(Reaction),
    SelectMood(Mood),
    CancelMood,
    TryMood,
    GroupReact {
        reaction: Reaction,
        group_id: String,
        sender_number: usize,
    },
    Admin(AdminAction),
}

impl CallbackAction {
    /// Parses callback data. Returns `None` for unknown payloads.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            "group_create" => Self::GroupCreate,
            "group_browse" => Self::GroupBrowse,
            "connect_now" => Self::ConnectNow,
            "try_again" => Self::TryAgain,
            "change_mode" => Self::ChangeMode,
            "cancel_search" => Self::CancelSearch,
            "continue_chat" => Self::ContinueChat,
            "show_tips" => Self::ShowTips,
            "close_tips" => Self::CloseTips,
            "request_reveal" => Self::RequestReveal,
            "cancel_mood" => Self::CancelMood,
            "try_mood" => Self::TryMood,
            _ => return Self::parse_prefixed(data),
        };
        Some(action)
    }

    fn parse_prefixed(data: &str) -> Option<Self> {
        if let Some(rest) = data.strip_prefix("admin_") {
            return Some(Self::Admin(AdminAction::parse(rest)));
        }
        if let Some(rest) = data.strip_prefix("reveal_yes_") {
            return rest.parse().ok().map(|requester| Self::RevealAnswer {
                requester,
                accept: true,
            });
        }
        if let Some(rest) = data.strip_prefix("reveal_no_") {
            return rest.parse().ok().map(|requester| Self::RevealAnswer {
                requester,
                accept: false,
            });
        }
        if let Some(rest) = data.strip_prefix("mode_") {
            return ChatMode::from_name(rest).map(Self::SelectMode);
        }
        if let Some(rest) = data.strip_prefix("topic_") {
            return Topic::from_name(rest).map(Self::SelectTopic);
        }
        if let Some(rest) = data.strip_prefix("join_group_") {
            return (!rest.is_empty()).then(|| Self::JoinGroup(rest.to_owned()));
        }
        if data.starts_with("leave_group") {
            return Some(Self::LeaveGroup);
        }
        if let Some(rest) = data.strip_prefix("group_mood_") {
            // <reaction>_<group id with underscores>_<sender number>
            let (reaction, rest) = rest.split_once('_')?;
            let (group_id, number) = rest.rsplit_once('_')?;
            return Some(Self::GroupReact {
                reaction: Reaction::from_name(reaction)?,
                group_id: group_id.to_owned(),
                sender_number: number.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("select_mood_") {
            return Mood::from_name(rest).map(Self::SelectMood);
        }
        if let Some(rest) = data.strip_prefix("mood_") {
            return Reaction::from_name(rest).map(Self::React);
        }
        None
    }
}

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    #[must_use]
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }

    /// Appends a row with one button.
    #[must_use]
    pub fn button(self, text: impl Into<String>, data: impl Into<String>) -> Self {
        self.row(vec![Button::new(text, data)])
    }

    /// Whether any button carries the given payload.
    #[must_use]
    pub fn has_data(&self, data: &str) -> bool {
        self.rows.iter().flatten().any(|b| b.data == data)
    }
}

/// An outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,

    /// Whether the text uses Telegram Markdown.
    pub markdown: bool,

    pub keyboard: Option<Keyboard>,
}

impl Reply {
    /// Plain text reply.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
            keyboard: None,
        }
    }

    /// Markdown reply.
    #[must_use]
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: true,
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: Option<&str> = Some("anon_chat_bot");

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(BotCommand::parse("/start", BOT), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/CONNECT", BOT), Some(BotCommand::Connect));
        assert_eq!(
            BotCommand::parse("  /disconnect  ", BOT),
            Some(BotCommand::Disconnect)
        );
        assert_eq!(BotCommand::parse("hello", BOT), None);
    }

    #[test]
    fn test_parse_mentions() {
        assert_eq!(
            BotCommand::parse("/reveal@anon_chat_bot", BOT),
            Some(BotCommand::Reveal)
        );
        assert_eq!(
            BotCommand::parse("/reveal@Anon_Chat_Bot", BOT),
            Some(BotCommand::Reveal)
        );
        assert_eq!(BotCommand::parse("/reveal@other_bot", BOT), None);
        assert_eq!(
            BotCommand::parse("/reveal@other_bot", None),
            Some(BotCommand::Reveal)
        );
    }

    #[test]
    fn test_parse_broadcast() {
        assert_eq!(
            BotCommand::parse("/broadcast Hello   everyone", BOT),
            Some(BotCommand::Broadcast("Hello   everyone".to_owned()))
        );
        assert!(matches!(
            BotCommand::parse("/broadcast", BOT),
            Some(BotCommand::Usage(_))
        ));
        assert_eq!(
            BotCommand::parse("/broadcast_waiting hi", BOT),
            Some(BotCommand::BroadcastTo(Audience::Waiting, "hi".to_owned()))
        );
        assert_eq!(
            BotCommand::parse("/broadcast_nobody hi", BOT),
            Some(BotCommand::Unknown("broadcast_nobody".to_owned()))
        );
    }

    #[test]
    fn test_parse_optional_args() {
        assert_eq!(BotCommand::parse("/topic", BOT), Some(BotCommand::Topic(None)));
        assert_eq!(
            BotCommand::parse("/topic music", BOT),
            Some(BotCommand::Topic(Some("music".to_owned())))
        );
        assert_eq!(
            BotCommand::parse("/group Night Owls", BOT),
            Some(BotCommand::Group(Some("Night Owls".to_owned())))
        );
        assert_eq!(
            BotCommand::parse("/mood Fire", BOT),
            Some(BotCommand::Mood(Some("fire".to_owned())))
        );
    }

    #[test]
    fn test_parse_admin_numbers() {
        assert_eq!(
            BotCommand::parse("/set_timeout 60", BOT),
            Some(BotCommand::SetTimeout(60))
        );
        assert_eq!(
            BotCommand::parse("/set_group_size abc", BOT),
            Some(BotCommand::Usage("⚠️ Group size must be a number.".to_owned()))
        );
        assert_eq!(
            BotCommand::parse("/set_reveal_timeout", BOT),
            Some(BotCommand::Usage(
                "⚠️ Please provide a value for the set_reveal_timeout setting.".to_owned()
            ))
        );
    }

    #[test]
    fn test_parse_ban() {
        assert_eq!(
            BotCommand::parse("/ban 42 spamming links", BOT),
            Some(BotCommand::Ban {
                user_id: 42,
                reason: Some("spamming links".to_owned())
            })
        );
        assert_eq!(
            BotCommand::parse("/ban 42", BOT),
            Some(BotCommand::Ban {
                user_id: 42,
                reason: None
            })
        );
        assert!(matches!(
            BotCommand::parse("/ban someone", BOT),
            Some(BotCommand::Usage(_))
        ));
        assert_eq!(BotCommand::parse("/unban 7", BOT), Some(BotCommand::Unban(7)));
    }

    #[test]
    fn test_admin_only() {
        assert!(BotCommand::Broadcast("x".to_owned()).is_admin_only());
        assert!(BotCommand::Unban(1).is_admin_only());
        assert!(!BotCommand::Connect.is_admin_only());
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            BotCommand::parse("/dance", BOT),
            Some(BotCommand::Unknown("dance".to_owned()))
        );
    }

    #[test]
    fn test_callback_simple() {
        assert_eq!(
            CallbackAction::parse("connect_now"),
            Some(CallbackAction::ConnectNow)
        );
        assert_eq!(
            CallbackAction::parse("mode_one_on_one"),
            Some(CallbackAction::SelectMode(ChatMode::OneOnOne))
        );
        assert_eq!(
            CallbackAction::parse("topic_science"),
            Some(CallbackAction::SelectTopic(Topic::Science))
        );
        assert_eq!(CallbackAction::parse("topic_cooking"), None);
        assert_eq!(CallbackAction::parse("nonsense"), None);
    }

    #[test]
    fn test_callback_reveal() {
        assert_eq!(
            CallbackAction::parse("reveal_yes_123"),
            Some(CallbackAction::RevealAnswer {
                requester: 123,
                accept: true
            })
        );
        assert_eq!(
            CallbackAction::parse("reveal_no_-5"),
            Some(CallbackAction::RevealAnswer {
                requester: -5,
                accept: false
            })
        );
        assert_eq!(CallbackAction::parse("reveal_yes_abc"), None);
    }

    #[test]
    fn test_callback_group_ids_keep_underscores() {
        assert_eq!(
            CallbackAction::parse("join_group_grp_1700000000_4821"),
            Some(CallbackAction::JoinGroup("grp_1700000000_4821".to_owned()))
        );
        assert_eq!(
            CallbackAction::parse("group_mood_clap_grp_1700000000_4821_3"),
            Some(CallbackAction::GroupReact {
                reaction: Reaction::Clap,
                group_id: "grp_1700000000_4821".to_owned(),
                sender_number: 3,
            })
        );
    }

    #[test]
    fn test_callback_moods() {
        assert_eq!(
            CallbackAction::parse("mood_heart"),
            Some(CallbackAction::React(Reaction::Heart))
        );
        assert_eq!(
            CallbackAction::parse("select_mood_party"),
            Some(CallbackAction::SelectMood(Mood::Party))
        );
        assert_eq!(CallbackAction::parse("try_mood"), Some(CallbackAction::TryMood));
    }

    #[test]
    fn test_callback_admin() {
        assert_eq!(
            CallbackAction::parse("admin_maint_on"),
            Some(CallbackAction::Admin(AdminAction::Maintenance(true)))
        );
        assert_eq!(
            CallbackAction::parse("admin_remove_waiting_77"),
            Some(CallbackAction::Admin(AdminAction::RemoveWaiting(77)))
        );
        assert_eq!(
            CallbackAction::parse("admin_set_group_5"),
            Some(CallbackAction::Admin(AdminAction::SetGroupSize(5)))
        );
        assert_eq!(
            CallbackAction::parse("admin_broadcast_groups"),
            Some(CallbackAction::Admin(AdminAction::BroadcastTo(Audience::Groups)))
        );
        assert_eq!(
            CallbackAction::parse("admin_bogus"),
            Some(CallbackAction::Admin(AdminAction::Unknown))
        );
    }

    #[test]
    fn test_mood_display() {
        assert_eq!(Mood::from_name("FIRE"), Some(Mood::Fire));
        assert!(Mood::Party.partner_display().contains("🎉 🎊 🎉 🎊 🎉"));
        assert_eq!(
            Mood::Cool.partner_display(),
            "💭 Your chat partner sent a reaction: 😎"
        );
    }

    #[test]
    fn test_keyboard_builder() {
        let keyboard = Keyboard::new()
            .button("Try", "try_again")
            .row(vec![Button::new("A", "a"), Button::new("B", "b")]);
        assert_eq!(keyboard.rows.len(), 2);
        assert!(keyboard.has_data("b"));
        assert!(!keyboard.has_data("c"));
    }
}
