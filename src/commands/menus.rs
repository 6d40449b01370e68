//! Menus and fixed texts shown by the bot.

use chrono::Utc;

use super::types::{BotCommand, Button, Keyboard, Mood, Reaction, Reply};
use crate::chat::{ChatMode, GroupChat, Statistics, SystemStatus, Topic, UserInfo};
use crate::config::{BOT_VERSION, SystemConfig};

pub(crate) const NOT_ADMIN: &str = "⚠️ You don't have permission to use this command.";

pub(crate) fn banned_notice() -> Reply {
    Reply::markdown(
        "⛔ *You have been banned from using this bot.*\n\n\
         If you think this is a mistake, please contact the administrator.",
    )
}

pub(crate) fn maintenance_notice() -> Reply {
    Reply::markdown(
        "🛠️ *Bot Maintenance Mode*\n\n\
         The bot is currently under maintenance and temporarily unavailable.\n\n\
         Please try again later.",
    )
}

pub(crate) fn topic_emoji(topic: Topic) -> &'static str {
    match topic {
        Topic::Arts => "🎨",
        Topic::Books => "📚",
        Topic::Movies => "🎬",
        Topic::Music => "🎵",
        Topic::Sports => "⚽",
        Topic::Technology => "💻",
        Topic::Gaming => "🎮",
        Topic::Travel => "✈️",
        Topic::Food => "🍕",
        Topic::Science => "🔬",
        Topic::Languages => "🗣️",
        Topic::Pets => "🐾",
        Topic::Other => "🔍",
    }
}

/// Welcome sequence for `/start`.
pub(crate) fn welcome() -> Vec<Reply> {
    vec![
        Reply::markdown("✨ *Welcome to Anonymous Chat!* ✨"),
        Reply::markdown(
            "🔒 *Your Privacy Matters*\n\n\
             All conversations are completely anonymous unless both parties agree to reveal identities.",
        ),
        Reply::markdown(
            "📚 *Available Commands*\n\n\
             • /connect - 🔍 Find someone to chat with\n\
             • /disconnect - 👋 End current conversation\n\
             • /reveal - 🎭 Request to reveal identities\n\
             • /mood - 💫 Send emoji reactions\n\
             • /topic - 📋 Browse chat topics\n\
             • /group - 👥 Manage group chats\n\
             • /mode - 🔀 Switch chat modes",
        ),
        Reply::markdown("🎮 *Ready to begin?* Choose your preferred chat mode:").with_keyboard(
            Keyboard::new()
                .button("✨ One-on-One Chat", "mode_one_on_one")
                .button("🔍 Topic-Based Chat", "mode_topic")
                .button("👥 Group Chat", "mode_group"),
        ),
    ]
}

/// Command overview for `/help`.
pub(crate) fn help(is_admin: bool) -> Reply {
    let mut text = String::from("📖 Available commands:\n");
    for (command, description) in BotCommand::user_commands() {
        text.push_str(&format!("\n{command} - {description}"));
    }
    if is_admin {
        text.push_str("\n\n🛠️ Admin commands:\n");
        for (command, description) in BotCommand::admin_commands() {
            text.push_str(&format!("\n{command} - {description}"));
        }
    }
    Reply::plain(text)
}

/// Buttons offered after a conversation ends.
pub(crate) fn after_chat_keyboard() -> Keyboard {
    Keyboard::new()
        .button("🔄 Find New Partner", "connect_now")
        .button("⚙️ Change Chat Mode", "change_mode")
}

/// Buttons shown to both sides of a new connection.
pub(crate) fn connected_keyboard() -> Keyboard {
    Keyboard::new()
        .button("💡 Chat Tips", "show_tips")
        .button("🎭 Reveal Identity", "request_reveal")
}

pub(crate) fn connected_notice(topic: Option<Topic>) -> Reply {
    let text = match topic {
        None => "✅ *Connected!*\n\n\
                 You can now chat anonymously. Your messages will be delivered instantly, without revealing your identity.\n\n\
                 Use /disconnect when you want to end the conversation."
            .to_owned(),
        Some(topic) => format!(
            "✅ *Connected with {topic} enthusiast!*\n\n\
             You can now chat anonymously about your shared interest in {topic}.\n\n\
             Use /disconnect when you want to end the conversation."
        ),
    };
    Reply::markdown(text).with_keyboard(connected_keyboard())
}

/// Buttons under a relayed one-on-one message.
pub(crate) fn direct_reaction_keyboard() -> Keyboard {
    Keyboard::new().row(
        Reaction::DIRECT
            .iter()
            .map(|r| Button::new(r.emoji(), format!("mood_{}", r.as_str())))
            .collect(),
    )
}

/// Buttons under a relayed group message.
pub(crate) fn group_reaction_keyboard(group_id: &str, sender_number: usize) -> Keyboard {
    Keyboard::new().row(
        Reaction::GROUP
            .iter()
            .map(|r| {
                Button::new(
                    r.emoji(),
                    format!("group_mood_{}_{group_id}_{sender_number}", r.as_str()),
                )
            })
            .collect(),
    )
}

/// Topic keyboard, two topics per row.
pub(crate) fn topic_keyboard() -> Keyboard {
    Topic::ALL.chunks(2).fold(Keyboard::new(), |kb, pair| {
        kb.row(
            pair.iter()
                .map(|&t| {
                    Button::new(
                        format!("{} {}", topic_emoji(t), t.label()),
                        format!("topic_{}", t.as_str()),
                    )
                })
                .collect(),
        )
    })
}

/// `/topic` menu.
pub(crate) fn topic_menu() -> Vec<Reply> {
    vec![
        Reply::markdown(
            "🌟 *Select a Topic*\n\n\
             Choose a conversation topic to find your perfect chat partner:",
        )
        .with_keyboard(topic_keyboard().button("↩️ Back to Chat Modes", "change_mode")),
        Reply::markdown(
            "ℹ️ *What happens next?*\n\n\
             After selecting a topic, use /connect to start searching for a partner interested in the same topic.",
        ),
    ]
}

/// `/group` menu, depending on whether the user already is in a room.
pub(crate) fn group_menu(current: Option<&GroupChat>) -> Vec<Reply> {
    if let Some(group) = current {
        let members = group.members.len();
        let faces = "👤".repeat(members.min(5));
        return vec![
            Reply::markdown(format!(
                "👥 *Group Chat: {}*\n\n\
                 You're currently in this group chat with {members} members.\n{faces}\n\n\
                 Select an option below to manage your group experience:",
                group.name
            ))
            .with_keyboard(
                Keyboard::new().button("❌ Leave Group", format!("leave_group_{}", group.id)),
            ),
        ];
    }
    vec![
        Reply::markdown(
            "👥 *Anonymous Group Chat*\n\n\
             Start or join a group conversation with multiple anonymous users.\n\n\
             • Create a new group with a custom name\n\
             • Browse and join existing public groups\n\
             • Chat anonymously with multiple people at once",
        )
        .with_keyboard(
            Keyboard::new()
                .button("✨ Create New Group", "group_create")
                .button("🔍 Browse Public Groups", "group_browse")
                .button("↩️ Back to Chat Modes", "change_mode"),
        ),
        Reply::markdown(
            "💡 *Group Chat Tip*\n\n\
             In group chats, all members remain anonymous. You'll be identified by a number \
             (e.g., Member #1) to maintain privacy while chatting with multiple people.",
        ),
    ]
}

/// `/mode` menu with the current mode ticked.
pub(crate) fn mode_menu(current: ChatMode) -> Vec<Reply> {
    let tick = |mode: ChatMode| if mode == current { "✅ " } else { "" };
    vec![
        Reply::markdown(
            "🔀 *Chat Modes*\n\n\
             *1️⃣ One-on-One Chat*\n\
             ✨ Random matching with any available user\n\
             💬 Private one-to-one conversations\n\
             🔒 Complete anonymity\n\n\
             *📋 Topic-Based Chat*\n\
             🔍 Find partners with shared interests\n\
             📚 13 topic categories to choose from\n\
             🎯 More meaningful conversations\n\n\
             *👥 Group Chat*\n\
             👥 Multi-user anonymous chats\n\
             ✏️ Create or join existing groups\n\
             🌐 Community-style interaction\n\n\
             Select your preferred mode below:",
        )
        .with_keyboard(
            Keyboard::new()
                .button(
                    format!("{}1️⃣ One-on-One Chat", tick(ChatMode::OneOnOne)),
                    "mode_one_on_one",
                )
                .button(format!("{}📋 Topic-Based Chat", tick(ChatMode::Topic)), "mode_topic")
                .button(format!("{}👥 Group Chat", tick(ChatMode::Group)), "mode_group"),
        ),
        Reply::markdown(
            "💡 *Pro Tip*: After selecting a mode, click 'Connect Now' or use /connect \
             to find a chat partner immediately.",
        )
        .with_keyboard(Keyboard::new().button("🚀 Connect Now", "connect_now")),
    ]
}

/// `/mood` picker, four moods per row.
pub(crate) fn mood_menu() -> Reply {
    let keyboard = Mood::ALL.chunks(4).fold(Keyboard::new(), |kb, chunk| {
        kb.row(
            chunk
                .iter()
                .map(|m| Button::new(m.emoji(), format!("select_mood_{}", m.as_str())))
                .collect(),
        )
    });
    Reply::markdown(
        "💭 *Express Your Emotion*\n\n\
         Choose a reaction to send to your chat partner:",
    )
    .with_keyboard(keyboard.button("❌ Cancel", "cancel_mood"))
}

pub(crate) fn mood_tip() -> Reply {
    Reply::markdown(
        "💡 *Mood Reaction Tip*\n\n\
         You can also express emotions in your conversations!\n\n\
         • Use the /mood command to see reaction options\n\
         • Type /mood [type] to send specific reactions (e.g., /mood happy)\n\
         • Click reaction buttons under messages in chat",
    )
    .with_keyboard(Keyboard::new().button("😊 Try Mood Reactions", "try_mood"))
}

pub(crate) fn chat_tips() -> Reply {
    Reply::markdown(
        "💡 *Chat Tips*\n\n\
         1️⃣ Remember to be respectful\n\
         2️⃣ Your messages are anonymous\n\
         3️⃣ Use /reveal to request identity exchange\n\
         4️⃣ Use /mood to send emoji reactions\n\
         5️⃣ Use /disconnect to end the conversation",
    )
    .with_keyboard(Keyboard::new().button("✅ Got it", "close_tips"))
}

pub(crate) const CHAT_TIPS: [&str; 3] = [
    "💡 *Chat Tip*: You can still use all commands while chatting.",
    "💡 *Chat Tip*: Send photos, stickers or voice messages as usual.",
    "💡 *Chat Tip*: Use /disconnect if you want to end this conversation.",
];

// ----- admin -----

fn on_off(flag: bool) -> &'static str {
    if flag { "✅ ON" } else { "❌ OFF" }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "✅ Yes" } else { "❌ No" }
}

fn back_to_dashboard() -> Keyboard {
    Keyboard::new().button("↩️ Back to Dashboard", "admin_dashboard")
}

pub(crate) fn back_to_users() -> Keyboard {
    Keyboard::new().button("↩️ Back to User Management", "admin_users")
}

pub(crate) fn back_to_config() -> Keyboard {
    Keyboard::new().button("↩️ Back to System Config", "admin_config")
}

/// Reply with a single "back to dashboard" button.
pub(crate) fn admin_notice(text: impl Into<String>) -> Reply {
    Reply::plain(text).with_keyboard(back_to_dashboard())
}

pub(crate) fn dashboard(status: &SystemStatus, stats: &Statistics, config: &SystemConfig) -> Reply {
    let text = format!(
        "🛠️ *ADMIN DASHBOARD*\n\n\
         🤖 *Bot Status*\n\
         Version: {BOT_VERSION}\n\
         Uptime: {}\n\n\
         👥 *Users and Connections*\n\
         Total Users: {}\n\
         Active Connections: {}\n\
         Waiting Users: {}\n\
         Active Groups: {}\n\
         Banned Users: {}\n\n\
         📊 *Statistics*\n\
         Messages: {}\n\
         Connections Made: {}\n\
         Active Today: {}\n\
         Groups Created: {}\n\n\
         ⚙️ *System Configuration*\n\
         Maintenance Mode: {}\n\
         Connection Timeout: {}s\n\
         Max Group Size: {}\n\
         Banned Words: {}",
        status.uptime(Utc::now()),
        status.total_users,
        status.connections,
        status.waiting_users,
        status.active_groups,
        status.banned_users,
        stats.total_messages,
        stats.connections_made,
        stats.active_users_today,
        stats.groups_created,
        on_off(status.maintenance_mode),
        config.connection_timeout,
        config.max_group_size,
        config.banned_words.len(),
    );
    let maintenance = if status.maintenance_mode {
        ("🟢 Disable Maintenance Mode", "admin_maint_off")
    } else {
        ("🔴 Enable Maintenance Mode", "admin_maint_on")
    };
    Reply::markdown(text).with_keyboard(
        Keyboard::new()
            .row(vec![
                Button::new("👤 User Management", "admin_users"),
                Button::new("📊 Statistics", "admin_stats"),
            ])
            .row(vec![
                Button::new("📢 Broadcast", "admin_broadcast"),
                Button::new("⚙️ System Config", "admin_config"),
            ])
            .button(maintenance.0, maintenance.1)
            .button("📜 View Logs", "admin_logs"),
    )
}

pub(crate) fn statistics(stats: &Statistics, status: &SystemStatus) -> Reply {
    Reply::markdown(format!(
        "📊 *STATISTICS*\n\n\
         Total Messages: {}\n\
         Connections Made: {}\n\
         Groups Created: {}\n\
         Unique Users: {}\n\
         Active Today: {}\n\n\
         Active Connections: {}\n\
         Waiting Users: {}\n\
         Active Groups: {}\n\n\
         Counting since: {}",
        stats.total_messages,
        stats.connections_made,
        stats.groups_created,
        stats.unique_users,
        stats.active_users_today,
        status.connections,
        status.waiting_users,
        status.active_groups,
        stats.last_reset.format("%Y-%m-%d %H:%M UTC"),
    ))
    .with_keyboard(back_to_dashboard())
}

pub(crate) fn user_management(total: usize, banned: usize) -> Reply {
    Reply::markdown(format!(
        "👤 *USER MANAGEMENT*\n\n\
         Total users: {total}\n\
         Banned users: {banned}\n\n\
         Use the buttons below to manage users or search for a specific user with:\n\
         `/admin_find_user <user_id or username>`"
    ))
    .with_keyboard(
        Keyboard::new()
            .row(vec![Button::new("🚫 View Banned", "admin_view_banned")])
            .row(vec![
                Button::new("👥 Active Users", "admin_active_users"),
                Button::new("👥 Waiting Users", "admin_waiting_users"),
            ])
            .button("↩️ Back to Dashboard", "admin_dashboard"),
    )
}

/// A titled list of user ids.
pub(crate) fn user_list(title: &str, ids: &[i64]) -> Reply {
    let body = if ids.is_empty() {
        "None".to_owned()
    } else {
        ids.iter()
            .map(|id| format!("• `{id}`"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    Reply::markdown(format!("{title} ({})\n\n{body}", ids.len())).with_keyboard(back_to_users())
}

pub(crate) fn broadcast_options() -> Reply {
    Reply::markdown(
        "📢 *BROADCAST MESSAGE*\n\n\
         Select your target audience:\n\n\
         • All Users: Message all users of the bot\n\
         • Active Users: Only users in active conversations\n\
         • Waiting Users: Only users waiting for connections\n\
         • Group Members: Only users in group chats\n\n\
         To send a broadcast, use one of these commands:\n\
         `/broadcast_all <message>` - Send to all users\n\
         `/broadcast_active <message>` - Send to active users\n\
         `/broadcast_waiting <message>` - Send to waiting users\n\
         `/broadcast_groups <message>` - Send to group chat members",
    )
    .with_keyboard(
        Keyboard::new()
            .row(vec![
                Button::new("👥 All Users", "admin_broadcast_all"),
                Button::new("💬 Active Users", "admin_broadcast_active"),
            ])
            .row(vec![
                Button::new("⏳ Waiting Users", "admin_broadcast_waiting"),
                Button::new("👪 Group Members", "admin_broadcast_groups"),
            ])
            .button("↩️ Back to Dashboard", "admin_dashboard"),
    )
}

pub(crate) fn system_config(config: &SystemConfig) -> Reply {
    Reply::markdown(format!(
        "⚙️ *SYSTEM CONFIGURATION*\n\n\
         • Connection Timeout: {}s\n\
         • Max Group Size: {} users\n\
         • Reveal Timeout: {}s\n\
         • Banned Words: {}\n\
         • Maintenance Mode: {}\n\n\
         To change configuration, use these commands:\n\
         `/set_timeout <seconds>` - Set connection timeout\n\
         `/set_group_size <number>` - Set max group size\n\
         `/set_reveal_timeout <seconds>` - Set identity reveal timeout\n\
         `/add_banned_word <word>` - Add word to banned list\n\
         `/remove_banned_word <word>` - Remove word from banned list",
        config.connection_timeout,
        config.max_group_size,
        config.reveal_timeout,
        config.banned_words.len(),
        on_off(config.maintenance_mode),
    ))
    .with_keyboard(
        Keyboard::new()
            .row(vec![
                Button::new("⏱️ Set Timeout: 30s", "admin_set_timeout_30"),
                Button::new("⏱️ Set Timeout: 60s", "admin_set_timeout_60"),
            ])
            .row(vec![
                Button::new("👥 Group Size: 5", "admin_set_group_5"),
                Button::new("👥 Group Size: 10", "admin_set_group_10"),
            ])
            .button("↩️ Back to Dashboard", "admin_dashboard"),
    )
}

pub(crate) fn user_details(info: &UserInfo) -> Reply {
    let profile = &info.profile;
    let mut text = format!(
        "👤 *USER INFORMATION*\n\n\
         *User ID:* `{}`\n\
         *Name:* {}\n\
         *Username:* @{}\n\
         *Last seen:* {}\n\n\
         *Status:*\n\
         • Banned: {}\n\
         • Connected: {}\n\
         • Waiting: {}\n\
         • In Group: {}\n\n\
         *Preferences:*\n\
         • Chat Mode: {}",
        profile.id,
        profile.full_name(),
        profile.username.as_deref().unwrap_or("None"),
        profile.last_seen.format("%Y-%m-%d %H:%M UTC"),
        yes_no(info.banned),
        yes_no(info.connected),
        yes_no(info.waiting),
        yes_no(info.group.is_some()),
        info.mode.label(),
    );
    if let Some(topic) = info.topic {
        text.push_str(&format!("\n• Topic: {}", topic.label()));
    }
    if let Some(group) = &info.group {
        text.push_str(&format!(
            "\n\n*Group Information:*\n\
             • ID: `{}`\n\
             • Name: {}\n\
             • Members: {}\n\
             • Creator: {}",
            group.id,
            group.name,
            group.members,
            yes_no(group.is_creator),
        ));
    }

    let id = profile.id;
    let mut keyboard = Keyboard::new();
    keyboard = if info.banned {
        keyboard.button("✅ Unban User", format!("admin_unban_{id}"))
    } else {
        keyboard.button("🚫 Ban User", format!("admin_ban_{id}"))
    };
    if info.connected {
        keyboard = keyboard.button("🔌 Disconnect User", format!("admin_disconnect_{id}"));
    }
    if info.waiting {
        keyboard = keyboard.button("⏹️ Remove from Waiting", format!("admin_remove_waiting_{id}"));
    }
    if info.group.is_some() {
        keyboard = keyboard.button("👋 Remove from Group", format!("admin_remove_group_{id}"));
    }
    Reply::markdown(text).with_keyboard(keyboard.button("↩️ Back to User Management", "admin_users"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::UserProfile;

    #[test]
    fn test_topic_keyboard_pairs() {
        let keyboard = topic_keyboard();
        assert_eq!(keyboard.rows.len(), 7);
        assert_eq!(keyboard.rows[0][0].text, "🎨 Arts");
        assert_eq!(keyboard.rows[0][1].data, "topic_books");
        assert_eq!(keyboard.rows[6].len(), 1);
    }

    #[test]
    fn test_mode_menu_ticks_current() {
        let menu = mode_menu(ChatMode::Topic);
        let rows = &menu[0].keyboard.as_ref().unwrap().rows;
        assert_eq!(rows[0][0].text, "1️⃣ One-on-One Chat");
        assert_eq!(rows[1][0].text, "✅ 📋 Topic-Based Chat");
    }

    #[test]
    fn test_group_menu_in_group() {
        let group = GroupChat {
            id: "grp_1_1234".to_owned(),
            name: "Rustaceans".to_owned(),
            creator_id: 1,
            members: vec![1, 2, 3, 4, 5, 6, 7],
            max_size: 10,
        };
        let menu = group_menu(Some(&group));
        assert_eq!(menu.len(), 1);
        assert!(menu[0].text.contains("with 7 members"));
        assert!(menu[0].text.contains(&"👤".repeat(5)));
        assert!(menu[0]
            .keyboard
            .as_ref()
            .unwrap()
            .has_data("leave_group_grp_1_1234"));
    }

    #[test]
    fn test_group_reaction_payloads() {
        let keyboard = group_reaction_keyboard("grp_1_1234", 3);
        assert!(keyboard.has_data("group_mood_clap_grp_1_1234_3"));
        assert_eq!(keyboard.rows[0].len(), Reaction::GROUP.len());
    }

    #[test]
    fn test_user_details_buttons() {
        let info = UserInfo {
            profile: UserProfile::new(42, "Ann").with_username("ann"),
            banned: false,
            connected: true,
            waiting: false,
            mode: ChatMode::Topic,
            topic: Some(Topic::Music),
            group: None,
        };
        let reply = user_details(&info);
        assert!(reply.text.contains("*Username:* @ann"));
        assert!(reply.text.contains("• Topic: Music"));
        let keyboard = reply.keyboard.unwrap();
        assert!(keyboard.has_data("admin_ban_42"));
        assert!(keyboard.has_data("admin_disconnect_42"));
        assert!(!keyboard.has_data("admin_remove_waiting_42"));
    }

    #[test]
    fn test_help_lists_admin_commands_only_for_admins() {
        assert!(help(false).text.contains("/reveal"));
        assert!(!help(false).text.contains("/admin"));
        assert!(help(true).text.contains("/set_timeout"));
    }
}
