//! Command handler implementation.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::menus;
use super::types::{BotCommand, CallbackAction, Keyboard, Mood, Reply};
use crate::chat::{
    Access, ChatState, ConnectOutcome, DisconnectOutcome, LeaveOutcome, RelayTarget,
    RevealAnswer, RevealOutcome, RoomError, Topic, UserId,
};
use crate::config::BotSettings;
use crate::telegram::{Incoming, MessageRef, Messenger, truncate_for_log};

/// Who triggered an update and where to answer.
#[derive(Debug, Clone, Copy)]
pub(super) struct Origin {
    pub chat_id: i64,
    pub user_id: UserId,
    pub is_admin: bool,

    /// Message carrying the pressed button, for callbacks.
    pub message: Option<MessageRef>,
}

/// Handles bot commands, button presses and relayed text.
pub struct CommandHandler<M> {
    pub(super) state: Arc<RwLock<ChatState>>,
    pub(super) settings: Arc<BotSettings>,
    pub(super) messenger: Arc<M>,

    /// Own username, to accept `/cmd@username`.
    bot_username: Option<String>,

    /// Users that already got the mood reaction tip.
    mood_tip_shown: Mutex<HashSet<UserId>>,
}

impl<M: Messenger> CommandHandler<M> {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        state: Arc<RwLock<ChatState>>,
        settings: Arc<BotSettings>,
        messenger: Arc<M>,
        bot_username: Option<String>,
    ) -> Self {
        Self {
            state,
            settings,
            messenger,
            bot_username,
            mood_tip_shown: Mutex::new(HashSet::new()),
        }
    }

    /// Processes one update from Telegram.
    pub async fn handle(&self, incoming: Incoming) {
        let user_id = incoming.from().id;
        let is_admin = self.settings.is_admin(user_id);
        let access = {
            let mut state = self.state.write().await;
            state.register_user(incoming.from().clone());
            state.access(user_id, is_admin)
        };
        let origin = Origin {
            chat_id: incoming.chat_id(),
            user_id,
            is_admin,
            message: None,
        };

        match incoming {
            Incoming::Message { text, .. } => {
                if !self.admit(access, &origin, false).await {
                    return;
                }
                match BotCommand::parse(&text, self.bot_username.as_deref()) {
                    Some(command) => self.execute(&origin, command).await,
                    None => self.handle_text(&origin, &text).await,
                }
            }
            Incoming::Callback {
                message_id, data, ..
            } => {
                let origin = Origin {
                    message: Some(MessageRef {
                        chat_id: origin.chat_id,
                        message_id,
                    }),
                    ..origin
                };
                // Admin buttons do their own permission check.
                if !self.admit(access, &origin, data.starts_with("admin_")).await {
                    return;
                }
                match CallbackAction::parse(&data) {
                    Some(action) => self.on_callback(&origin, action).await,
                    None => debug!("Ignoring unknown callback data: {}", data),
                }
            }
        }
    }

    /// Applies the ban and maintenance gate.
    async fn admit(&self, access: Access, origin: &Origin, admin_callback: bool) -> bool {
        match access {
            Access::Allowed => true,
            _ if admin_callback => true,
            Access::Banned => {
                debug!("Rejected banned user {}", origin.user_id);
                self.reply(origin, menus::banned_notice()).await;
                false
            }
            Access::Maintenance => {
                self.reply(origin, menus::maintenance_notice()).await;
                false
            }
        }
    }

    /// Executes a parsed command.
    async fn execute(&self, origin: &Origin, command: BotCommand) {
        debug!("Handling command from {}: {}", origin.user_id, command);
        if command.is_admin_only() {
            return self.execute_admin(origin, command).await;
        }

        match command {
            BotCommand::Start => self.reply_all(origin, menus::welcome()).await,
            BotCommand::Help => self.reply(origin, menus::help(origin.is_admin)).await,
            BotCommand::Connect => self.connect(origin).await,
            BotCommand::Disconnect => self.disconnect(origin).await,
            BotCommand::Reveal => self.reveal(origin).await,
            BotCommand::Invite => self.invite(origin).await,
            BotCommand::Topic(None) => self.reply_all(origin, menus::topic_menu()).await,
            BotCommand::Topic(Some(name)) => match Topic::from_name(&name) {
                Some(topic) => self.select_topic(origin, topic).await,
                None => {
                    let text = format!(
                        "❓ Unknown topic '{name}'. Use /topic to see the available topics."
                    );
                    self.reply(origin, Reply::plain(text)).await;
                }
            },
            BotCommand::Group(None) => {
                let group = self.state.read().await.current_group(origin.user_id).cloned();
                self.reply_all(origin, menus::group_menu(group.as_ref())).await;
            }
            BotCommand::Group(Some(name)) => self.create_group(origin, &name).await,
            BotCommand::Mode => {
                let mode = self.state.read().await.preferences(origin.user_id).mode;
                self.reply_all(origin, menus::mode_menu(mode)).await;
            }
            BotCommand::Leave => self.leave(origin).await,
            BotCommand::Mood(None) => self.show_mood_menu(origin).await,
            BotCommand::Mood(Some(name)) => match Mood::from_name(&name) {
                Some(mood) => self.deliver_mood(origin, mood).await,
                None => {
                    let names: Vec<&str> = Mood::ALL.iter().map(|m| m.as_str()).collect();
                    let text = format!(
                        "❓ Unknown mood '{name}'. Available moods: {}",
                        names.join(", ")
                    );
                    self.reply(origin, Reply::plain(text)).await;
                }
            },
            BotCommand::Usage(text) => self.reply(origin, Reply::plain(text)).await,
            BotCommand::Unknown(name) => {
                let text = format!("❓ Unknown command /{name}. Use /help to see available commands.");
                self.reply(origin, Reply::plain(text)).await;
            }
            other => warn!("Unhandled command: {}", other),
        }
    }

    // ----- sending -----

    /// Sends a message, logging failures.
    pub(super) async fn send(&self, chat_id: i64, reply: Reply) -> Option<MessageRef> {
        match self.messenger.send(chat_id, &reply).await {
            Ok(sent) => Some(sent),
            Err(e) => {
                warn!("Failed to send message to {}: {}", chat_id, e);
                None
            }
        }
    }

    /// Sends a message to the chat the update came from.
    pub(super) async fn reply(&self, origin: &Origin, reply: Reply) {
        self.send(origin.chat_id, reply).await;
    }

    pub(super) async fn reply_all(&self, origin: &Origin, replies: Vec<Reply>) {
        for reply in replies {
            self.reply(origin, reply).await;
        }
    }

    /// Replaces the pressed message, or replies when handling a command.
    pub(super) async fn answer(&self, origin: &Origin, reply: Reply) {
        match origin.message {
            Some(message) => {
                if let Err(e) = self.messenger.edit(message, &reply).await {
                    warn!("Failed to edit message in {}: {}", message.chat_id, e);
                }
            }
            None => self.reply(origin, reply).await,
        }
    }

    /// Saves bans, configuration and counters.
    pub(super) fn save(&self, state: &ChatState) {
        if let Err(e) = state.to_persistent().save(&self.settings.state_path) {
            warn!("Failed to save state: {}", e);
        }
    }

    // ----- pairing -----

    pub(super) async fn connect(&self, origin: &Origin) {
        let outcome = self.state.write().await.request_connection(origin.user_id);
        debug!("Connect for {}: {:?}", origin.user_id, outcome);

        match outcome {
            ConnectOutcome::AlreadyConnected => {
                self.reply(
                    origin,
                    Reply::plain("⚠️ You are already in a conversation! Use /disconnect first."),
                )
                .await;
            }
            ConnectOutcome::InGroup { name } => {
                let text = format!("ℹ️ You're already in group chat '{name}'. Use /leave to exit.");
                self.reply(origin, Reply::plain(text)).await;
            }
            ConnectOutcome::AlreadyWaiting => {
                self.reply(
                    origin,
                    Reply::plain("⏳ You are already looking for a partner. Please wait..."),
                )
                .await;
            }
            ConnectOutcome::NeedsTopic => self.reply_all(origin, menus::topic_menu()).await,
            ConnectOutcome::NeedsGroup => self.reply_all(origin, menus::group_menu(None)).await,
            ConnectOutcome::Matched { partner, topic } => {
                info!("Connected {} with {}", origin.user_id, partner);
                self.send(partner, menus::connected_notice(topic)).await;
                self.reply(origin, menus::connected_notice(topic)).await;
            }
            ConnectOutcome::Queued { .. } => {
                self.reply(
                    origin,
                    Reply::markdown(
                        "⏳ *Waiting for matching user*...\n\n\
                         You'll be notified as soon as someone connects.",
                    ),
                )
                .await;
                self.reply(
                    origin,
                    Reply::markdown(
                        "💫 *You've been added to the waiting queue*\n\n\
                         Relax and wait for a match. You can cancel anytime using the button below \
                         or by typing /disconnect.",
                    )
                    .with_keyboard(Keyboard::new().button("❌ Cancel Search", "cancel_search")),
                )
                .await;
            }
        }
    }

    pub(super) async fn disconnect(&self, origin: &Origin) {
        let outcome = self.state.write().await.disconnect(origin.user_id);

        match outcome {
            DisconnectOutcome::Ended { partner } => {
                info!("User {} left the conversation with {}", origin.user_id, partner);
                self.reply(
                    origin,
                    Reply::markdown(
                        "✅ *Connection terminated successfully*\n\n\
                         You have been disconnected from your chat partner.",
                    ),
                )
                .await;
                self.reply(
                    origin,
                    Reply::markdown(
                        "👋 *Chat ended*\n\nWould you like to find someone new to talk to?",
                    )
                    .with_keyboard(menus::after_chat_keyboard()),
                )
                .await;
                self.notify_partner_left(partner).await;
            }
            DisconnectOutcome::CancelledSearch { topic: None } => {
                self.reply(
                    origin,
                    Reply::markdown(
                        "✅ *Search cancelled*\n\nYou've been removed from the waiting queue.",
                    ),
                )
                .await;
                self.reply(
                    origin,
                    Reply::markdown("💭 *What would you like to do next?*").with_keyboard(
                        Keyboard::new()
                            .button("🔄 Try Again", "try_again")
                            .button("🔀 Change Chat Mode", "change_mode"),
                    ),
                )
                .await;
            }
            DisconnectOutcome::CancelledSearch { topic: Some(topic) } => {
                let text = format!(
                    "✅ *Topic search cancelled*\n\n\
                     You've been removed from the waiting queue for topic '{topic}'."
                );
                self.reply(origin, Reply::markdown(text)).await;
                self.reply(
                    origin,
                    Reply::markdown("🔍 *Topic Search Cancelled*\n\nWhat would you like to do next?")
                        .with_keyboard(
                            Keyboard::new()
                                .button("🔄 Try Same Topic", "connect_now")
                                .button("📋 Choose Different Topic", "mode_topic")
                                .button("🔀 Change Chat Mode", "change_mode"),
                        ),
                )
                .await;
            }
            DisconnectOutcome::Idle => {
                self.reply(
                    origin,
                    Reply::markdown(
                        "ℹ️ *No active connections*\n\n\
                         You're not currently in any conversation or waiting list.",
                    ),
                )
                .await;
                self.reply(
                    origin,
                    Reply::markdown(
                        "💬 *Ready to start?*\n\n\
                         You can find someone to chat with or adjust your settings first.",
                    )
                    .with_keyboard(
                        Keyboard::new()
                            .button("🔍 Find Someone to Chat With", "connect_now")
                            .button("⚙️ Chat Settings", "change_mode"),
                    ),
                )
                .await;
            }
        }
    }

    /// Tells a user that the other side ended the conversation.
    pub(super) async fn notify_partner_left(&self, partner: UserId) {
        self.send(
            partner,
            Reply::markdown("👋 *Your partner has disconnected*\n\nThis conversation has ended."),
        )
        .await;
        self.send(
            partner,
            Reply::markdown("💬 *Ready for a new conversation?*")
                .with_keyboard(menus::after_chat_keyboard()),
        )
        .await;
    }

    /// Relays plain text, or takes it as a group name after "Create group".
    async fn handle_text(&self, origin: &Origin, text: &str) {
        let mut state = self.state.write().await;
        if !origin.is_admin && state.config.contains_banned_word(text) {
            drop(state);
            info!("Blocked message from {} containing a banned word", origin.user_id);
            return self
                .reply(
                    origin,
                    Reply::markdown(
                        "⚠️ *Message Not Sent*\n\n\
                         Your message contains prohibited content and was not delivered.\n\n\
                         Please review our content policy and try again with appropriate language.",
                    ),
                )
                .await;
        }
        if state.take_group_name_request(origin.user_id) {
            drop(state);
            return self.create_group(origin, text).await;
        }
        let target = state.relay_target(origin.user_id);
        if target != RelayTarget::Nobody {
            state.record_message();
        }
        drop(state);

        debug!(
            "Relaying from {}: \"{}\"",
            origin.user_id,
            truncate_for_log(text, 30)
        );
        match target {
            RelayTarget::Partner(partner) => {
                let relayed = Reply::plain(format!("👤 Anonymous: {text}"))
                    .with_keyboard(menus::direct_reaction_keyboard());
                match self.messenger.send(partner, &relayed).await {
                    Ok(_) => self.reply(origin, Reply::markdown("✓ *Message delivered*")).await,
                    Err(e) => {
                        warn!("Failed to relay message to {}: {}", partner, e);
                        self.reply(
                            origin,
                            Reply::plain("❌ Your message could not be delivered. Please try again."),
                        )
                        .await;
                    }
                }
            }
            RelayTarget::Group {
                group_id,
                recipients,
                sender_number,
            } => {
                let relayed = Reply::plain(format!("👥 Group Member #{sender_number}: {text}"))
                    .with_keyboard(menus::group_reaction_keyboard(&group_id, sender_number));
                for member in recipients {
                    if let Err(e) = self.messenger.send(member, &relayed).await {
                        warn!("Failed to relay group message to {}: {}", member, e);
                    }
                }
                self.reply(
                    origin,
                    Reply::markdown(
                        "✅ *Message delivered*\n\nYour message has been sent to the group successfully.",
                    ),
                )
                .await;
            }
            RelayTarget::Nobody => {
                self.reply(
                    origin,
                    Reply::plain(
                        "ℹ️ You're not in an active conversation. Use /connect to find a partner \
                         or /group to join a group chat.",
                    ),
                )
                .await;
            }
        }
    }

    /// Creates an invite link for the chat the command was sent in.
    async fn invite(&self, origin: &Origin) {
        let text = match self.messenger.create_invite_link(origin.chat_id).await {
            Ok(link) => format!("🔗 Here's your invite link: {link}"),
            Err(e) => {
                warn!("Error creating invite link for {}: {}", origin.chat_id, e);
                "❌ Error creating invite link. Make sure I'm an admin with the right permissions."
                    .to_owned()
            }
        };
        self.reply(origin, Reply::plain(text)).await;
    }

    // ----- reveal -----

    pub(super) async fn reveal(&self, origin: &Origin) {
        let outcome = self.state.write().await.request_reveal(origin.user_id);

        match outcome {
            RevealOutcome::NotConnected => {
                self.reply(
                    origin,
                    Reply::markdown(
                        "❌ *No active connection found*\n\n\
                         You need to be in an active conversation to reveal identities.",
                    ),
                )
                .await;
                self.reply(
                    origin,
                    Reply::plain("ℹ️ Use the button below to find a chat partner first:")
                        .with_keyboard(Keyboard::new().button("🔄 Find a Partner", "connect_now")),
                )
                .await;
            }
            RevealOutcome::AlreadyPending => {
                self.reply(
                    origin,
                    Reply::markdown(
                        "⏳ *Request already pending*\n\n\
                         You've already sent a reveal request to your partner. Please wait for their response.",
                    ),
                )
                .await;
            }
            RevealOutcome::Sent { partner } => {
                info!("User {} asked {} for an identity reveal", origin.user_id, partner);
                self.reply(
                    origin,
                    Reply::markdown(
                        "🎭 *Identity Reveal Request Sent!*\n\n\
                         Waiting for your partner's response...\n\n\
                         They will decide whether to share their real identity with you.",
                    ),
                )
                .await;

                let requester = origin.user_id;
                self.send(
                    partner,
                    Reply::markdown(
                        "🎭 *Identity Reveal Request*\n\n\
                         Your chat partner would like to reveal identities.\n\n\
                         If you accept, both of you will be able to see each other's name and username (if available).\n\n\
                         Do you want to reveal your identity?",
                    )
                    .with_keyboard(
                        Keyboard::new()
                            .button("✅ Yes, Reveal My Identity", format!("reveal_yes_{requester}"))
                            .button("❌ No, Stay Anonymous", format!("reveal_no_{requester}")),
                    ),
                )
                .await;
                self.send(
                    partner,
                    Reply::markdown(
                        "ℹ️ *Privacy Note*: Only your name and username will be shared. \
                         No other personal information is collected or revealed by this bot.",
                    ),
                )
                .await;
            }
        }
    }

    pub(super) async fn answer_reveal(&self, origin: &Origin, requester: UserId, accept: bool) {
        let answer = self
            .state
            .write()
            .await
            .answer_reveal(origin.user_id, requester, accept);

        match answer {
            RevealAnswer::Revealed {
                requester,
                responder,
            } => {
                info!("Identities revealed between {} and {}", requester.id, responder.id);
                let keyboard = Keyboard::new().button("💬 Continue Chat", "continue_chat");
                self.answer(
                    origin,
                    Reply::markdown(requester.identity_card()).with_keyboard(keyboard.clone()),
                )
                .await;
                self.send(
                    requester.id,
                    Reply::markdown(responder.identity_card()).with_keyboard(keyboard),
                )
                .await;

                let done = Reply::markdown(
                    "✅ *Identity exchange complete!*\n\n\
                     You can now chat knowing who you're talking to.",
                );
                self.send(requester.id, done.clone()).await;
                self.reply(origin, done).await;
            }
            RevealAnswer::Declined => {
                self.send(
                    requester,
                    Reply::markdown(
                        "❌ *Request Declined*\n\nYour chat partner has chosen to remain anonymous.",
                    ),
                )
                .await;
                self.send(
                    requester,
                    Reply::markdown(
                        "💬 *Privacy Respected*\n\n\
                         Your chat can continue anonymously. Everyone has different privacy preferences.",
                    )
                    .with_keyboard(
                        Keyboard::new().button("🔄 Continue Anonymously", "continue_chat"),
                    ),
                )
                .await;
                self.answer(
                    origin,
                    Reply::markdown(
                        "🔒 *Privacy Maintained*\n\n\
                         You declined to reveal identities. Your anonymity has been preserved.",
                    ),
                )
                .await;
            }
            RevealAnswer::Invalid => {
                self.answer(
                    origin,
                    Reply::plain(
                        "❓ The identity reveal request is no longer valid. \
                         It may have been canceled or expired.",
                    ),
                )
                .await;
            }
            RevealAnswer::MissingProfile => {
                let error = Reply::markdown(
                    "❌ *Error retrieving user information*\n\n\
                     We couldn't access the profile information needed for identity reveal.",
                );
                self.send(requester, error.clone()).await;
                self.answer(origin, error).await;
            }
        }
    }

    // ----- groups -----

    pub(super) async fn create_group(&self, origin: &Origin, name: &str) {
        let result = self.state.write().await.create_group(origin.user_id, name);
        match result {
            Ok(group) => {
                info!("User {} created group {}", origin.user_id, group.id);
                let text = format!(
                    "✅ Group '{}' created!\n\n\
                     Members: 1/{}\n\n\
                     Others can join from Browse Public Groups. Start typing to send messages to the group!",
                    group.name, group.max_size
                );
                self.reply(origin, Reply::plain(text)).await;
            }
            Err(e) => {
                if e == RoomError::InvalidName {
                    self.state.write().await.await_group_name(origin.user_id);
                }
                self.reply(origin, Reply::plain(room_error_text(&e))).await;
            }
        }
    }

    pub(super) async fn join_group(&self, origin: &Origin, group_id: &str) {
        let result = self.state.write().await.join_group(origin.user_id, group_id);
        let group = match result {
            Ok(group) => group,
            Err(e) => return self.answer(origin, Reply::plain(room_error_text(&e))).await,
        };

        let members = group.members.len();
        info!("User {} joined group {}", origin.user_id, group.id);
        let text = format!(
            "✅ You've joined the group: '{}'\n\n\
             Members: {members}/{}\n\n\
             Start typing to send messages to the group!",
            group.name, group.max_size
        );
        self.answer(origin, Reply::plain(text)).await;

        let notice = Reply::plain(format!(
            "👋 A new member has joined the group '{}'!\nMembers: {members}/{}",
            group.name, group.max_size
        ));
        for member in group.others(origin.user_id) {
            self.send(member, notice.clone()).await;
        }
    }

    pub(super) async fn leave(&self, origin: &Origin) {
        let outcome = self.state.write().await.leave_group(origin.user_id);
        let text = match &outcome {
            LeaveOutcome::Deleted { name } => format!(
                "👋 You have left the group '{name}'. As you were the last member, the group has been deleted."
            ),
            LeaveOutcome::Transferred { group, .. } => format!(
                "👋 You have left the group '{}'. As you were the creator, admin privileges have been transferred to another member.",
                group.name
            ),
            LeaveOutcome::Left { group } => format!("👋 You have left the group '{}'.", group.name),
            LeaveOutcome::NotInGroup => "ℹ️ You're not currently in any group chat.".to_owned(),
        };
        self.reply(origin, Reply::plain(text)).await;
        self.announce_departure(&outcome).await;
    }

    /// Notifies the remaining members after someone left a group.
    pub(super) async fn announce_departure(&self, outcome: &LeaveOutcome) {
        let (group, new_creator) = match outcome {
            LeaveOutcome::Transferred { group, new_creator } => (group, Some(*new_creator)),
            LeaveOutcome::Left { group } => (group, None),
            LeaveOutcome::Deleted { .. } | LeaveOutcome::NotInGroup => return,
        };
        if let Some(admin) = new_creator {
            let text = format!("👑 You are now the admin of the group '{}'!", group.name);
            self.send(admin, Reply::plain(text)).await;
        }
        let notice = Reply::plain(format!("ℹ️ A member has left the group '{}'.", group.name));
        for &member in group.members.iter().filter(|&&m| Some(m) != new_creator) {
            self.send(member, notice.clone()).await;
        }
    }

    // ----- moods -----

    async fn show_mood_menu(&self, origin: &Origin) {
        let connected = self.state.read().await.partner_of(origin.user_id).is_some();
        if connected {
            self.reply(origin, menus::mood_menu()).await;
        } else {
            self.reply(
                origin,
                Reply::plain("❌ You need to be in an active conversation to send mood reactions."),
            )
            .await;
        }
    }

    /// Sends a mood to the partner and acknowledges it.
    pub(super) async fn deliver_mood(&self, origin: &Origin, mood: Mood) {
        let partner = self.state.read().await.partner_of(origin.user_id);
        let Some(partner) = partner else {
            return self
                .answer(
                    origin,
                    Reply::plain(
                        "❌ You're not in an active conversation. Find a chat partner first to send reactions.",
                    ),
                )
                .await;
        };

        let emoji = mood.emoji();
        if origin.message.is_some() {
            self.answer(
                origin,
                Reply::markdown(format!("✅ *Mood selected*: {emoji}\n\nSending your reaction...")),
            )
            .await;
        }
        self.send(partner, Reply::markdown(mood.partner_display())).await;
        self.reply(
            origin,
            Reply::markdown(format!("✅ *Reaction delivered*\n\nYou sent: {emoji}")),
        )
        .await;

        let first_time = self.mood_tip_shown.lock().await.insert(partner);
        if first_time {
            self.send(partner, menus::mood_tip()).await;
        }
    }
}

fn room_error_text(error: &RoomError) -> String {
    match error {
        RoomError::Connected => {
            "⚠️ You are already in a conversation! Use /disconnect first.".to_owned()
        }
        RoomError::AlreadyInGroup(name) => {
            format!("ℹ️ You're already in group chat '{name}'. Use /leave to exit.")
        }
        RoomError::Missing | RoomError::Full => "❌ This group no longer exists or is full.".to_owned(),
        RoomError::InvalidName => {
            "⚠️ Please send a name for your group (e.g., 'Tech Chat', 'Music Lovers'):".to_owned()
        }
    }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::chat::UserProfile;
    use crate::telegram::RecordingMessenger;

    pub(crate) struct Harness {
        pub handler: CommandHandler<RecordingMessenger>,
        pub messenger: Arc<RecordingMessenger>,
        pub dir: tempfile::TempDir,
    }

    impl Harness {
        pub(crate) fn new(admins: &[UserId]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let settings = BotSettings {
                admin_ids: admins.iter().copied().collect(),
                state_path: dir.path().join("state.json"),
                ..BotSettings::default()
            };
            let messenger = Arc::new(RecordingMessenger::new());
            let handler = CommandHandler::new(
                Arc::new(RwLock::new(ChatState::default())),
                Arc::new(settings),
                Arc::clone(&messenger),
                Some("anon_chat_bot".to_owned()),
            );
            Self {
                handler,
                messenger,
                dir,
            }
        }

        pub(crate) async fn say(&self, user: UserId, text: &str) {
            self.handler
                .handle(Incoming::Message {
                    chat_id: user,
                    from: UserProfile::new(user, format!("User{user}")),
                    text: text.to_owned(),
                })
                .await;
        }

        pub(crate) async fn press(&self, user: UserId, data: &str) {
            self.handler
                .handle(Incoming::Callback {
                    chat_id: user,
                    message_id: 1,
                    from: UserProfile::new(user, format!("User{user}")),
                    data: data.to_owned(),
                })
                .await;
        }

        /// Connects two users and clears the recorded messages.
        pub(crate) async fn pair(&self, a: UserId, b: UserId) {
            self.say(a, "/connect").await;
            self.say(b, "/connect").await;
            assert_eq!(self.handler.state.read().await.partner_of(a), Some(b));
            self.messenger.clear();
        }

        pub(crate) fn last_text(&self, user: UserId) -> String {
            self.messenger.texts_to(user).pop().unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn test_start_offers_modes() {
        let h = Harness::new(&[]);
        h.say(1, "/start").await;

        let sent = h.messenger.sent_to(1);
        assert_eq!(sent.len(), 4);
        assert!(sent[0].text.contains("Welcome to Anonymous Chat"));
        let keyboard = sent[3].keyboard.as_ref().unwrap();
        assert!(keyboard.has_data("mode_one_on_one"));
        assert!(keyboard.has_data("mode_group"));
    }

    #[tokio::test]
    async fn test_connect_queues_then_matches() {
        let h = Harness::new(&[]);
        h.say(1, "/connect").await;
        assert!(h.messenger.texts_to(1)[0].contains("Waiting for matching user"));
        assert!(h.messenger.sent_to(1)[1]
            .keyboard
            .as_ref()
            .unwrap()
            .has_data("cancel_search"));

        h.say(1, "/connect").await;
        assert!(h.last_text(1).contains("already looking"));

        h.say(2, "/connect").await;
        assert!(h.last_text(1).starts_with("✅ *Connected!*"));
        assert!(h.last_text(2).starts_with("✅ *Connected!*"));

        h.say(2, "/connect").await;
        assert!(h.last_text(2).contains("already in a conversation"));
    }

    #[tokio::test]
    async fn test_relay_between_partners() {
        let h = Harness::new(&[]);
        h.pair(1, 2).await;

        h.say(1, "hello there").await;
        let relayed = h.messenger.sent_to(2);
        assert_eq!(relayed[0].text, "👤 Anonymous: hello there");
        assert!(relayed[0].keyboard.as_ref().unwrap().has_data("mood_heart"));
        assert_eq!(h.last_text(1), "✓ *Message delivered*");
        assert_eq!(h.handler.state.read().await.stats.total_messages, 1);
    }

    #[tokio::test]
    async fn test_text_without_partner() {
        let h = Harness::new(&[]);
        h.say(1, "anyone?").await;
        assert!(h.last_text(1).contains("not in an active conversation"));
        assert_eq!(h.handler.state.read().await.stats.total_messages, 0);
    }

    #[tokio::test]
    async fn test_banned_words_block_users_not_admins() {
        let h = Harness::new(&[9]);
        h.handler
            .state
            .write()
            .await
            .config
            .add_banned_word("spam")
            .unwrap();
        h.pair(1, 9).await;

        h.say(1, "buy SPAM now").await;
        assert!(h.messenger.texts_to(9).is_empty());
        assert!(h.last_text(1).contains("Message Not Sent"));

        h.say(9, "spam is fine for me").await;
        assert_eq!(h.messenger.texts_to(1).last().unwrap(), "👤 Anonymous: spam is fine for me");
    }

    #[tokio::test]
    async fn test_disconnect_notifies_partner() {
        let h = Harness::new(&[]);
        h.pair(1, 2).await;

        h.say(1, "/disconnect").await;
        assert!(h.messenger.texts_to(1)[0].contains("Connection terminated"));
        let partner_texts = h.messenger.texts_to(2);
        assert!(partner_texts[0].contains("Your partner has disconnected"));
        assert!(h.messenger.sent_to(2)[1]
            .keyboard
            .as_ref()
            .unwrap()
            .has_data("connect_now"));

        h.say(1, "/disconnect").await;
        assert!(h.messenger.texts_to(1).iter().any(|t| t.contains("No active connections")));
    }

    #[tokio::test]
    async fn test_cancel_search_button() {
        let h = Harness::new(&[]);
        h.say(1, "/connect").await;
        h.press(1, "cancel_search").await;
        assert!(h.messenger.texts_to(1).iter().any(|t| t.contains("Search cancelled")));
        assert!(!h.handler.state.read().await.is_waiting(1));
    }

    #[tokio::test]
    async fn test_banned_user_is_gated() {
        let h = Harness::new(&[]);
        h.say(1, "/start").await;
        h.handler.state.write().await.ban(1);
        h.messenger.clear();

        h.say(1, "/connect").await;
        assert_eq!(h.messenger.total_sent(), 1);
        assert!(h.last_text(1).contains("You have been banned"));
        assert!(!h.handler.state.read().await.is_waiting(1));
    }

    #[tokio::test]
    async fn test_maintenance_gate_spares_admins() {
        let h = Harness::new(&[9]);
        h.handler.state.write().await.config.maintenance_mode = true;

        h.say(1, "/connect").await;
        assert!(h.last_text(1).contains("Bot Maintenance Mode"));

        h.say(9, "/connect").await;
        assert!(h.last_text(9).contains("Waiting for matching user")
            || h.messenger.texts_to(9).iter().any(|t| t.contains("waiting queue")));
    }

    #[tokio::test]
    async fn test_reveal_accepted() {
        let h = Harness::new(&[]);
        h.pair(1, 2).await;

        h.say(1, "/reveal").await;
        assert!(h.last_text(1).contains("Identity Reveal Request Sent"));
        let request = &h.messenger.sent_to(2)[0];
        assert!(request.keyboard.as_ref().unwrap().has_data("reveal_yes_1"));

        h.say(1, "/reveal").await;
        assert!(h.last_text(1).contains("Request already pending"));

        h.press(2, "reveal_yes_1").await;
        assert!(h.messenger.edited_texts()[0].contains("User1"));
        let requester_texts = h.messenger.texts_to(1);
        assert!(requester_texts.iter().any(|t| t.contains("*Name:* User2")));
        assert!(requester_texts.last().unwrap().contains("Identity exchange complete"));

        h.press(2, "reveal_yes_1").await;
        assert!(h.messenger.edited_texts().last().unwrap().contains("no longer valid"));
    }

    #[tokio::test]
    async fn test_reveal_declined() {
        let h = Harness::new(&[]);
        h.pair(1, 2).await;
        h.say(1, "/reveal").await;

        h.press(2, "reveal_no_1").await;
        assert!(h.messenger.texts_to(1).iter().any(|t| t.contains("Request Declined")));
        assert!(h.messenger.edited_texts()[0].contains("Privacy Maintained"));
        assert!(!h.handler.state.read().await.has_pending_reveal(1));
    }

    #[tokio::test]
    async fn test_reveal_without_partner() {
        let h = Harness::new(&[]);
        h.say(1, "/reveal").await;
        assert!(h.messenger.texts_to(1)[0].contains("No active connection found"));
    }

    #[tokio::test]
    async fn test_group_create_join_and_relay() {
        let h = Harness::new(&[]);
        h.press(1, "group_create").await;
        assert!(h.messenger.edited_texts()[0].contains("Creating a New Group"));
        h.say(1, "Rust Fans").await;
        assert!(h.last_text(1).contains("Group 'Rust Fans' created"));

        h.press(2, "group_browse").await;
        let group_id = h.handler.state.read().await.current_group(1).unwrap().id.clone();
        h.press(2, &format!("join_group_{group_id}")).await;
        assert!(h.messenger.edited_texts().last().unwrap().contains("joined the group: 'Rust Fans'"));
        assert!(h.last_text(1).contains("A new member has joined"));

        h.messenger.clear();
        h.say(2, "hi all").await;
        let relayed = h.messenger.sent_to(1);
        assert_eq!(relayed[0].text, "👥 Group Member #2: hi all");
        assert!(relayed[0]
            .keyboard
            .as_ref()
            .unwrap()
            .has_data(&format!("group_mood_like_{group_id}_2")));
    }

    #[tokio::test]
    async fn test_pending_group_name_does_not_swallow_chat() {
        let h = Harness::new(&[]);
        h.press(1, "group_create").await;
        h.pair(1, 2).await;

        h.say(1, "hello partner").await;
        assert_eq!(h.messenger.texts_to(2), vec!["👤 Anonymous: hello partner"]);
        assert_eq!(h.handler.state.read().await.group_count(), 0);
    }

    #[tokio::test]
    async fn test_group_name_checked_for_banned_words() {
        let h = Harness::new(&[]);
        h.handler
            .state
            .write()
            .await
            .config
            .add_banned_word("scam")
            .unwrap();
        h.press(1, "group_create").await;

        h.say(1, "Scam Club").await;
        assert!(h.last_text(1).contains("Message Not Sent"));
        assert_eq!(h.handler.state.read().await.group_count(), 0);

        h.say(1, "Book Club").await;
        assert!(h.last_text(1).contains("Group 'Book Club' created"));
    }

    #[tokio::test]
    async fn test_group_leave_transfers_admin() {
        let h = Harness::new(&[]);
        h.say(1, "/group Book Club").await;
        let group_id = h.handler.state.read().await.current_group(1).unwrap().id.clone();
        h.press(2, &format!("join_group_{group_id}")).await;
        h.press(3, &format!("join_group_{group_id}")).await;
        h.messenger.clear();

        h.say(1, "/leave").await;
        assert!(h.last_text(1).contains("admin privileges have been transferred"));
        assert_eq!(h.last_text(2), "👑 You are now the admin of the group 'Book Club'!");
        assert_eq!(h.last_text(3), "ℹ️ A member has left the group 'Book Club'.");

        h.say(1, "/leave").await;
        assert_eq!(h.last_text(1), "ℹ️ You're not currently in any group chat.");
    }

    #[tokio::test]
    async fn test_connect_in_topic_mode_without_topic() {
        let h = Harness::new(&[]);
        h.press(1, "mode_topic").await;
        assert!(h.messenger.edited_texts()[0].contains("Mode set to Topic-Based Chat"));

        h.say(1, "/connect").await;
        assert!(h.messenger.texts_to(1)[0].contains("Select a Topic"));

        h.press(1, "topic_music").await;
        h.press(2, "topic_music").await;
        h.say(1, "/connect").await;
        h.say(2, "/connect").await;
        assert!(h.last_text(2).contains("Connected with music enthusiast"));
    }

    #[tokio::test]
    async fn test_mood_tip_shown_once() {
        let h = Harness::new(&[]);
        h.pair(1, 2).await;

        h.say(1, "/mood fire").await;
        let texts = h.messenger.texts_to(2);
        assert!(texts[0].contains("🔥 🔥 🔥"));
        assert!(texts[1].contains("Mood Reaction Tip"));
        assert!(h.last_text(1).contains("You sent: 🔥"));

        h.messenger.clear();
        h.say(1, "/mood happy").await;
        assert_eq!(h.messenger.texts_to(2).len(), 1);
    }

    #[tokio::test]
    async fn test_invite_link() {
        let h = Harness::new(&[]);
        h.say(1, "/invite").await;
        assert!(h.last_text(1).contains("Error creating invite link"));

        h.messenger.set_invite_link("https://t.me/+abc");
        h.say(1, "/invite").await;
        assert_eq!(h.last_text(1), "🔗 Here's your invite link: https://t.me/+abc");
    }

    #[tokio::test]
    async fn test_unknown_command_and_mention() {
        let h = Harness::new(&[]);
        h.say(1, "/dance").await;
        assert!(h.last_text(1).contains("Unknown command /dance"));

        h.messenger.clear();
        h.say(1, "/start@some_other_bot").await;
        assert!(h.last_text(1).contains("not in an active conversation"));
    }

    #[tokio::test]
    async fn test_unreachable_partner_reports_failure() {
        let h = Harness::new(&[]);
        h.pair(1, 2).await;
        h.messenger.make_unreachable(2);

        h.say(1, "are you there?").await;
        assert!(h.last_text(1).contains("could not be delivered"));
    }
}
