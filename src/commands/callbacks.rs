//! Inline button handling.

use rand::seq::IndexedRandom;
use tracing::debug;

use super::handler::{CommandHandler, Origin};
use super::menus;
use super::types::{Button, CallbackAction, Keyboard, Reaction, Reply};
use crate::chat::{ChatMode, Topic};
use crate::telegram::Messenger;

impl<M: Messenger> CommandHandler<M> {
    /// Executes a pressed button.
    pub(super) async fn on_callback(&self, origin: &Origin, action: CallbackAction) {
        debug!("Callback from {}: {:?}", origin.user_id, action);

        match action {
            CallbackAction::RevealAnswer { requester, accept } => {
                self.answer_reveal(origin, requester, accept).await;
            }
            CallbackAction::SelectMode(mode) => self.select_mode(origin, mode).await,
            CallbackAction::SelectTopic(topic) => self.select_topic(origin, topic).await,
            CallbackAction::GroupCreate => {
                self.state.write().await.await_group_name(origin.user_id);
                self.answer(
                    origin,
                    Reply::markdown(
                        "👥 *Creating a New Group*\n\n\
                         Please send a name for your group (e.g., 'Tech Chat', 'Music Lovers'):",
                    ),
                )
                .await;
            }
            CallbackAction::GroupBrowse => self.browse_groups(origin).await,
            CallbackAction::JoinGroup(group_id) => self.join_group(origin, &group_id).await,
            CallbackAction::LeaveGroup => self.leave(origin).await,
            CallbackAction::ConnectNow | CallbackAction::TryAgain => self.connect(origin).await,
            CallbackAction::ChangeMode => {
                let mode = self.state.read().await.preferences(origin.user_id).mode;
                self.reply_all(origin, menus::mode_menu(mode)).await;
            }
            CallbackAction::CancelSearch => self.disconnect(origin).await,
            CallbackAction::ContinueChat => self.continue_chat(origin).await,
            CallbackAction::ShowTips => self.reply(origin, menus::chat_tips()).await,
            CallbackAction::CloseTips => {
                self.answer(
                    origin,
                    Reply::markdown("✅ *Tips closed*\n\nEnjoy your anonymous conversation!"),
                )
                .await;
            }
            CallbackAction::RequestReveal => self.reveal(origin).await,
            CallbackAction::React(reaction) => self.react(origin, reaction).await,
            CallbackAction::SelectMood(mood) => self.deliver_mood(origin, mood).await,
            CallbackAction::CancelMood => {
                self.answer(
                    origin,
                    Reply::markdown("🚫 *Mood selection cancelled*\n\nNo reaction was sent."),
                )
                .await;
            }
            CallbackAction::TryMood => {
                let connected = self.state.read().await.partner_of(origin.user_id).is_some();
                let reply = if connected {
                    menus::mood_menu()
                } else {
                    Reply::plain("❌ You need to be in an active conversation to send mood reactions.")
                };
                self.reply(origin, reply).await;
            }
            CallbackAction::GroupReact {
                reaction,
                group_id,
                sender_number,
            } => {
                self.group_react(origin, reaction, &group_id, sender_number)
                    .await;
            }
            CallbackAction::Admin(action) => self.on_admin_callback(origin, action).await,
        }
    }

    async fn select_mode(&self, origin: &Origin, mode: ChatMode) {
        self.state.write().await.set_mode(origin.user_id, mode);

        let reply = match mode {
            ChatMode::OneOnOne => Reply::plain(
                "✅ Mode set to 1️⃣ One-on-One Chat.\n\nUse /connect to find a random partner.",
            ),
            ChatMode::Topic => Reply::plain(
                "📋 Mode set to Topic-Based Chat.\n\nPlease select a topic you're interested in:",
            )
            .with_keyboard(menus::topic_keyboard()),
            ChatMode::Group => Reply::plain(
                "👥 Mode set to Group Chat.\n\nWould you like to create a new group or browse existing ones?",
            )
            .with_keyboard(
                Keyboard::new()
                    .button("➕ Create New Group", "group_create")
                    .button("🔍 Browse Public Groups", "group_browse"),
            ),
        };
        self.answer(origin, reply).await;
    }

    pub(super) async fn select_topic(&self, origin: &Origin, topic: Topic) {
        self.state.write().await.set_topic(origin.user_id, topic);
        let text = format!(
            "✅ Topic set to: '{}'\n\nClick the button below to find someone interested in this topic!",
            topic.label()
        );
        self.answer(
            origin,
            Reply::plain(text).with_keyboard(Keyboard::new().button("🔍 Find Partner", "connect_now")),
        )
        .await;
    }

    async fn browse_groups(&self, origin: &Origin) {
        let (total, open) = {
            let state = self.state.read().await;
            (state.group_count(), state.open_groups())
        };

        let reply = if total == 0 {
            Reply::plain("❌ No active group chats available. You can create one yourself!")
        } else if open.is_empty() {
            Reply::plain(
                "❌ All groups are currently full. Please try again later or create your own group.",
            )
        } else {
            let keyboard = open.iter().fold(Keyboard::new(), |kb, group| {
                kb.row(vec![Button::new(
                    format!("{} ({}/{})", group.name, group.members.len(), group.max_size),
                    format!("join_group_{}", group.id),
                )])
            });
            Reply::plain("📋 Available Group Chats:\nSelect a group to join:").with_keyboard(keyboard)
        };
        self.answer(origin, reply).await;
    }

    async fn continue_chat(&self, origin: &Origin) {
        let connected = self.state.read().await.partner_of(origin.user_id).is_some();
        let reply = if connected {
            let tip = menus::CHAT_TIPS
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or_default();
            Reply::markdown(format!(
                "✅ *Chat Active*\n\n\
                 You're still connected with your partner. Just type to send messages!\n\n{tip}"
            ))
        } else {
            Reply::markdown(
                "❓ *No Active Chat*\n\n\
                 You're not currently connected to anyone. Would you like to find a new chat partner?",
            )
            .with_keyboard(Keyboard::new().button("🔍 Find New Partner", "connect_now"))
        };
        self.answer(origin, reply).await;
    }

    /// Reaction button under a relayed one-on-one message.
    async fn react(&self, origin: &Origin, reaction: Reaction) {
        let partner = self.state.read().await.partner_of(origin.user_id);
        let Some(partner) = partner else {
            return self
                .reply(
                    origin,
                    Reply::plain(
                        "❌ You're not in an active conversation. Find a chat partner first to send reactions.",
                    ),
                )
                .await;
        };

        self.send(partner, Reply::markdown(reaction.partner_notice()))
            .await;
        let text = format!("✅ You reacted with {}", reaction.emoji());
        self.reply(origin, Reply::plain(text)).await;
    }

    /// Reaction button under a relayed group message.
    async fn group_react(
        &self,
        origin: &Origin,
        reaction: Reaction,
        group_id: &str,
        sender_number: usize,
    ) {
        let group = self
            .state
            .read()
            .await
            .current_group(origin.user_id)
            .filter(|g| g.id == group_id)
            .cloned();
        let Some(group) = group else {
            return self
                .reply(origin, Reply::plain("❌ You're no longer in this group chat."))
                .await;
        };

        let reactor_number = group.member_number(origin.user_id).unwrap_or(0);
        let author = sender_number
            .checked_sub(1)
            .and_then(|i| group.members.get(i))
            .copied()
            .filter(|&a| a != origin.user_id);
        let emoji = reaction.emoji();

        if let Some(author) = author {
            self.send(author, Reply::markdown(reaction.author_notice(reactor_number)))
                .await;
        }
        let note = Reply::markdown(format!(
            "💫 *Group Reaction*\n\n\
             Member #{reactor_number} reacted with {emoji} to a message from Member #{sender_number}"
        ));
        for member in group
            .others(origin.user_id)
            .into_iter()
            .filter(|&m| Some(m) != author)
        {
            self.send(member, note.clone()).await;
        }
        self.reply(origin, Reply::plain(format!("✅ You reacted with {emoji}")))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::super::handler::tests::Harness;

    #[tokio::test]
    async fn test_mode_buttons() {
        let h = Harness::new(&[]);
        h.press(1, "mode_group").await;
        assert!(h.messenger.edited_texts()[0].contains("Mode set to Group Chat"));

        h.press(1, "change_mode").await;
        let menu = h.messenger.sent_to(1);
        assert!(menu[0].keyboard.as_ref().unwrap().rows[2][0].text.starts_with("✅ "));
    }

    #[tokio::test]
    async fn test_browse_without_groups() {
        let h = Harness::new(&[]);
        h.press(1, "group_browse").await;
        assert!(h.messenger.edited_texts()[0].contains("No active group chats"));
    }

    #[tokio::test]
    async fn test_browse_lists_open_groups() {
        let h = Harness::new(&[]);
        h.say(1, "/group Chess").await;
        h.press(2, "group_browse").await;
        assert_eq!(
            h.messenger.edited_texts()[0],
            "📋 Available Group Chats:\nSelect a group to join:"
        );
    }

    #[tokio::test]
    async fn test_join_missing_group() {
        let h = Harness::new(&[]);
        h.press(1, "join_group_grp_0_1111").await;
        assert!(h.messenger.edited_texts()[0].contains("no longer exists or is full"));
    }

    #[tokio::test]
    async fn test_direct_reaction() {
        let h = Harness::new(&[]);
        h.pair(1, 2).await;
        h.press(2, "mood_laugh").await;
        assert!(h.last_text(1).contains("Someone found your message funny"));
        assert_eq!(h.last_text(2), "✅ You reacted with 😂");
    }

    #[tokio::test]
    async fn test_select_and_cancel_mood() {
        let h = Harness::new(&[]);
        h.pair(1, 2).await;
        h.press(1, "select_mood_party").await;
        assert!(h.messenger.edited_texts()[0].contains("Mood selected"));
        assert!(h.messenger.texts_to(2)[0].contains("🎉 🎊 🎉"));

        h.press(1, "cancel_mood").await;
        assert!(h.messenger.edited_texts()[1].contains("Mood selection cancelled"));
    }

    #[tokio::test]
    async fn test_group_reaction_notifies_author_and_others() {
        let h = Harness::new(&[]);
        h.say(1, "/group Films").await;
        let group_id = h.handler.state.read().await.current_group(1).unwrap().id.clone();
        h.press(2, &format!("join_group_{group_id}")).await;
        h.press(3, &format!("join_group_{group_id}")).await;
        h.messenger.clear();

        h.press(3, &format!("group_mood_clap_{group_id}_1")).await;
        assert!(h.last_text(1).contains("Your message received applause"));
        assert!(h.last_text(2).contains("Member #3 reacted with 👏 to a message from Member #1"));
        assert_eq!(h.last_text(3), "✅ You reacted with 👏");

        h.press(4, &format!("group_mood_clap_{group_id}_1")).await;
        assert_eq!(h.last_text(4), "❌ You're no longer in this group chat.");
    }

    #[tokio::test]
    async fn test_continue_chat() {
        let h = Harness::new(&[]);
        h.press(1, "continue_chat").await;
        assert!(h.messenger.edited_texts()[0].contains("No Active Chat"));

        h.pair(1, 2).await;
        h.press(1, "continue_chat").await;
        assert!(h.messenger.edited_texts()[0].contains("Chat Tip"));
    }
}
