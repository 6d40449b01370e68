//! Admin dashboard, moderation and broadcasts.

use chrono::Utc;
use tracing::{info, warn};

use super::handler::{CommandHandler, Origin};
use super::menus::{self, NOT_ADMIN};
use super::types::{AdminAction, BotCommand, Keyboard, Reply};
use crate::chat::{Audience, BanOutcome, ChatState, DisconnectOutcome, LeaveOutcome, UserId};
use crate::config::{ConfigError, Privilege};
use crate::telegram::{Messenger, truncate_for_log};

/// Number of log entries shown by "View Logs".
const LOG_PAGE: usize = 15;

/// Recipients between broadcast progress updates.
const PROGRESS_EVERY: usize = 10;

/// A runtime configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigChange {
    Timeout(u64),
    GroupSize(u64),
    RevealTimeout(u64),
    AddWord(String),
    RemoveWord(String),
}

impl ConfigChange {
    /// Applies the change, returning the confirmation text.
    fn apply(&self, state: &mut ChatState) -> Result<String, ConfigError> {
        let config = &mut state.config;
        match self {
            Self::Timeout(secs) => {
                config.set_connection_timeout(*secs)?;
                Ok(format!("✅ Connection timeout set to {secs} seconds."))
            }
            Self::GroupSize(size) => {
                config.set_max_group_size(*size)?;
                Ok(format!("✅ Maximum group size set to {size} members."))
            }
            Self::RevealTimeout(secs) => {
                config.set_reveal_timeout(*secs)?;
                Ok(format!("✅ Reveal timeout set to {secs} seconds."))
            }
            Self::AddWord(word) => {
                let word = config.add_banned_word(word)?;
                Ok(format!("✅ Added '{word}' to banned words list."))
            }
            Self::RemoveWord(word) => {
                let word = config.remove_banned_word(word)?;
                Ok(format!("✅ Removed '{word}' from banned words list."))
            }
        }
    }

    /// Admin log details.
    fn describe(&self) -> String {
        match self {
            Self::Timeout(secs) => format!("Set timeout to {secs}s"),
            Self::GroupSize(size) => format!("Set max group size to {size}"),
            Self::RevealTimeout(secs) => format!("Set reveal timeout to {secs}s"),
            Self::AddWord(word) => format!("Added banned word: {word}"),
            Self::RemoveWord(word) => format!("Removed banned word: {word}"),
        }
    }

    fn error_text(&self, error: &ConfigError) -> String {
        match error {
            ConfigError::OutOfRange { name, min, max } => {
                let unit = match self {
                    Self::GroupSize(_) => "members",
                    _ => "seconds",
                };
                format!("⚠️ {name} must be between {min} and {max} {unit}.")
            }
            ConfigError::DuplicateWord(word) => {
                format!("⚠️ '{word}' is already in the banned words list.")
            }
            ConfigError::UnknownWord(word) => format!("⚠️ '{word}' is not in the banned words list."),
            ConfigError::EmptyWord => {
                "⚠️ Please provide a value for the add_banned_word setting.".to_owned()
            }
            other => format!("⚠️ {other}"),
        }
    }
}

impl<M: Messenger> CommandHandler<M> {
    /// Executes an admin-only command.
    pub(super) async fn execute_admin(&self, origin: &Origin, command: BotCommand) {
        info!("Admin command from {}: {}", origin.user_id, command);

        match command {
            BotCommand::Admin => self.show_dashboard(origin).await,
            BotCommand::AdminUsers => self.show_user_management(origin).await,
            BotCommand::AdminBroadcast => self.show_broadcast_options(origin).await,
            BotCommand::AdminConfig => self.show_config(origin).await,
            BotCommand::AdminFindUser(term) => self.find_user(origin, &term).await,
            BotCommand::Broadcast(message) => self.legacy_broadcast(origin, &message).await,
            BotCommand::BroadcastTo(audience, message) => {
                self.broadcast(origin, audience, &message).await;
            }
            BotCommand::SetTimeout(secs) => {
                self.change_config(origin, ConfigChange::Timeout(secs)).await;
            }
            BotCommand::SetGroupSize(size) => {
                self.change_config(origin, ConfigChange::GroupSize(size)).await;
            }
            BotCommand::SetRevealTimeout(secs) => {
                self.change_config(origin, ConfigChange::RevealTimeout(secs))
                    .await;
            }
            BotCommand::AddBannedWord(word) => {
                self.change_config(origin, ConfigChange::AddWord(word)).await;
            }
            BotCommand::RemoveBannedWord(word) => {
                self.change_config(origin, ConfigChange::RemoveWord(word))
                    .await;
            }
            BotCommand::Ban { user_id, reason } => self.ban_user(origin, user_id, reason).await,
            BotCommand::Unban(user_id) => self.unban_user(origin, user_id).await,
            other => warn!("Not an admin command: {}", other),
        }
    }

    /// Executes an admin dashboard button.
    pub(super) async fn on_admin_callback(&self, origin: &Origin, action: AdminAction) {
        if !origin.is_admin {
            warn!("User {} pressed an admin button", origin.user_id);
            return self
                .answer(
                    origin,
                    Reply::plain("⚠️ You don't have permission to access admin features."),
                )
                .await;
        }

        match action {
            AdminAction::Dashboard => self.show_dashboard(origin).await,
            AdminAction::Users => self.show_user_management(origin).await,
            AdminAction::Stats => self.show_statistics(origin).await,
            AdminAction::Broadcast => self.show_broadcast_options(origin).await,
            AdminAction::BroadcastTo(audience) => {
                let text = format!(
                    "📢 Send your message to {} with:\n/broadcast_{} <message>",
                    audience.describe(),
                    audience.as_str()
                );
                self.answer(origin, menus::admin_notice(text)).await;
            }
            AdminAction::Config => self.show_config(origin).await,
            AdminAction::Logs => self.show_logs(origin).await,
            AdminAction::ViewBanned => {
                let ids = self.state.read().await.banned_users();
                self.show_user_list(origin, "🚫 *Banned Users*", &ids).await;
            }
            AdminAction::ActiveUsers => {
                let ids = self.state.read().await.audience(Audience::Active);
                self.show_user_list(origin, "👥 *Active Users*", &ids).await;
            }
            AdminAction::WaitingUsers => {
                let ids = self.state.read().await.audience(Audience::Waiting);
                self.show_user_list(origin, "⏳ *Waiting Users*", &ids).await;
            }
            AdminAction::Maintenance(enable) => self.set_maintenance(origin, enable).await,
            AdminAction::Ban(user_id) => self.ban_user(origin, user_id, None).await,
            AdminAction::Unban(user_id) => self.unban_user(origin, user_id).await,
            AdminAction::Disconnect(user_id) => self.force_disconnect(origin, user_id).await,
            AdminAction::RemoveWaiting(user_id) => self.remove_waiting(origin, user_id).await,
            AdminAction::RemoveGroup(user_id) => self.remove_from_group(origin, user_id).await,
            AdminAction::SetTimeout(secs) => {
                self.change_config(origin, ConfigChange::Timeout(secs)).await;
            }
            AdminAction::SetGroupSize(size) => {
                self.change_config(origin, ConfigChange::GroupSize(size)).await;
            }
            AdminAction::Unknown => {
                self.answer(origin, menus::admin_notice("⚠️ Unknown admin action."))
                    .await;
            }
        }
    }

    /// Checks a privilege, telling the admin when it is missing.
    async fn require(&self, origin: &Origin, privilege: Privilege, denied: &str) -> bool {
        if self.settings.has_privilege(origin.user_id, privilege) {
            return true;
        }
        warn!("User {} lacks the {:?} privilege", origin.user_id, privilege);
        self.answer(origin, Reply::plain(denied)).await;
        false
    }

    async fn show_dashboard(&self, origin: &Origin) {
        if !origin.is_admin {
            return self
                .reply(
                    origin,
                    Reply::plain("⚠️ You don't have permission to access the admin dashboard."),
                )
                .await;
        }
        let reply = {
            let mut state = self.state.write().await;
            state.refresh_statistics(Utc::now().date_naive());
            state
                .admin_log
                .record(origin.user_id, "access_dashboard", "Viewed admin dashboard");
            menus::dashboard(&state.status(), &state.stats, &state.config)
        };
        self.answer(origin, reply).await;
    }

    async fn show_statistics(&self, origin: &Origin) {
        if !self
            .require(origin, Privilege::StatsView, "⚠️ You don't have permission to view statistics.")
            .await
        {
            return;
        }
        let reply = {
            let mut state = self.state.write().await;
            state.refresh_statistics(Utc::now().date_naive());
            menus::statistics(&state.stats, &state.status())
        };
        self.answer(origin, reply).await;
    }

    async fn show_logs(&self, origin: &Origin) {
        if !self
            .require(origin, Privilege::LogsView, "⚠️ You don't have permission to view logs.")
            .await
        {
            return;
        }
        let lines: Vec<String> = self
            .state
            .read()
            .await
            .admin_log
            .recent(LOG_PAGE)
            .map(|entry| {
                format!(
                    "{} [{}] {}: {}",
                    entry.timestamp.format("%m-%d %H:%M"),
                    entry.admin_id,
                    entry.action,
                    entry.details
                )
            })
            .collect();
        let body = if lines.is_empty() {
            "No admin actions recorded yet.".to_owned()
        } else {
            lines.join("\n")
        };
        self.answer(origin, menus::admin_notice(format!("📜 RECENT ADMIN ACTIONS\n\n{body}")))
            .await;
    }

    async fn show_user_management(&self, origin: &Origin) {
        if !self
            .require(origin, Privilege::UserMgmt, "⚠️ You don't have permission to manage users.")
            .await
        {
            return;
        }
        let status = self.state.read().await.status();
        self.answer(
            origin,
            menus::user_management(status.total_users, status.banned_users),
        )
        .await;
    }

    async fn show_user_list(&self, origin: &Origin, title: &str, ids: &[UserId]) {
        if self
            .require(origin, Privilege::UserMgmt, "⚠️ You don't have permission to manage users.")
            .await
        {
            self.answer(origin, menus::user_list(title, ids)).await;
        }
    }

    async fn show_broadcast_options(&self, origin: &Origin) {
        if self
            .require(
                origin,
                Privilege::Broadcast,
                "⚠️ You don't have permission to broadcast messages.",
            )
            .await
        {
            self.answer(origin, menus::broadcast_options()).await;
        }
    }

    async fn show_config(&self, origin: &Origin) {
        if !self
            .require(
                origin,
                Privilege::SystemMgmt,
                "⚠️ You don't have permission to modify system configuration.",
            )
            .await
        {
            return;
        }
        let reply = menus::system_config(&self.state.read().await.config);
        self.answer(origin, reply).await;
    }

    async fn find_user(&self, origin: &Origin, term: &str) {
        if !self
            .require(
                origin,
                Privilege::UserMgmt,
                "⚠️ You don't have permission to view user information.",
            )
            .await
        {
            return;
        }
        let info = {
            let mut state = self.state.write().await;
            state
                .admin_log
                .record(origin.user_id, "search_user", format!("Search term: {term}"));
            state.find_user(term).and_then(|id| state.user_info(id))
        };
        let reply = match info {
            Some(info) => menus::user_details(&info),
            None => Reply::plain(format!("❌ User not found: {term}")),
        };
        self.reply(origin, reply).await;
    }

    async fn change_config(&self, origin: &Origin, change: ConfigChange) {
        if !self
            .require(
                origin,
                Privilege::SystemMgmt,
                "⚠️ You don't have permission to modify system configuration.",
            )
            .await
        {
            return;
        }
        let text = {
            let mut state = self.state.write().await;
            match change.apply(&mut state) {
                Ok(text) => {
                    info!("Admin {} changed config: {}", origin.user_id, change.describe());
                    state
                        .admin_log
                        .record(origin.user_id, "change_config", change.describe());
                    self.save(&state);
                    text
                }
                Err(e) => change.error_text(&e),
            }
        };
        self.answer(origin, Reply::plain(text).with_keyboard(menus::back_to_config()))
            .await;
    }

    async fn set_maintenance(&self, origin: &Origin, enable: bool) {
        let ended = {
            let mut state = self.state.write().await;
            let ended = state.set_maintenance(enable, &self.settings.admin_ids);
            let action = if enable {
                "enable_maintenance"
            } else {
                "disable_maintenance"
            };
            state
                .admin_log
                .record(origin.user_id, action, format!("Ended {} conversations", ended.len()));
            self.save(&state);
            ended
        };
        info!(
            "Admin {} set maintenance mode to {} ({} conversations ended)",
            origin.user_id,
            enable,
            ended.len()
        );

        let notice = Reply::markdown(
            "🛠️ *Bot Maintenance Mode*\n\n\
             Your conversation has been ended because the bot is entering maintenance mode.\n\n\
             Please try again later.",
        );
        for (a, b) in ended {
            self.send(a, notice.clone()).await;
            self.send(b, notice.clone()).await;
        }

        let text = if enable {
            "✅ Maintenance mode enabled. Only admins can use the bot now."
        } else {
            "✅ Maintenance mode disabled. All users can use the bot now."
        };
        self.answer(origin, menus::admin_notice(text)).await;
    }

    async fn ban_user(&self, origin: &Origin, target: UserId, reason: Option<String>) {
        if !self
            .require(origin, Privilege::UserMgmt, "⚠️ You don't have permission to manage users.")
            .await
        {
            return;
        }
        let outcome = {
            let mut state = self.state.write().await;
            let outcome = state.ban(target);
            if outcome != BanOutcome::UnknownUser {
                let reason = reason.as_deref().unwrap_or("No reason provided");
                state.admin_log.record(
                    origin.user_id,
                    "ban_user",
                    format!("User ID: {target}, Reason: {reason}"),
                );
                self.save(&state);
            }
            outcome
        };

        let text = match outcome {
            BanOutcome::UnknownUser => format!("❌ Failed to ban user {target}. User might not exist."),
            BanOutcome::Banned {
                former_partner,
                left_group,
            } => {
                info!("Admin {} banned user {}", origin.user_id, target);
                if let Some(partner) = former_partner {
                    self.notify_partner_left(partner).await;
                }
                self.announce_departure(&left_group).await;
                self.send(target, menus::banned_notice()).await;
                format!("✅ User {target} has been banned successfully.")
            }
        };
        self.answer(origin, Reply::plain(text).with_keyboard(menus::back_to_users()))
            .await;
    }

    async fn unban_user(&self, origin: &Origin, target: UserId) {
        if !self
            .require(origin, Privilege::UserMgmt, "⚠️ You don't have permission to manage users.")
            .await
        {
            return;
        }
        let unbanned = {
            let mut state = self.state.write().await;
            let unbanned = state.unban(target);
            if unbanned {
                state
                    .admin_log
                    .record(origin.user_id, "unban_user", format!("User ID: {target}"));
                self.save(&state);
            }
            unbanned
        };

        let text = if unbanned {
            info!("Admin {} unbanned user {}", origin.user_id, target);
            format!("✅ User {target} has been unbanned successfully.")
        } else {
            format!("❌ User {target} was not banned or does not exist.")
        };
        self.answer(origin, Reply::plain(text).with_keyboard(menus::back_to_users()))
            .await;
    }

    async fn force_disconnect(&self, origin: &Origin, target: UserId) {
        if !self
            .require(origin, Privilege::UserMgmt, "⚠️ You don't have permission to manage users.")
            .await
        {
            return;
        }
        let partner = {
            let mut state = self.state.write().await;
            if state.partner_of(target).is_none() {
                None
            } else if let DisconnectOutcome::Ended { partner } = state.disconnect(target) {
                state.admin_log.record(
                    origin.user_id,
                    "disconnect_user",
                    format!("User ID: {target}, Partner: {partner}"),
                );
                Some(partner)
            } else {
                None
            }
        };

        let text = match partner {
            Some(partner) => {
                let notice = Reply::markdown(
                    "ℹ️ *Conversation ended*\n\nYour conversation was ended by an administrator.",
                )
                .with_keyboard(menus::after_chat_keyboard());
                self.send(target, notice.clone()).await;
                self.send(partner, notice).await;
                format!("✅ User {target} has been disconnected.")
            }
            None => format!("ℹ️ User {target} is not in a conversation."),
        };
        self.answer(origin, Reply::plain(text).with_keyboard(menus::back_to_users()))
            .await;
    }

    async fn remove_waiting(&self, origin: &Origin, target: UserId) {
        if !self
            .require(origin, Privilege::UserMgmt, "⚠️ You don't have permission to manage users.")
            .await
        {
            return;
        }
        let removed = {
            let mut state = self.state.write().await;
            let removed = state.cancel_search(target);
            if removed {
                state
                    .admin_log
                    .record(origin.user_id, "remove_waiting", format!("User ID: {target}"));
            }
            removed
        };

        let text = if removed {
            self.send(
                target,
                Reply::plain("ℹ️ Your search was cancelled by an administrator.")
                    .with_keyboard(Keyboard::new().button("🔄 Try Again", "try_again")),
            )
            .await;
            format!("✅ User {target} has been removed from the waiting list.")
        } else {
            format!("ℹ️ User {target} is not waiting for a partner.")
        };
        self.answer(origin, Reply::plain(text).with_keyboard(menus::back_to_users()))
            .await;
    }

    async fn remove_from_group(&self, origin: &Origin, target: UserId) {
        if !self
            .require(origin, Privilege::UserMgmt, "⚠️ You don't have permission to manage users.")
            .await
        {
            return;
        }
        let outcome = {
            let mut state = self.state.write().await;
            let outcome = state.leave_group(target);
            if outcome != LeaveOutcome::NotInGroup {
                state
                    .admin_log
                    .record(origin.user_id, "remove_from_group", format!("User ID: {target}"));
            }
            outcome
        };

        let name = match &outcome {
            LeaveOutcome::Deleted { name } => Some(name.clone()),
            LeaveOutcome::Transferred { group, .. } | LeaveOutcome::Left { group } => {
                Some(group.name.clone())
            }
            LeaveOutcome::NotInGroup => None,
        };
        let text = match name {
            Some(name) => {
                self.send(
                    target,
                    Reply::plain(format!(
                        "👋 You have been removed from the group '{name}' by an administrator."
                    )),
                )
                .await;
                self.announce_departure(&outcome).await;
                format!("✅ User {target} has been removed from the group.")
            }
            None => format!("ℹ️ User {target} is not in a group chat."),
        };
        self.answer(origin, Reply::plain(text).with_keyboard(menus::back_to_users()))
            .await;
    }

    /// Legacy `/broadcast`: every known user, with a success and failure count.
    async fn legacy_broadcast(&self, origin: &Origin, message: &str) {
        if !origin.is_admin {
            return self.reply(origin, Reply::plain(NOT_ADMIN)).await;
        }
        let recipients = self.state.read().await.audience(Audience::All);
        self.reply(origin, Reply::plain("📣 Broadcasting message to all users..."))
            .await;

        let broadcast = Reply::markdown(format!(
            "📣 *Broadcast message from the bot admin:*\n\n{message}"
        ));
        let mut succeeded = 0;
        let mut failed = 0;
        for user in recipients {
            match self.messenger.send(user, &broadcast).await {
                Ok(_) => succeeded += 1,
                Err(e) => {
                    warn!("Broadcast to {} failed: {}", user, e);
                    failed += 1;
                }
            }
        }

        {
            let mut state = self.state.write().await;
            state.admin_log.record(
                origin.user_id,
                "broadcast",
                format!("Sent to {succeeded} all users: {}", truncate_for_log(message, 50)),
            );
            self.save(&state);
        }
        info!("Broadcast finished: {} sent, {} failed", succeeded, failed);
        self.reply(
            origin,
            Reply::plain(format!(
                "📊 Broadcast complete!\nSuccessful: {succeeded}\nFailed: {failed}"
            )),
        )
        .await;
    }

    /// Targeted broadcast with a progress message that is edited as it runs.
    async fn broadcast(&self, origin: &Origin, audience: Audience, message: &str) {
        if !self
            .require(
                origin,
                Privilege::Broadcast,
                "⚠️ You don't have permission to broadcast messages.",
            )
            .await
        {
            return;
        }
        let message = message.trim();
        if message.is_empty() {
            return self
                .reply(origin, Reply::plain("⚠️ Cannot send empty message."))
                .await;
        }

        let recipients = self.state.read().await.audience(audience);
        let total = recipients.len();
        let name = audience.describe();
        let progress = self
            .send(
                origin.chat_id,
                Reply::plain(format!("🔄 Sending broadcast to {total} {name}... (0%)")),
            )
            .await;

        let broadcast = Reply::markdown(format!("📢 *ADMIN BROADCAST*\n\n{message}"));
        let mut sent = 0;
        for (i, user) in recipients.into_iter().enumerate() {
            match self.messenger.send(user, &broadcast).await {
                Ok(_) => sent += 1,
                Err(e) => warn!("Broadcast to {} failed: {}", user, e),
            }
            let done = i + 1;
            if let Some(progress) = progress
                && done % PROGRESS_EVERY == 0
                && done < total
            {
                let update = Reply::plain(format!(
                    "🔄 Sending broadcast to {total} {name}... ({}%)",
                    done * 100 / total
                ));
                if let Err(e) = self.messenger.edit(progress, &update).await {
                    warn!("Failed to update broadcast progress: {}", e);
                }
            }
        }

        {
            let mut state = self.state.write().await;
            state.admin_log.record(
                origin.user_id,
                "broadcast",
                format!("Sent to {sent} {name}: {}", truncate_for_log(message, 50)),
            );
            self.save(&state);
        }
        info!("Broadcast to {} finished: {}/{}", name, sent, total);

        let summary = Reply::plain(format!("✅ Broadcast sent to {sent}/{total} {name}."));
        match progress {
            Some(progress) => {
                if let Err(e) = self.messenger.edit(progress, &summary).await {
                    warn!("Failed to update broadcast progress: {}", e);
                    self.reply(origin, summary).await;
                }
            }
            None => self.reply(origin, summary).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::handler::tests::Harness;
    use crate::chat::PersistentState;

    const ADMIN: i64 = 100;

    #[tokio::test]
    async fn test_dashboard_requires_admin() {
        let h = Harness::new(&[ADMIN]);
        h.say(1, "/admin").await;
        assert!(h.last_text(1).contains("permission to access the admin dashboard"));

        h.say(ADMIN, "/admin").await;
        let dashboard = h.messenger.sent_to(ADMIN).pop().unwrap();
        assert!(dashboard.text.starts_with("🛠️ *ADMIN DASHBOARD*"));
        assert!(dashboard.keyboard.unwrap().has_data("admin_maint_on"));
        assert_eq!(h.handler.state.read().await.admin_log.len(), 1);
    }

    #[tokio::test]
    async fn test_admin_buttons_require_admin() {
        let h = Harness::new(&[ADMIN]);
        h.handler.state.write().await.config.maintenance_mode = true;

        h.press(1, "admin_maint_off").await;
        assert!(h.messenger.edited_texts()[0].contains("permission to access admin features"));
        assert!(h.handler.state.read().await.config.maintenance_mode);
    }

    #[tokio::test]
    async fn test_maintenance_ends_conversations() {
        let h = Harness::new(&[ADMIN]);
        h.pair(1, 2).await;

        h.press(ADMIN, "admin_maint_on").await;
        assert!(h.messenger.edited_texts()[0].contains("Maintenance mode enabled"));
        assert!(h.last_text(1).contains("entering maintenance mode"));
        assert!(h.last_text(2).contains("entering maintenance mode"));
        assert_eq!(h.handler.state.read().await.partner_of(1), None);

        let saved = PersistentState::load(h.dir.path().join("state.json"));
        assert!(saved.config.maintenance_mode);
    }

    #[tokio::test]
    async fn test_set_timeout_validates_and_persists() {
        let h = Harness::new(&[ADMIN]);
        h.say(ADMIN, "/set_timeout 4").await;
        assert_eq!(
            h.last_text(ADMIN),
            "⚠️ Timeout must be between 5 and 300 seconds."
        );

        h.say(ADMIN, "/set_timeout 90").await;
        assert_eq!(h.last_text(ADMIN), "✅ Connection timeout set to 90 seconds.");
        let saved = PersistentState::load(h.dir.path().join("state.json"));
        assert_eq!(saved.config.connection_timeout, 90);

        h.say(1, "/set_timeout 90").await;
        assert!(h.last_text(1).contains("permission to modify system configuration"));
    }

    #[tokio::test]
    async fn test_banned_word_commands() {
        let h = Harness::new(&[ADMIN]);
        h.say(ADMIN, "/add_banned_word Scam").await;
        assert_eq!(h.last_text(ADMIN), "✅ Added 'scam' to banned words list.");
        h.say(ADMIN, "/add_banned_word scam").await;
        assert_eq!(
            h.last_text(ADMIN),
            "⚠️ 'scam' is already in the banned words list."
        );
        h.say(ADMIN, "/remove_banned_word eggs").await;
        assert_eq!(h.last_text(ADMIN), "⚠️ 'eggs' is not in the banned words list.");
    }

    #[tokio::test]
    async fn test_ban_disconnects_and_notifies() {
        let h = Harness::new(&[ADMIN]);
        h.pair(1, 2).await;
        h.say(ADMIN, "/start").await;

        h.press(ADMIN, "admin_ban_1").await;
        assert!(h.messenger.edited_texts()[0].contains("User 1 has been banned successfully"));
        assert!(h.messenger.texts_to(2)[0].contains("Your partner has disconnected"));
        assert!(h.last_text(1).contains("You have been banned"));

        let saved = PersistentState::load(h.dir.path().join("state.json"));
        assert_eq!(saved.banned_users, vec![1]);

        h.press(ADMIN, "admin_ban_777").await;
        assert!(h.messenger.edited_texts()[1].contains("Failed to ban user 777"));

        h.say(ADMIN, "/unban 1").await;
        assert_eq!(h.last_text(ADMIN), "✅ User 1 has been unbanned successfully.");
        h.say(ADMIN, "/unban 1").await;
        assert!(h.last_text(ADMIN).contains("was not banned"));
    }

    #[tokio::test]
    async fn test_find_user() {
        let h = Harness::new(&[ADMIN]);
        h.say(1, "/connect").await;

        h.say(ADMIN, "/admin_find_user 1").await;
        let info = h.messenger.sent_to(ADMIN).pop().unwrap();
        assert!(info.text.contains("*User ID:* `1`"));
        assert!(info.text.contains("• Waiting: ✅ Yes"));
        assert!(info.keyboard.unwrap().has_data("admin_remove_waiting_1"));

        h.say(ADMIN, "/admin_find_user ghost").await;
        assert_eq!(h.last_text(ADMIN), "❌ User not found: ghost");
    }

    #[tokio::test]
    async fn test_remove_waiting() {
        let h = Harness::new(&[ADMIN]);
        h.say(1, "/connect").await;
        h.press(ADMIN, "admin_remove_waiting_1").await;
        assert!(h.messenger.edited_texts()[0].contains("removed from the waiting list"));
        assert!(h.last_text(1).contains("cancelled by an administrator"));
        assert!(!h.handler.state.read().await.is_waiting(1));
    }

    #[tokio::test]
    async fn test_legacy_broadcast_counts_failures() {
        let h = Harness::new(&[ADMIN]);
        h.say(1, "/start").await;
        h.say(2, "/start").await;
        h.messenger.make_unreachable(2);

        h.say(1, "/broadcast hi").await;
        assert_eq!(
            h.last_text(1),
            "⚠️ You don't have permission to use this command."
        );

        h.say(ADMIN, "/broadcast Server restart at noon").await;
        assert!(h
            .last_text(1)
            .contains("📣 *Broadcast message from the bot admin:*\n\nServer restart at noon"));
        assert_eq!(
            h.last_text(ADMIN),
            "📊 Broadcast complete!\nSuccessful: 2\nFailed: 1"
        );
    }

    #[tokio::test]
    async fn test_targeted_broadcast() {
        let h = Harness::new(&[ADMIN]);
        h.pair(1, 2).await;
        h.say(3, "/connect").await;

        h.say(ADMIN, "/broadcast_active Be nice").await;
        assert_eq!(h.last_text(1), "📢 *ADMIN BROADCAST*\n\nBe nice");
        assert!(!h.last_text(3).contains("ADMIN BROADCAST"));
        assert_eq!(
            h.messenger.edited_texts().last().unwrap(),
            "✅ Broadcast sent to 2/2 active users."
        );
        let log = h.handler.state.read().await.admin_log.recent(1).next().cloned().unwrap();
        assert_eq!(log.details, "Sent to 2 active users: Be nice");
    }

    #[tokio::test]
    async fn test_privileges_can_be_disabled() {
        use std::sync::Arc;

        use crate::config::{AdminPrivileges, BotSettings};

        let mut h = Harness::new(&[ADMIN]);
        let settings = BotSettings {
            admin_ids: [ADMIN].into_iter().collect(),
            privileges: AdminPrivileges::with_disabled("broadcast"),
            state_path: h.dir.path().join("state.json"),
            ..BotSettings::default()
        };
        h.handler.settings = Arc::new(settings);

        h.say(ADMIN, "/broadcast_all hello").await;
        assert_eq!(
            h.last_text(ADMIN),
            "⚠️ You don't have permission to broadcast messages."
        );
    }
}
