//! Telegram bot connection built on grammers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::client::UpdatesConfiguration;
use grammers_client::peer::{Peer, User};
use grammers_client::update::{CallbackQuery, Update, UpdateStream};
use grammers_client::{Client, InputMessage, InvocationError, SenderPool, button, reply_markup, sender};
use grammers_session::storages::SqliteSession;
use grammers_session::types::PeerRef;
use grammers_tl_types as tl;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::messenger::{Incoming, MessageRef, Messenger};
use super::RateLimiter;
use crate::chat::UserProfile;
use crate::commands::{Keyboard, Reply};
use crate::config::TelegramConfig;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),

    #[error("No known peer for chat {0}")]
    UnknownPeer(i64),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        classify_error(err.to_string())
    }
}

fn classify_error(err_str: String) -> TelegramError {
    if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
        && let Some(seconds) = extract_flood_wait_seconds(&err_str)
    {
        return TelegramError::FloodWait(seconds);
    }
    TelegramError::Invocation(err_str)
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let lower = err_msg.to_lowercase();
    ["flood_wait_", "flood wait "].into_iter().find_map(|pattern| {
        let start = lower.find(pattern)? + pattern.len();
        let digits: String = lower[start..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    })
}

/// Chats the bot has seen, needed to address outgoing messages.
type PeerCache = Arc<RwLock<HashMap<i64, PeerRef>>>;

/// Connected and signed-in bot.
pub struct TelegramBot {
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    rate_limiter: RateLimiter,
    peers: PeerCache,
    username: Option<String>,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

/// Stream of updates converted to [`Incoming`].
pub struct UpdateFeed {
    stream: UpdateStream,
    peers: PeerCache,
}

impl TelegramBot {
    /// Connects, signs in with the bot token and opens the update feed.
    pub async fn connect(
        config: &TelegramConfig,
        min_send_interval_ms: u64,
    ) -> Result<(Self, UpdateFeed), TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;
        if authorized {
            info!("Reusing existing bot session");
        } else {
            info!("Signing in with bot token...");
            client
                .bot_sign_in(&config.bot_token, &config.api_hash)
                .await
                .map_err(|e| TelegramError::SignInFailed(e.to_string()))?;
        }

        let me = client.get_me().await?;
        let username = me.username().map(str::to_owned);
        info!(
            "Signed in as @{}",
            username.as_deref().unwrap_or("unknown")
        );

        let stream = client.stream_updates(
            updates,
            UpdatesConfiguration {
                catch_up: false,
                ..Default::default()
            },
        );
        let peers: PeerCache = Arc::default();

        let bot = Self {
            client,
            handle: handle.thin,
            rate_limiter: RateLimiter::from_millis(min_send_interval_ms),
            peers: Arc::clone(&peers),
            username,
            _pool_task: pool_task,
        };
        Ok((bot, UpdateFeed { stream, peers }))
    }

    /// The bot's own username, used to accept `/cmd@username`.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    async fn peer(&self, chat_id: i64) -> Result<PeerRef, TelegramError> {
        self.peers
            .read()
            .await
            .get(&chat_id)
            .copied()
            .ok_or(TelegramError::UnknownPeer(chat_id))
    }

    /// Runs a send operation through the rate limiter, backing off on flood waits.
    async fn paced<T, F, Fut>(&self, op: F) -> Result<T, TelegramError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, InvocationError>>,
    {
        self.rate_limiter.acquire().await;
        match op().await {
            Ok(value) => Ok(value),
            Err(e) => {
                let err: TelegramError = e.into();
                if let TelegramError::FloodWait(seconds) = err {
                    self.rate_limiter.block_for(seconds).await;
                    self.rate_limiter.acquire().await;
                    return op().await.map_err(Into::into);
                }
                Err(err)
            }
        }
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<MessageRef, TelegramError> {
        let peer = self.peer(chat_id).await?;
        debug!("Sending to {}: \"{}\"", chat_id, truncate_for_log(&reply.text, 30));
        let message = self
            .paced(|| self.client.send_message(peer, to_input_message(reply)))
            .await?;
        Ok(MessageRef {
            chat_id,
            message_id: message.id(),
        })
    }

    async fn edit(&self, message: MessageRef, reply: &Reply) -> Result<(), TelegramError> {
        let peer = self.peer(message.chat_id).await?;
        self.paced(|| {
            self.client
                .edit_message(peer, message.message_id, to_input_message(reply))
        })
        .await
    }

    async fn create_invite_link(&self, chat_id: i64) -> Result<String, TelegramError> {
        let peer = self.peer(chat_id).await?;
        let request = tl::functions::messages::ExportChatInvite {
            legacy_revoke_permanent: false,
            request_needed: false,
            peer: peer.into(),
            expire_date: None,
            usage_limit: None,
            title: None,
            subscription_pricing: None,
        };
        match self.client.invoke(&request).await? {
            tl::enums::ExportedChatInvite::ChatInviteExported(invite) => Ok(invite.link),
            tl::enums::ExportedChatInvite::ChatInvitePublicJoinRequests => Err(
                TelegramError::Invocation("chat only accepts join requests".to_owned()),
            ),
        }
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("username", &self.username)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

impl UpdateFeed {
    /// Waits for the next update the bot cares about.
    ///
    /// Returns `Ok(None)` when the connection closes.
    pub async fn next(&mut self) -> Result<Option<Incoming>, TelegramError> {
        loop {
            let update = match self.stream.next().await {
                Ok(update) => update,
                Err(e) => {
                    let err: TelegramError = e.into();
                    if matches!(err, TelegramError::Invocation(ref s) if s.contains("dropped")) {
                        return Ok(None);
                    }
                    return Err(err);
                }
            };

            match update {
                Update::NewMessage(message) if !message.outgoing() => {
                    let Some(Peer::User(user)) = message.sender() else {
                        continue;
                    };
                    let Some(chat) = message.peer() else {
                        continue;
                    };
                    let chat_id = self.remember(chat).await;
                    self.remember(&Peer::User(user.clone())).await;

                    let text = message.text().to_owned();
                    if text.is_empty() {
                        continue;
                    }
                    return Ok(Some(Incoming::Message {
                        chat_id,
                        from: profile_from_user(user),
                        text,
                    }));
                }
                Update::CallbackQuery(query) => {
                    if let Some(incoming) = self.callback(&query).await {
                        return Ok(Some(incoming));
                    }
                }
                _ => {}
            }
        }
    }

    async fn callback(&self, query: &CallbackQuery) -> Option<Incoming> {
        if let Err(e) = query.answer().send().await {
            warn!("Failed to answer callback query: {}", e);
        }

        let Peer::User(user) = query.sender()? else {
            return None;
        };
        let chat_id = self.remember(query.peer()?).await;
        self.remember(&Peer::User(user.clone())).await;

        Some(Incoming::Callback {
            chat_id,
            message_id: query.message_id(),
            from: profile_from_user(user),
            data: String::from_utf8_lossy(query.data()).into_owned(),
        })
    }

    /// Stores the peer for later sends and returns its chat id.
    async fn remember(&self, peer: &Peer) -> i64 {
        let chat_id = peer.id().bot_api_dialog_id();
        if let Some(peer_ref) = peer.to_ref() {
            self.peers.write().await.insert(chat_id, peer_ref);
        }
        chat_id
    }

    /// Persists the update state before shutdown.
    pub fn sync(&mut self) {
        self.stream.sync_update_state();
    }
}

fn profile_from_user(user: &User) -> UserProfile {
    let mut profile = UserProfile::new(
        user.id().bot_api_dialog_id(),
        user.first_name().unwrap_or_default(),
    );
    if let Some(last) = user.last_name().filter(|s| !s.is_empty()) {
        profile = profile.with_last_name(last);
    }
    if let Some(username) = user.username() {
        profile = profile.with_username(username);
    }
    profile
}

fn to_input_message(reply: &Reply) -> InputMessage {
    let message = if reply.markdown {
        InputMessage::new().markdown(&reply.text)
    } else {
        InputMessage::new().text(&reply.text)
    };
    match &reply.keyboard {
        Some(keyboard) => message.reply_markup(&to_markup(keyboard)),
        None => message,
    }
}

fn to_markup(keyboard: &Keyboard) -> reply_markup::Inline {
    reply_markup::inline(
        keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| button::inline(&b.text, b.data.as_bytes()))
                    .collect()
            })
            .collect::<Vec<Vec<_>>>(),
    )
}

/// Truncates a string for logging purposes.
pub(crate) fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("Hello", 10), "Hello");
        assert_eq!(truncate_for_log("Hello, World!", 5), "Hello...");
        assert_eq!(truncate_for_log("Привет мир", 6), "Привет...");
    }

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("FLOOD_WAIT_120"), Some(120));
        assert_eq!(extract_flood_wait_seconds("flood wait 60 seconds"), Some(60));
        assert_eq!(extract_flood_wait_seconds("some other error"), None);
    }

    #[test]
    fn test_classify_error() {
        assert!(matches!(
            classify_error("rpc error 420: FLOOD_WAIT_7".to_owned()),
            TelegramError::FloodWait(7)
        ));
        assert!(matches!(
            classify_error("USER_IS_BLOCKED".to_owned()),
            TelegramError::Invocation(_)
        ));
    }
}
