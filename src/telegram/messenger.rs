//! Transport-neutral view of Telegram used by the handlers.

use async_trait::async_trait;

use super::TelegramError;
use crate::chat::UserProfile;
use crate::commands::Reply;

/// A sent message that can be edited later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// An update the bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A text message.
    Message {
        chat_id: i64,
        from: UserProfile,
        text: String,
    },

    /// An inline button press. Already answered by the transport.
    Callback {
        chat_id: i64,
        message_id: i32,
        from: UserProfile,
        data: String,
    },
}

impl Incoming {
    #[must_use]
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::Message { chat_id, .. } | Self::Callback { chat_id, .. } => *chat_id,
        }
    }

    #[must_use]
    pub fn from(&self) -> &UserProfile {
        match self {
            Self::Message { from, .. } | Self::Callback { from, .. } => from,
        }
    }
}

/// Outgoing side of the bot.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a message to a chat.
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<MessageRef, TelegramError>;

    /// Replaces the text and keyboard of a sent message.
    async fn edit(&self, message: MessageRef, reply: &Reply) -> Result<(), TelegramError>;

    /// Creates an invite link for a group or channel.
    async fn create_invite_link(&self, chat_id: i64) -> Result<String, TelegramError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    use super::*;

    /// Messenger that records everything and never touches the network.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingMessenger {
        sent: Mutex<Vec<(i64, Reply)>>,
        edits: Mutex<Vec<(MessageRef, Reply)>>,
        unreachable: Mutex<HashSet<i64>>,
        invite_link: Mutex<Option<String>>,
        next_id: AtomicI32,
    }

    impl RecordingMessenger {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Makes every send to the chat fail.
        pub(crate) fn make_unreachable(&self, chat_id: i64) {
            self.unreachable.lock().unwrap().insert(chat_id);
        }

        pub(crate) fn set_invite_link(&self, link: &str) {
            *self.invite_link.lock().unwrap() = Some(link.to_owned());
        }

        pub(crate) fn sent_to(&self, chat_id: i64) -> Vec<Reply> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| *id == chat_id)
                .map(|(_, reply)| reply.clone())
                .collect()
        }

        pub(crate) fn texts_to(&self, chat_id: i64) -> Vec<String> {
            self.sent_to(chat_id).into_iter().map(|r| r.text).collect()
        }

        /// Texts of all edits in order.
        pub(crate) fn edited_texts(&self) -> Vec<String> {
            self.edits
                .lock()
                .unwrap()
                .iter()
                .map(|(_, reply)| reply.text.clone())
                .collect()
        }

        /// Everything a user saw: sent messages and edits of their chat.
        pub(crate) fn seen_by(&self, chat_id: i64) -> Vec<String> {
            let mut texts = self.texts_to(chat_id);
            texts.extend(
                self.edits
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|(m, _)| m.chat_id == chat_id)
                    .map(|(_, reply)| reply.text.clone()),
            );
            texts
        }

        pub(crate) fn total_sent(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        pub(crate) fn clear(&self) {
            self.sent.lock().unwrap().clear();
            self.edits.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(&self, chat_id: i64, reply: &Reply) -> Result<MessageRef, TelegramError> {
            if self.unreachable.lock().unwrap().contains(&chat_id) {
                return Err(TelegramError::Invocation("USER_IS_BLOCKED".to_owned()));
            }
            self.sent.lock().unwrap().push((chat_id, reply.clone()));
            Ok(MessageRef {
                chat_id,
                message_id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            })
        }

        async fn edit(&self, message: MessageRef, reply: &Reply) -> Result<(), TelegramError> {
            self.edits.lock().unwrap().push((message, reply.clone()));
            Ok(())
        }

        async fn create_invite_link(&self, chat_id: i64) -> Result<String, TelegramError> {
            self.invite_link
                .lock()
                .unwrap()
                .clone()
                .ok_or(TelegramError::UnknownPeer(chat_id))
        }
    }
}
