//! Telegram transport.
//!
//! The bot talks to Telegram over MTProto through grammers. Handlers only
//! see the [`Messenger`] trait and [`Incoming`] updates, so the chat logic
//! runs the same against a recording fake in tests.

mod client;
mod messenger;
mod rate_limiter;

pub use client::{TelegramBot, TelegramError, UpdateFeed};
pub(crate) use client::truncate_for_log;
pub use messenger::{Incoming, MessageRef, Messenger};
pub use rate_limiter::RateLimiter;

#[cfg(test)]
pub(crate) use messenger::testing::RecordingMessenger;
