//! Command handling module.
//!
//! Turns Telegram messages and button presses into chat actions: pairing,
//! relaying, group rooms, reveals and the admin dashboard.

mod admin;
mod callbacks;
mod handler;
mod menus;
mod types;

pub use handler::CommandHandler;
pub use types::{
    AdminAction, BotCommand, Button, CallbackAction, Keyboard, Mood, Reaction, Reply,
};
