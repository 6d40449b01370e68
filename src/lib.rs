//! Anonymous Chat Bot Library
//!
//! A Telegram bot that connects strangers for anonymous conversations.
//!
//! This crate provides the core functionality for:
//! - Pairing users one-on-one or by topic, and hosting group rooms
//! - Connecting to Telegram via `MTProto`
//! - Timing out searches and reveal requests on a schedule
//! - Handling user and admin commands
//! - Serving a small informational website

pub mod chat;
pub mod commands;
pub mod config;
pub mod scheduler;
pub mod telegram;
pub mod web;
