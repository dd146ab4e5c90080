//! Telegram Bot API abstraction.
//!
//! This module provides a `BotApi` trait for the messaging platform and an
//! HTTPS implementation (`TelegramClient`).

mod client;
mod types;

pub use client::TelegramClient;
pub use types::*;
