//! # wbot-telegram
//!
//! Telegram layer: decodes webhook payloads through teloxide's update model into
//! [`wbot_core::Update`]s, implements [`wbot_core::PlatformClient`] on teloxide, and loads the
//! minimal Telegram config. Handles only Telegram connectivity; no persistence or diff logic.

mod adapters;
mod config;
mod platform;

pub use adapters::{
    decode_update, TelegramChatWrapper, TelegramConnectionWrapper, TelegramDeletedWrapper,
    TelegramMessageWrapper, TelegramUpdateWrapper, TelegramUserWrapper,
};
pub use config::TelegramConfig;
pub use platform::{TelegramConnector, TelegramPlatform};
