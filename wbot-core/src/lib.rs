//! # wbot-core
//!
//! Core types and traits for the business-message history watcher: tenants and capabilities,
//! decoded platform [`Update`]s, archived [`MessageSnapshot`]s, the [`Media`] tagged union,
//! the [`PlatformClient`] and [`Handler`] seams, error taxonomy and tracing initialization.
//! Transport-agnostic; used by storage, message-diff, wbot-telegram and tenant-runtime.

pub mod error;
pub mod handler;
pub mod logger;
pub mod media;
pub mod platform;
pub mod types;

pub use error::{Result, WatchError};
pub use handler::{Handler, HandlerResponse};
pub use logger::init_tracing;
pub use media::{
    AnimationMedia, AudioMedia, DocumentMedia, Media, MediaItem, MediaKind, PhotoMedia,
    StickerMedia, VideoMedia, VideoNoteMedia, VoiceMedia,
};
pub use platform::{BotCommand, PlatformClient, PlatformConnector};
pub use types::{
    BotIdentity, BusinessConnection, BusinessMessage, Capability, ChatInfo, DeletedMessages,
    DirectMessage, MessageSnapshot, Sender, TenantId, Update, UpdateKind,
};
