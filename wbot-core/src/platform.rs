//! Platform abstraction for one bot account.
//!
//! [`PlatformClient`] is transport-agnostic; wbot-telegram implements it via teloxide.
//! [`PlatformConnector`] builds a client from a tenant credential.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::BotIdentity;

/// Entry of the command menu published for a bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl BotCommand {
    pub fn new(command: &str, description: &str) -> Self {
        Self {
            command: command.to_string(),
            description: description.to_string(),
        }
    }
}

/// Remote operations on one bot account.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Validates the credential and returns the bot identity and capability flags.
    /// Fails with `InvalidCredential` when the platform rejects the credential.
    async fn identify(&self) -> Result<BotIdentity>;
    /// Points update delivery at `url`; the platform echoes `secret` in a header on each delivery.
    async fn set_webhook(&self, url: &str, secret: &str) -> Result<()>;
    async fn delete_webhook(&self) -> Result<()>;
    async fn set_commands(&self, commands: &[BotCommand]) -> Result<()>;
    /// Sends a plain-text message to `chat_id`.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;
}

/// Creates platform clients for tenant credentials.
pub trait PlatformConnector: Send + Sync {
    fn connect(&self, credential: &str) -> Arc<dyn PlatformClient>;
}
