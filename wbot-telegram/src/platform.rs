//! Wraps teloxide::Bot and implements [`wbot_core::PlatformClient`]. Production code talks to the
//! Bot API; tests substitute another PlatformClient impl.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::payloads::SetWebhookSetters;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, ChatId};
use teloxide::{ApiError, RequestError};
use tracing::{debug, instrument};
use wbot_core::{
    BotCommand, BotIdentity, Capability, PlatformClient, PlatformConnector, Result, WatchError,
};

/// Updates requested from the platform for every tenant webhook.
const ALLOWED_UPDATES: [AllowedUpdate; 5] = [
    AllowedUpdate::Message,
    AllowedUpdate::BusinessConnection,
    AllowedUpdate::BusinessMessage,
    AllowedUpdate::EditedBusinessMessage,
    AllowedUpdate::DeletedBusinessMessages,
];

fn platform_error(err: RequestError) -> WatchError {
    WatchError::Platform(err.to_string())
}

/// Thin wrapper around teloxide::Bot for one tenant credential.
pub struct TelegramPlatform {
    bot: teloxide::Bot,
}

impl TelegramPlatform {
    /// Creates a client from an existing teloxide Bot.
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

#[async_trait]
impl PlatformClient for TelegramPlatform {
    #[instrument(skip(self))]
    async fn identify(&self) -> Result<BotIdentity> {
        let me = self.bot.get_me().await.map_err(|e| match e {
            RequestError::Api(ApiError::InvalidToken) => {
                WatchError::InvalidCredential(e.to_string())
            }
            other => platform_error(other),
        })?;

        let mut capabilities = Vec::new();
        if me.can_connect_to_business {
            capabilities.push(Capability::ConnectToBusiness);
        }
        if me.can_join_groups {
            capabilities.push(Capability::JoinGroups);
        }
        if me.supports_inline_queries {
            capabilities.push(Capability::InlineQueries);
        }

        let identity = BotIdentity {
            id: me.user.id.0 as i64,
            username: me.user.username.clone().unwrap_or_default(),
            capabilities,
        };
        debug!(bot_id = identity.id, username = %identity.username, "Identified bot");
        Ok(identity)
    }

    async fn set_webhook(&self, url: &str, secret: &str) -> Result<()> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| WatchError::Validation(format!("Invalid webhook URL {}: {}", url, e)))?;
        self.bot
            .set_webhook(url)
            .secret_token(secret.to_string())
            .allowed_updates(ALLOWED_UPDATES.to_vec())
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<()> {
        self.bot.delete_webhook().await.map_err(platform_error)?;
        Ok(())
    }

    async fn set_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let commands = commands
            .iter()
            .map(|c| teloxide::types::BotCommand::new(c.command.clone(), c.description.clone()));
        self.bot
            .set_my_commands(commands)
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text.to_string())
            .await
            .map_err(platform_error)?;
        Ok(())
    }
}

/// Builds [`TelegramPlatform`] clients, optionally against a self-hosted Bot API server.
#[derive(Debug, Clone, Default)]
pub struct TelegramConnector {
    api_url: Option<reqwest::Url>,
}

impl TelegramConnector {
    pub fn new(api_url: Option<reqwest::Url>) -> Self {
        Self { api_url }
    }
}

impl PlatformConnector for TelegramConnector {
    fn connect(&self, credential: &str) -> Arc<dyn PlatformClient> {
        let bot = teloxide::Bot::new(credential);
        let bot = match &self.api_url {
            Some(url) => bot.set_api_url(url.clone()),
            None => bot,
        };
        Arc::new(TelegramPlatform::new(bot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_applies_api_url() {
        let url = reqwest::Url::parse("http://localhost:8081/").unwrap();
        let bot = teloxide::Bot::new("123:abc").set_api_url(url.clone());
        let platform = TelegramPlatform::new(bot);
        assert_eq!(platform.inner().api_url().as_str(), url.as_str());
    }

    /// **Test: Invalid webhook URL is a validation error, raised before any request.**
    #[tokio::test]
    async fn test_set_webhook_rejects_invalid_url() {
        let platform = TelegramPlatform::new(teloxide::Bot::new("123:abc"));
        let err = platform.set_webhook("not a url", "secret").await.unwrap_err();
        assert!(matches!(err, WatchError::Validation(_)));
    }
}
