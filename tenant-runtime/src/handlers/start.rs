//! Answers `/start` sent directly to the bot.

use async_trait::async_trait;
use tracing::debug;
use wbot_core::{Handler, HandlerResponse, Result, Update, UpdateKind};

pub const STATUS_TEXT: &str = "This bot keeps a history of your business chats and tells you \
when a message is edited or deleted.\n\nTo start, open Settings > Telegram Business > Chatbots \
and add this bot.";

fn is_start_command(text: &str) -> bool {
    let Some(command) = text.split_whitespace().next() else {
        return false;
    };
    command == "/start" || command.starts_with("/start@")
}

/// Replies to `/start` with [`STATUS_TEXT`]; ignores every other update.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartHandler;

#[async_trait]
impl Handler for StartHandler {
    async fn handle(&self, update: &Update) -> Result<HandlerResponse> {
        match &update.kind {
            UpdateKind::DirectMessage(message) if is_start_command(&message.text) => {
                debug!(chat_id = message.chat_id, "step: StartHandler replying with status");
                Ok(HandlerResponse::Reply(STATUS_TEXT.to_string()))
            }
            _ => Ok(HandlerResponse::Ignore),
        }
    }
}
