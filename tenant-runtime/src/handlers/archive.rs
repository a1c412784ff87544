//! Archives every new business message.

use std::sync::Arc;

use async_trait::async_trait;
use message_diff::truncate_with;
use storage::MessageStore;
use tracing::{error, info, instrument};
use wbot_core::{BusinessMessage, Handler, HandlerResponse, Result, Update, UpdateKind};

/// Longest text or caption kept in the archive, in characters.
pub const MAX_ARCHIVED_TEXT_LEN: usize = 5120;

/// Copy of `message` with text and caption cut to [`MAX_ARCHIVED_TEXT_LEN`].
pub(crate) fn archived_form(message: &BusinessMessage) -> BusinessMessage {
    BusinessMessage {
        text: truncate_with(&message.text, MAX_ARCHIVED_TEXT_LEN, "..."),
        caption: truncate_with(&message.caption, MAX_ARCHIVED_TEXT_LEN, "..."),
        ..message.clone()
    }
}

/// Saves each new business message as a snapshot; ignores every other update.
#[derive(Clone)]
pub struct ArchiveHandler {
    store: Arc<dyn MessageStore>,
}

impl ArchiveHandler {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for ArchiveHandler {
    #[instrument(skip(self, update))]
    async fn handle(&self, update: &Update) -> Result<HandlerResponse> {
        let UpdateKind::BusinessMessage(message) = &update.kind else {
            return Ok(HandlerResponse::Ignore);
        };

        let snapshot = self
            .store
            .save_snapshot(&archived_form(message))
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    chat_id = message.chat.id,
                    message_id = message.message_id,
                    "Failed to archive business message"
                );
                e
            })?;

        info!(
            chat_id = message.chat.id,
            message_id = message.message_id,
            sequence_id = snapshot.sequence_id,
            "step: ArchiveHandler saved snapshot"
        );
        Ok(HandlerResponse::Stop)
    }
}
