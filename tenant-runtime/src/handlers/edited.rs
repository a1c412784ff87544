//! Edited business messages: diff against the latest archived revision, notify the owner,
//! archive the new revision.

use std::sync::Arc;

use async_trait::async_trait;
use message_diff::{edited_diff, render};
use storage::{ConnectionStore, MessageStore, MessagesQuery};
use tracing::{debug, error, info, instrument, warn};
use wbot_core::{
    BusinessMessage, Handler, HandlerResponse, Result, Update, UpdateKind, WatchError,
};

use super::archive::archived_form;
use super::{format_timestamp, resolve_owner};
use crate::notify::{Notification, Notifier};

pub struct EditedHandler {
    store: Arc<dyn MessageStore>,
    connections: Arc<dyn ConnectionStore>,
    notifier: Arc<dyn Notifier>,
}

impl EditedHandler {
    pub fn new(
        store: Arc<dyn MessageStore>,
        connections: Arc<dyn ConnectionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            connections,
            notifier,
        }
    }

    async fn archive(&self, message: &BusinessMessage) -> Result<()> {
        let snapshot = self.store.save_snapshot(message).await.map_err(|e| {
            error!(
                error = %e,
                chat_id = message.chat.id,
                message_id = message.message_id,
                "Failed to archive edited business message"
            );
            e
        })?;
        debug!(sequence_id = snapshot.sequence_id, "step: EditedHandler archived revision");
        Ok(())
    }

    /// Archives the revision after a failed lookup and hands the lookup error back.
    async fn archive_after_failure(
        &self,
        message: &BusinessMessage,
        err: WatchError,
    ) -> WatchError {
        if let Err(save_err) = self.archive(message).await {
            error!(error = %save_err, "Archiving the edit after a failed lookup also failed");
        }
        err
    }

    fn notification(owner: i64, message: &BusinessMessage, diff_text: &str) -> Notification {
        let chat_name = message.chat.display_name();
        let edited_at = format_timestamp(message.effective_timestamp());
        Notification::new(
            owner,
            format!(
                "Message edited in the chat with {} at {}:\n\n{}",
                chat_name, edited_at, diff_text
            ),
            format!(
                "Message edited in the chat with {} at {}. The changes are too long to show here.",
                chat_name, edited_at
            ),
        )
    }
}

#[async_trait]
impl Handler for EditedHandler {
    #[instrument(skip(self, update))]
    async fn handle(&self, update: &Update) -> Result<HandlerResponse> {
        let UpdateKind::EditedBusinessMessage(message) = &update.kind else {
            return Ok(HandlerResponse::Ignore);
        };
        let message = archived_form(message);

        let owner = match resolve_owner(self.connections.as_ref(), &message.connection_id).await {
            Ok(owner) => owner,
            Err(e) => {
                error!(
                    error = %e,
                    connection_id = %message.connection_id,
                    "Failed to resolve connection owner"
                );
                return Err(self.archive_after_failure(&message, e).await);
            }
        };
        let Some(owner) = owner else {
            warn!(
                connection_id = %message.connection_id,
                message_id = message.message_id,
                "Edit on an unknown business connection, archiving without notification"
            );
            self.archive(&message).await?;
            return Ok(HandlerResponse::Stop);
        };

        let query = MessagesQuery::new(
            message.chat.id,
            vec![message.message_id],
            owner.connection_ids.clone(),
        );
        let previous = match self.store.get_latest(&query).await {
            Ok(mut latest) => latest.pop(),
            Err(e) => {
                error!(
                    error = %e,
                    message_id = message.message_id,
                    "Failed to load previous revision"
                );
                return Err(self.archive_after_failure(&message, e.into()).await);
            }
        };

        let Some(previous) = previous else {
            warn!(
                chat_id = message.chat.id,
                message_id = message.message_id,
                "No archived revision to compare with, archiving edit only"
            );
            self.archive(&message).await?;
            return Ok(HandlerResponse::Stop);
        };

        let diff = edited_diff(&previous.message, &message);
        if diff.is_empty() {
            debug!(message_id = message.message_id, "step: EditedHandler no visible changes");
            self.archive(&message).await?;
            return Ok(HandlerResponse::Stop);
        }

        let notification =
            Self::notification(owner.user_id, &message, &render(&diff.changes, true));
        let notified = self.notifier.notify(&notification).await;

        self.archive(&message).await?;

        if let Err(e) = notified {
            error!(error = %e, owner = owner.user_id, "Failed to send edit notification");
            return Err(e);
        }

        info!(
            owner = owner.user_id,
            chat_id = message.chat.id,
            message_id = message.message_id,
            changes = diff.changes.len(),
            "step: EditedHandler notified owner"
        );
        Ok(HandlerResponse::Stop)
    }
}
