//! Deleted business messages: summarize the latest archived revisions for the owner.

use std::sync::Arc;

use async_trait::async_trait;
use message_diff::{summarize_deleted_batch, truncate_with};
use storage::{ConnectionStore, MessageStore, MessagesQuery};
use tracing::{info, instrument, warn};
use wbot_core::{BusinessMessage, Handler, HandlerResponse, Result, Update, UpdateKind};

use super::resolve_owner;
use crate::notify::{Notification, Notifier, MAX_MESSAGE_LEN};

/// Deleted messages summarized per notification.
pub const DELETED_PAGE_SIZE: u32 = 8;

const OVERFLOW_END: &str = "\n\n[The list is too long to show in full.]";

pub struct DeletedHandler {
    store: Arc<dyn MessageStore>,
    connections: Arc<dyn ConnectionStore>,
    notifier: Arc<dyn Notifier>,
}

impl DeletedHandler {
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
}

#[async_trait]
impl Handler for DeletedHandler {
    #[instrument(skip(self, update))]
    async fn handle(&self, update: &Update) -> Result<HandlerResponse> {
        let UpdateKind::DeletedBusinessMessages(deleted) = &update.kind else {
            return Ok(HandlerResponse::Ignore);
        };

        let Some(owner) = resolve_owner(self.connections.as_ref(), &deleted.connection_id).await?
        else {
            warn!(
                connection_id = %deleted.connection_id,
                "Deletion on an unknown business connection"
            );
            return Ok(HandlerResponse::Stop);
        };

        let query = MessagesQuery::new(
            deleted.chat.id,
            deleted.message_ids.clone(),
            owner.connection_ids,
        )
        .with_page(0, DELETED_PAGE_SIZE);
        let page = self.store.list_latest(&query).await?;

        if page.items.is_empty() {
            warn!(
                chat_id = deleted.chat.id,
                message_ids = ?deleted.message_ids,
                "No archived revisions for deleted messages"
            );
            return Ok(HandlerResponse::Stop);
        }

        let shown = page.items.len();
        let messages: Vec<BusinessMessage> =
            page.items.into_iter().map(|snapshot| snapshot.message).collect();
        let mut text = summarize_deleted_batch(&messages, &deleted.chat.display_name());
        if page.cursor.forward {
            text.push_str(&format!("\n\nOnly the first {} are shown.", shown));
        }
        let text = truncate_with(&text, MAX_MESSAGE_LEN, OVERFLOW_END);

        self.notifier
            .notify(&Notification::new(owner.user_id, text.clone(), text))
            .await?;

        info!(
            owner = owner.user_id,
            chat_id = deleted.chat.id,
            shown,
            more = page.cursor.forward,
            "step: DeletedHandler notified owner"
        );
        Ok(HandlerResponse::Stop)
    }
}
