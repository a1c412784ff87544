//! Business connection updates: record ownership and tell the owner when the state changes.

use std::sync::Arc;

use async_trait::async_trait;
use storage::ConnectionStore;
use tracing::{debug, info, instrument};
use wbot_core::{Handler, HandlerResponse, Result, Update, UpdateKind};

use crate::notify::{Notification, Notifier};

const CONNECTED_TEXT: &str = "The bot is connected to your business account. \
Edited and deleted messages from your chats will be reported here.";
const DISCONNECTED_TEXT: &str = "The bot was disconnected from your business account.";

pub struct ConnectionHandler {
    connections: Arc<dyn ConnectionStore>,
    notifier: Arc<dyn Notifier>,
}

impl ConnectionHandler {
    pub fn new(connections: Arc<dyn ConnectionStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            connections,
            notifier,
        }
    }
}

#[async_trait]
impl Handler for ConnectionHandler {
    #[instrument(skip(self, update))]
    async fn handle(&self, update: &Update) -> Result<HandlerResponse> {
        let UpdateKind::BusinessConnection(connection) = &update.kind else {
            return Ok(HandlerResponse::Ignore);
        };

        let previous = self.connections.connection(&connection.id).await?;
        self.connections.upsert_connection(connection).await?;

        let changed = previous.map_or(true, |p| {
            p.enabled != connection.enabled || p.owner_user_id != connection.owner_user_id
        });
        if !changed {
            debug!(connection_id = %connection.id, "step: ConnectionHandler state unchanged");
            return Ok(HandlerResponse::Stop);
        }

        let text = if connection.enabled {
            CONNECTED_TEXT
        } else {
            DISCONNECTED_TEXT
        };
        self.notifier
            .notify(&Notification::new(
                connection.owner_user_id,
                text.to_string(),
                text.to_string(),
            ))
            .await?;

        info!(
            connection_id = %connection.id,
            owner = connection.owner_user_id,
            enabled = connection.enabled,
            "step: ConnectionHandler recorded connection"
        );
        Ok(HandlerResponse::Stop)
    }
}
