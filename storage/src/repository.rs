use async_trait::async_trait;
use wbot_core::{BusinessConnection, BusinessMessage, MessageSnapshot};

use crate::error::StorageError;
use crate::models::{MessagesQuery, Page};

/// Append-only history of message revisions.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Archives `message` as a new snapshot under the next global sequence id.
    async fn save_snapshot(
        &self,
        message: &BusinessMessage,
    ) -> Result<MessageSnapshot, StorageError>;

    /// One snapshot per requested message id (the latest revision), ordered by message id.
    async fn get_latest(
        &self,
        query: &MessagesQuery,
    ) -> Result<Vec<MessageSnapshot>, StorageError> {
        let unpaged = MessagesQuery {
            offset: 0,
            limit: 0,
            ..query.clone()
        };
        Ok(self.list_latest(&unpaged).await?.items)
    }

    /// Latest revisions, windowed by `query.offset` / `query.limit` over distinct message ids.
    async fn list_latest(
        &self,
        query: &MessagesQuery,
    ) -> Result<Page<MessageSnapshot>, StorageError>;

    /// Every revision of the requested ids, ordered by (message id asc, date desc, edit date desc).
    async fn get_with_edits(
        &self,
        query: &MessagesQuery,
    ) -> Result<Vec<MessageSnapshot>, StorageError>;
}

/// Ownership of business connections.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn upsert_connection(&self, connection: &BusinessConnection) -> Result<(), StorageError>;
    async fn connection(&self, id: &str) -> Result<Option<BusinessConnection>, StorageError>;
    /// Every connection id the owner ever had, enabled or not.
    async fn connection_ids_for_owner(
        &self,
        owner_user_id: i64,
    ) -> Result<Vec<String>, StorageError>;
}
