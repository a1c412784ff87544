//! Snapshot row model.
//!
//! Maps to the `message_snapshots` table. Index columns are copied out of the payload so
//! dedup and pagination never decode JSON; `payload` holds the full revision.

use serde::{Deserialize, Serialize};
use wbot_core::{BusinessMessage, MessageSnapshot};

use crate::error::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SnapshotRecord {
    pub sequence_id: i64,
    pub chat_id: i64,
    pub connection_id: String,
    pub message_id: i64,
    pub date: i64,
    pub edit_date: i64,
    pub media_group_id: Option<String>,
    pub payload: String,
}

impl SnapshotRecord {
    /// Creates the row for `message` under an already allocated sequence id.
    pub fn new(sequence_id: i64, message: &BusinessMessage) -> Result<Self, StorageError> {
        let payload =
            serde_json::to_string(message).map_err(|e| StorageError::Decode(e.to_string()))?;
        Ok(Self {
            sequence_id,
            chat_id: message.chat.id,
            connection_id: message.connection_id.clone(),
            message_id: i64::from(message.message_id),
            date: message.date,
            edit_date: message.edit_date,
            media_group_id: message.media_group_id.clone(),
            payload,
        })
    }

    pub fn into_snapshot(self) -> Result<MessageSnapshot, StorageError> {
        let message: BusinessMessage = serde_json::from_str(&self.payload)
            .map_err(|e| StorageError::Decode(e.to_string()))?;
        Ok(MessageSnapshot {
            sequence_id: self.sequence_id,
            message,
        })
    }
}
