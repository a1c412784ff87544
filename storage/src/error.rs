//! Storage error types.
//!
//! Used by repository implementations and callers of storage APIs.

use thiserror::Error;
use wbot_core::WatchError;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    /// Store unreachable or timed out after the bounded retry.
    #[error("Transient store error: {0}")]
    Transient(String),
    #[error("Deadline exceeded: {0}")]
    Timeout(&'static str),
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StorageError {
    /// Connectivity-class failures: I/O, pool exhaustion, SQLite busy/locked.
    pub(crate) fn is_transient(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
            sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("5") | Some("6")),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if StorageError::is_transient(&err) {
            StorageError::Transient(err.to_string())
        } else {
            StorageError::Database(err.to_string())
        }
    }
}

impl From<StorageError> for WatchError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Transient(_) | StorageError::Timeout(_) => {
                WatchError::TransientStore(err.to_string())
            }
            StorageError::Database(_) | StorageError::Decode(_) => {
                WatchError::Store(err.to_string())
            }
        }
    }
}
