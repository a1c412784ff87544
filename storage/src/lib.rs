//! Storage crate: append-only message history and business-connection ownership.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – SnapshotRecord, MessagesQuery, Page / PaginationCursor
//! - [`repository`] – MessageStore and ConnectionStore traits
//! - [`message_repo`] – SqliteMessageStore (SQLite)
//! - [`sqlite_pool`] – SqlitePoolManager

mod error;
mod message_repo;
mod models;
mod repository;
mod sqlite_pool;

pub use error::StorageError;
pub use message_repo::SqliteMessageStore;
pub use models::{MessagesQuery, Page, PaginationCursor, SnapshotRecord};
pub use repository::{ConnectionStore, MessageStore};
pub use sqlite_pool::SqlitePoolManager;
