//! Storage models: snapshot rows, history queries and pagination.

mod message_query;
mod snapshot_record;

pub use message_query::{MessagesQuery, Page, PaginationCursor};
pub use snapshot_record::SnapshotRecord;
