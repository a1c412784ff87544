//! Query parameters for history reads and the pagination cursor of a page.
//!
//! Used by MessageStore::get_latest / list_latest / get_with_edits.

use serde::{Deserialize, Serialize};

/// Selects revisions of `message_ids` in `chat_id` across `connection_ids`.
/// Empty `message_ids` or `connection_ids` match nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesQuery {
    pub chat_id: i64,
    pub message_ids: Vec<i32>,
    pub connection_ids: Vec<String>,
    /// Number of distinct messages to skip.
    pub offset: u32,
    /// Page size; 0 means no limit.
    pub limit: u32,
}

impl MessagesQuery {
    pub fn new(chat_id: i64, message_ids: Vec<i32>, connection_ids: Vec<String>) -> Self {
        Self {
            chat_id,
            message_ids,
            connection_ids,
            offset: 0,
            limit: 0,
        }
    }

    pub fn with_page(mut self, offset: u32, limit: u32) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub(crate) fn matches_nothing(&self) -> bool {
        self.message_ids.is_empty() || self.connection_ids.is_empty()
    }
}

/// Position of one page within the deduplicated message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationCursor {
    pub offset: u32,
    pub limit: u32,
    /// More rows exist after this page.
    pub forward: bool,
    /// Rows exist before this page.
    pub backward: bool,
}

/// One page of results plus its cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: PaginationCursor,
}

impl<T> Page<T> {
    /// Builds a page from rows fetched with `LIMIT limit + 1`: the extra row only signals
    /// that a next page exists and is trimmed.
    pub fn from_overfetched(mut rows: Vec<T>, offset: u32, limit: u32) -> Self {
        let mut forward = false;
        if limit > 0 && rows.len() > limit as usize {
            rows.truncate(limit as usize);
            forward = true;
        }
        Self {
            items: rows,
            cursor: PaginationCursor {
                offset,
                limit,
                forward,
                backward: offset > 0,
            },
        }
    }
}
