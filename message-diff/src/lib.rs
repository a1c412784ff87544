//! # message-diff
//!
//! Compares two revisions of the same business message: text and caption changes plus a media
//! diff keyed by `(reference id, kind)`. Also renders change lists and deleted-message summaries
//! as plain text for owner notifications.

mod change;
mod diff;
mod summary;

pub use change::{Change, ChangeKind, EditDiff, Field, MediaDiff, TextField};
pub use diff::{compare_media, edited_diff};
pub use summary::{
    render, summarize_deleted, summarize_deleted_batch, truncate_text, truncate_with,
    MAX_QUOTED_TEXT_LEN,
};
