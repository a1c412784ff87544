//! Change descriptors produced when comparing two revisions.

use serde::{Deserialize, Serialize};
use std::fmt;
use wbot_core::{MediaItem, MediaKind};

/// Text-bearing field of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Text,
    Caption,
}

impl TextField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextField::Text => "text",
            TextField::Caption => "caption",
        }
    }
}

/// Field a change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Text,
    Caption,
    Media,
}

impl From<TextField> for Field {
    fn from(field: TextField) -> Self {
        match field {
            TextField::Text => Field::Text,
            TextField::Caption => Field::Caption,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Changed,
    Added,
    Removed,
    /// Media of the same kind replaced by a different file.
    Updated,
}

/// One human-readable difference between two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    TextChanged {
        field: TextField,
        old: String,
        new: String,
    },
    TextAdded {
        field: TextField,
        new: String,
    },
    TextRemoved {
        field: TextField,
        old: String,
    },
    MediaUpdated {
        media: MediaKind,
    },
    MediaAdded {
        media: MediaKind,
    },
    MediaRemoved {
        media: MediaKind,
    },
}

impl Change {
    pub fn field(&self) -> Field {
        match self {
            Change::TextChanged { field, .. }
            | Change::TextAdded { field, .. }
            | Change::TextRemoved { field, .. } => (*field).into(),
            Change::MediaUpdated { .. }
            | Change::MediaAdded { .. }
            | Change::MediaRemoved { .. } => Field::Media,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::TextChanged { .. } => ChangeKind::Changed,
            Change::TextAdded { .. } | Change::MediaAdded { .. } => ChangeKind::Added,
            Change::TextRemoved { .. } | Change::MediaRemoved { .. } => ChangeKind::Removed,
            Change::MediaUpdated { .. } => ChangeKind::Updated,
        }
    }

    /// Same descriptor with every quoted text passed through `f`.
    pub(crate) fn map_text(&self, f: impl Fn(&str) -> String) -> Change {
        match self {
            Change::TextChanged { field, old, new } => Change::TextChanged {
                field: *field,
                old: f(old),
                new: f(new),
            },
            Change::TextAdded { field, new } => Change::TextAdded {
                field: *field,
                new: f(new),
            },
            Change::TextRemoved { field, old } => Change::TextRemoved {
                field: *field,
                old: f(old),
            },
            other => other.clone(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::TextChanged { field, old, new } => {
                write!(f, "The {} was changed.\nOld: {}\nNew: {}", field.as_str(), old, new)
            }
            Change::TextAdded { field, new } => {
                write!(f, "A {} was added:\n{}", field.as_str(), new)
            }
            Change::TextRemoved { field, old } => {
                write!(f, "The {} was removed:\n{}", field.as_str(), old)
            }
            Change::MediaUpdated { media } => write!(f, "The {} was replaced.", media),
            Change::MediaAdded { media } => write!(f, "A {} was added.", media),
            Change::MediaRemoved { media } => write!(f, "The {} was removed.", media),
        }
    }
}

/// Structured media difference. Both sides set means the file was replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDiff {
    pub added: Option<MediaItem>,
    pub removed: Option<MediaItem>,
}

impl MediaDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_none() && self.removed.is_none()
    }
}

/// Result of comparing two revisions: ordered descriptors plus the media diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditDiff {
    pub changes: Vec<Change>,
    pub media: MediaDiff,
}

impl EditDiff {
    /// No descriptors: the edit is archived but nobody is notified.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
