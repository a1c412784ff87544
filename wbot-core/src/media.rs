//! Media attached to a business message.
//!
//! A message carries at most one media item. [`Media`] is a tagged union with one payload struct
//! per [`MediaKind`]; serde writes the kind into a `kind` field so each variant has a single
//! (de)serialization rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media kinds in precedence order: when a raw message carries several, the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Audio,
    Voice,
    Document,
    Sticker,
    VideoNote,
}

impl MediaKind {
    pub const PRECEDENCE: [MediaKind; 8] = [
        MediaKind::Photo,
        MediaKind::Video,
        MediaKind::Animation,
        MediaKind::Audio,
        MediaKind::Voice,
        MediaKind::Document,
        MediaKind::Sticker,
        MediaKind::VideoNote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Animation => "animation",
            MediaKind::Audio => "audio",
            MediaKind::Voice => "voice",
            MediaKind::Document => "document",
            MediaKind::Sticker => "sticker",
            MediaKind::VideoNote => "video_note",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoMedia {
    pub file_id: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMedia {
    pub file_id: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationMedia {
    pub file_id: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMedia {
    pub file_id: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceMedia {
    pub file_id: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMedia {
    pub file_id: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerMedia {
    pub file_id: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoNoteMedia {
    pub file_id: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub length: u32,
}

/// One media item; the variant is the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Media {
    Photo(PhotoMedia),
    Video(VideoMedia),
    Animation(AnimationMedia),
    Audio(AudioMedia),
    Voice(VoiceMedia),
    Document(DocumentMedia),
    Sticker(StickerMedia),
    VideoNote(VideoNoteMedia),
}

impl Media {
    pub fn kind(&self) -> MediaKind {
        match self {
            Media::Photo(_) => MediaKind::Photo,
            Media::Video(_) => MediaKind::Video,
            Media::Animation(_) => MediaKind::Animation,
            Media::Audio(_) => MediaKind::Audio,
            Media::Voice(_) => MediaKind::Voice,
            Media::Document(_) => MediaKind::Document,
            Media::Sticker(_) => MediaKind::Sticker,
            Media::VideoNote(_) => MediaKind::VideoNote,
        }
    }

    /// Platform reference id of the file (`file_id`).
    pub fn reference_id(&self) -> &str {
        match self {
            Media::Photo(m) => &m.file_id,
            Media::Video(m) => &m.file_id,
            Media::Animation(m) => &m.file_id,
            Media::Audio(m) => &m.file_id,
            Media::Voice(m) => &m.file_id,
            Media::Document(m) => &m.file_id,
            Media::Sticker(m) => &m.file_id,
            Media::VideoNote(m) => &m.file_id,
        }
    }

    pub fn file_size(&self) -> u64 {
        match self {
            Media::Photo(m) => m.file_size,
            Media::Video(m) => m.file_size,
            Media::Animation(m) => m.file_size,
            Media::Audio(m) => m.file_size,
            Media::Voice(m) => m.file_size,
            Media::Document(m) => m.file_size,
            Media::Sticker(m) => m.file_size,
            Media::VideoNote(m) => m.file_size,
        }
    }

    /// Identity view used when comparing two revisions.
    pub fn item(&self) -> MediaItem {
        MediaItem {
            kind: self.kind(),
            reference_id: self.reference_id().to_string(),
            file_size: self.file_size(),
        }
    }
}

/// `(reference-id, kind)` identity of a media item, plus its size for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub reference_id: String,
    pub file_size: u64,
}

impl MediaItem {
    pub fn same_identity(&self, other: &MediaItem) -> bool {
        self.kind == other.kind && self.reference_id == other.reference_id
    }
}
