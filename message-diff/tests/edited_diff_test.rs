//! Integration tests for [`message_diff::edited_diff`] across combined text, caption and media edits.

use message_diff::{edited_diff, render, Change, ChangeKind, Field, TextField};
use wbot_core::{AudioMedia, BusinessMessage, ChatInfo, Media, MediaKind};

fn revision(text: &str, caption: &str, media: Option<Media>) -> BusinessMessage {
    BusinessMessage {
        connection_id: "conn".to_string(),
        message_id: 42,
        chat: ChatInfo::default(),
        from: None,
        date: 100,
        edit_date: 0,
        media_group_id: None,
        text: text.to_string(),
        caption: caption.to_string(),
        media,
    }
}

fn audio(file_id: &str) -> Media {
    Media::Audio(AudioMedia {
        file_id: file_id.to_string(),
        file_size: 2048,
        duration: 30,
        title: None,
        performer: None,
    })
}

/// **Test: Changes are ordered text, caption, media.**
///
/// **Setup:** Old has caption "a" and audio A; new has caption "b" and no media.
/// **Action:** `edited_diff(old, new)`.
/// **Expected:** Caption Changed then audio Removed; media diff holds only the removed item.
#[test]
fn test_caption_change_and_media_removal() {
    let old = revision("", "a", Some(audio("A")));
    let new = revision("", "b", None);

    let diff = edited_diff(&old, &new);

    let shape: Vec<(Field, ChangeKind)> =
        diff.changes.iter().map(|c| (c.field(), c.kind())).collect();
    assert_eq!(
        shape,
        vec![(Field::Caption, ChangeKind::Changed), (Field::Media, ChangeKind::Removed)]
    );
    assert_eq!(diff.media.removed.as_ref().map(|m| m.kind), Some(MediaKind::Audio));
    assert!(diff.media.added.is_none());
}

/// **Test: Rendered diff reads as plain English.**
///
/// **Setup:** Text changed from "hello" to "hello world".
/// **Action:** `render(&diff.changes, true)`.
/// **Expected:** Old and new values quoted on separate lines.
#[test]
fn test_render_text_change() {
    let diff = edited_diff(&revision("hello", "", None), &revision("hello world", "", None));

    assert_eq!(
        diff.changes,
        vec![Change::TextChanged {
            field: TextField::Text,
            old: "hello".to_string(),
            new: "hello world".to_string(),
        }]
    );
    assert_eq!(
        render(&diff.changes, true),
        "The text was changed.\nOld: hello\nNew: hello world"
    );
}
