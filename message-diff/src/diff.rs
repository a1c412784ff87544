//! Revision comparison.

use tracing::debug;
use wbot_core::{BusinessMessage, Media, MediaItem};

use crate::change::{Change, EditDiff, MediaDiff, TextField};

/// Compares one text field. `counterpart_new` is the new value of the other field:
/// a removal is not reported when the removed text re-appears there verbatim.
fn diff_field(field: TextField, old: &str, new: &str, counterpart_new: &str) -> Option<Change> {
    match (old.is_empty(), new.is_empty()) {
        (false, false) if old != new => Some(Change::TextChanged {
            field,
            old: old.to_string(),
            new: new.to_string(),
        }),
        (true, false) => Some(Change::TextAdded {
            field,
            new: new.to_string(),
        }),
        (false, true) if old != counterpart_new => Some(Change::TextRemoved {
            field,
            old: old.to_string(),
        }),
        _ => None,
    }
}

/// Identity comparison of the media items of two revisions. An empty reference id counts as absent.
pub fn compare_media(old: Option<&Media>, new: Option<&Media>) -> MediaDiff {
    let present = |media: Option<&Media>| -> Option<MediaItem> {
        media
            .map(Media::item)
            .filter(|item| !item.reference_id.is_empty())
    };

    let old = present(old);
    let new = present(new);

    match (old, new) {
        (Some(old), Some(new)) if old.same_identity(&new) => MediaDiff::default(),
        (removed, added) => MediaDiff { added, removed },
    }
}

fn media_changes(diff: &MediaDiff) -> Vec<Change> {
    match (&diff.removed, &diff.added) {
        (Some(removed), Some(added)) if removed.kind == added.kind => {
            vec![Change::MediaUpdated { media: added.kind }]
        }
        (removed, added) => {
            let mut changes = Vec::new();
            if let Some(removed) = removed {
                changes.push(Change::MediaRemoved {
                    media: removed.kind,
                });
            }
            if let Some(added) = added {
                changes.push(Change::MediaAdded { media: added.kind });
            }
            changes
        }
    }
}

/// Diff of `old` → `new`: text changes, then caption changes, then media changes.
pub fn edited_diff(old: &BusinessMessage, new: &BusinessMessage) -> EditDiff {
    let mut changes = Vec::new();

    changes.extend(diff_field(TextField::Text, &old.text, &new.text, &new.caption));

    // A caption that merely carries over the old text is not a new caption.
    if !(old.caption.is_empty() && new.caption == old.text) {
        changes.extend(diff_field(
            TextField::Caption,
            &old.caption,
            &new.caption,
            &new.text,
        ));
    }

    let media = compare_media(old.media.as_ref(), new.media.as_ref());
    changes.extend(media_changes(&media));

    debug!(
        message_id = new.message_id,
        changes = changes.len(),
        media_changed = !media.is_empty(),
        "Computed edit diff"
    );

    EditDiff { changes, media }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{ChangeKind, Field};
    use wbot_core::{ChatInfo, DocumentMedia, PhotoMedia, VideoMedia};

    fn message(text: &str, caption: &str, media: Option<Media>) -> BusinessMessage {
        BusinessMessage {
            connection_id: "conn".to_string(),
            message_id: 1,
            chat: ChatInfo::default(),
            from: None,
            date: 10,
            edit_date: 0,
            media_group_id: None,
            text: text.to_string(),
            caption: caption.to_string(),
            media,
        }
    }

    fn photo(file_id: &str) -> Media {
        Media::Photo(PhotoMedia {
            file_id: file_id.to_string(),
            file_size: 1,
            width: 10,
            height: 10,
        })
    }

    fn video(file_id: &str) -> Media {
        Media::Video(VideoMedia {
            file_id: file_id.to_string(),
            file_size: 1,
            duration: 3,
        })
    }

    #[test]
    fn test_caption_added_is_only_change() {
        let old = message("hi", "", None);
        let new = message("hi", "note", None);

        let diff = edited_diff(&old, &new);

        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].kind(), ChangeKind::Added);
        assert_eq!(diff.changes[0].field(), Field::Caption);
        assert!(diff.media.is_empty());
    }

    #[test]
    fn test_text_changed() {
        let diff = edited_diff(&message("hello", "", None), &message("hello!", "", None));
        assert_eq!(
            diff.changes,
            vec![Change::TextChanged {
                field: TextField::Text,
                old: "hello".to_string(),
                new: "hello!".to_string(),
            }]
        );
    }

    #[test]
    fn test_identical_revisions_have_no_changes() {
        let old = message("same", "cap", Some(photo("X")));
        let diff = edited_diff(&old, &old.clone());
        assert!(diff.is_empty());
        assert!(diff.media.is_empty());
    }

    #[test]
    fn test_text_moved_to_caption_is_not_reported() {
        let old = message("moved", "", None);
        let new = message("", "moved", Some(photo("P")));

        let diff = edited_diff(&old, &new);

        assert_eq!(diff.changes, vec![Change::MediaAdded { media: wbot_core::MediaKind::Photo }]);
    }

    #[test]
    fn test_text_and_caption_removed() {
        let diff = edited_diff(&message("a", "", None), &message("", "", None));
        assert_eq!(
            diff.changes,
            vec![Change::TextRemoved {
                field: TextField::Text,
                old: "a".to_string(),
            }]
        );

        let diff = edited_diff(
            &message("", "c", Some(photo("P"))),
            &message("", "", Some(photo("P"))),
        );
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].field(), Field::Caption);
        assert_eq!(diff.changes[0].kind(), ChangeKind::Removed);
    }

    #[test]
    fn test_same_photo_yields_empty_media_diff() {
        let diff = compare_media(Some(&photo("X")), Some(&photo("X")));
        assert!(diff.is_empty());
    }

    #[test]
    fn test_same_kind_new_file_is_update() {
        let diff = edited_diff(
            &message("", "", Some(photo("A"))),
            &message("", "", Some(photo("B"))),
        );
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].kind(), ChangeKind::Updated);
        assert_eq!(diff.media.removed.as_ref().unwrap().reference_id, "A");
        assert_eq!(diff.media.added.as_ref().unwrap().reference_id, "B");
    }

    #[test]
    fn test_different_kind_is_removed_then_added() {
        let diff = edited_diff(
            &message("", "", Some(photo("A"))),
            &message("", "", Some(video("A"))),
        );
        assert_eq!(
            diff.changes,
            vec![
                Change::MediaRemoved { media: wbot_core::MediaKind::Photo },
                Change::MediaAdded { media: wbot_core::MediaKind::Video },
            ]
        );
    }

    #[test]
    fn test_empty_reference_id_counts_as_absent() {
        let blank = Media::Document(DocumentMedia {
            file_id: String::new(),
            file_size: 0,
            file_name: None,
            mime_type: None,
        });
        assert!(compare_media(Some(&blank), None).is_empty());

        let diff = compare_media(Some(&blank), Some(&photo("P")));
        assert!(diff.removed.is_none());
        assert_eq!(diff.added.unwrap().reference_id, "P");
    }
}
