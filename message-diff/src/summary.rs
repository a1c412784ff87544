//! Plain-text rendering of diffs and deleted messages.

use wbot_core::BusinessMessage;

use crate::change::Change;

/// Longest quoted text in a notification, in characters.
pub const MAX_QUOTED_TEXT_LEN: usize = 256;

/// Flattens newlines and cuts `text` to `max_len` characters, the last three being `...`.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    truncate_with(&text.replace('\n', " "), max_len, "...")
}

/// Cuts `text` to `max_len` characters, replacing the tail with `end` when it is too long.
/// Newlines are kept.
pub fn truncate_with(text: &str, max_len: usize, end: &str) -> String {
    if max_len == 0 {
        return String::new();
    }
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(end.chars().count());
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(end);
    cut
}

/// Joins descriptors with blank lines; with `truncate`, quoted texts are cut to [`MAX_QUOTED_TEXT_LEN`].
pub fn render(changes: &[Change], truncate: bool) -> String {
    changes
        .iter()
        .map(|change| {
            if truncate {
                change
                    .map_text(|text| truncate_text(text, MAX_QUOTED_TEXT_LEN))
                    .to_string()
            } else {
                change.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One deleted message: its text (or caption) and media kind.
pub fn summarize_deleted(message: &BusinessMessage) -> String {
    let mut lines = Vec::new();

    let text = if !message.text.is_empty() {
        &message.text
    } else {
        &message.caption
    };
    if !text.is_empty() {
        lines.push(format!("Text: {}", truncate_text(text, MAX_QUOTED_TEXT_LEN)));
    }
    if let Some(media) = &message.media {
        lines.push(format!("Media: {}", media.kind()));
    }

    if lines.is_empty() {
        return "Message without text or media".to_string();
    }
    lines.join("\n")
}

/// Notification body for messages deleted in the chat named `chat_name`.
pub fn summarize_deleted_batch(messages: &[BusinessMessage], chat_name: &str) -> String {
    match messages {
        [] => format!("Messages were deleted in the chat with {}", chat_name),
        [single] => format!(
            "A message was deleted in the chat with {}:\n{}",
            chat_name,
            summarize_deleted(single)
        ),
        many => {
            let items = many
                .iter()
                .enumerate()
                .map(|(i, message)| format!("{}. {}", i + 1, summarize_deleted(message)))
                .collect::<Vec<_>>()
                .join("\n\n");
            format!(
                "{} messages were deleted in the chat with {}:\n\n{}",
                many.len(),
                chat_name,
                items
            )
        }
    }
}
