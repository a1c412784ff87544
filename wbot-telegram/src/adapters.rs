//! Adapters from teloxide's update model to [`wbot_core`] types.
//!
//! Webhook bodies are parsed as [`teloxide::types::Update`]; the wrappers below map the kinds this
//! service handles. Anything else, including update kinds teloxide could not parse, becomes
//! [`UpdateKind::Unsupported`].

use teloxide::types::{
    BusinessConnection as TgBusinessConnection, BusinessMessagesDeleted, Chat, FileMeta, Message,
    Update as TgUpdate, UpdateKind as TgUpdateKind, User,
};
use wbot_core::{
    AnimationMedia, AudioMedia, BusinessConnection, BusinessMessage, ChatInfo, DeletedMessages,
    DirectMessage, DocumentMedia, Media, PhotoMedia, Sender, StickerMedia, Update, UpdateKind,
    VideoMedia, VideoNoteMedia, VoiceMedia,
};

/// Decodes one webhook body. A decode error is permanent: the payload will never parse.
pub fn decode_update(body: &[u8]) -> Result<Update, serde_json::Error> {
    let update = serde_json::from_slice::<TgUpdate>(body)?;
    Ok(TelegramUpdateWrapper(&update).to_core())
}

/// Wrapper for converting a teloxide User to [`Sender`].
pub struct TelegramUserWrapper<'a>(pub &'a User);

impl TelegramUserWrapper<'_> {
    pub fn to_core(&self) -> Sender {
        Sender {
            id: self.0.id.0 as i64,
            is_bot: self.0.is_bot,
            first_name: self.0.first_name.clone(),
            last_name: self.0.last_name.clone(),
            username: self.0.username.clone(),
        }
    }
}

/// Wrapper for converting a teloxide Chat to [`ChatInfo`].
pub struct TelegramChatWrapper<'a>(pub &'a Chat);

impl TelegramChatWrapper<'_> {
    pub fn to_core(&self) -> ChatInfo {
        ChatInfo {
            id: self.0.id.0,
            first_name: self.0.first_name().map(str::to_string),
            last_name: self.0.last_name().map(str::to_string),
            username: self.0.username().map(str::to_string),
        }
    }
}

fn file_id(file: &FileMeta) -> String {
    file.id.to_string()
}

fn file_size(file: &FileMeta) -> u64 {
    u64::from(file.size)
}

/// Wrapper for converting a teloxide Message to business and direct messages.
pub struct TelegramMessageWrapper<'a>(pub &'a Message);

impl TelegramMessageWrapper<'_> {
    fn sender(&self) -> Option<Sender> {
        self.0.from.as_ref().map(|u| TelegramUserWrapper(u).to_core())
    }

    /// The message's media item. Photos keep their largest size.
    pub fn media(&self) -> Option<Media> {
        let msg = self.0;
        if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
            return Some(Media::Photo(PhotoMedia {
                file_id: file_id(&largest.file),
                file_size: file_size(&largest.file),
                width: largest.width,
                height: largest.height,
            }));
        }
        if let Some(video) = msg.video() {
            return Some(Media::Video(VideoMedia {
                file_id: file_id(&video.file),
                file_size: file_size(&video.file),
                duration: video.duration.seconds(),
            }));
        }
        if let Some(animation) = msg.animation() {
            return Some(Media::Animation(AnimationMedia {
                file_id: file_id(&animation.file),
                file_size: file_size(&animation.file),
                duration: animation.duration.seconds(),
            }));
        }
        if let Some(audio) = msg.audio() {
            return Some(Media::Audio(AudioMedia {
                file_id: file_id(&audio.file),
                file_size: file_size(&audio.file),
                duration: audio.duration.seconds(),
                title: audio.title.clone(),
                performer: audio.performer.clone(),
            }));
        }
        if let Some(voice) = msg.voice() {
            return Some(Media::Voice(VoiceMedia {
                file_id: file_id(&voice.file),
                file_size: file_size(&voice.file),
                duration: voice.duration.seconds(),
            }));
        }
        if let Some(document) = msg.document() {
            return Some(Media::Document(DocumentMedia {
                file_id: file_id(&document.file),
                file_size: file_size(&document.file),
                file_name: document.file_name.clone(),
                mime_type: document.mime_type.as_ref().map(ToString::to_string),
            }));
        }
        if let Some(sticker) = msg.sticker() {
            return Some(Media::Sticker(StickerMedia {
                file_id: file_id(&sticker.file),
                file_size: file_size(&sticker.file),
                emoji: sticker.emoji.clone(),
            }));
        }
        msg.video_note().map(|note| {
            Media::VideoNote(VideoNoteMedia {
                file_id: file_id(&note.file),
                file_size: file_size(&note.file),
                duration: note.duration.seconds(),
                length: note.length,
            })
        })
    }

    /// None when the message did not arrive through a business connection.
    pub fn to_business(&self) -> Option<BusinessMessage> {
        let msg = self.0;
        let connection_id = match &msg.kind {
            teloxide::types::MessageKind::Common(common) => {
                common.business_connection_id.as_ref()?.to_string()
            }
            _ => return None,
        };
        Some(BusinessMessage {
            connection_id,
            message_id: msg.id.0,
            chat: TelegramChatWrapper(&msg.chat).to_core(),
            from: self.sender(),
            date: msg.date.timestamp(),
            edit_date: msg.edit_date().map_or(0, |d| d.timestamp()),
            media_group_id: msg.media_group_id().map(ToString::to_string),
            text: msg.text().unwrap_or_default().to_string(),
            caption: msg.caption().unwrap_or_default().to_string(),
            media: self.media(),
        })
    }

    pub fn to_direct(&self) -> DirectMessage {
        DirectMessage {
            message_id: self.0.id.0,
            chat_id: self.0.chat.id.0,
            from: self.sender(),
            text: self.0.text().unwrap_or_default().to_string(),
        }
    }
}

/// Wrapper for converting teloxide's deleted-messages notice to [`DeletedMessages`].
pub struct TelegramDeletedWrapper<'a>(pub &'a BusinessMessagesDeleted);

impl TelegramDeletedWrapper<'_> {
    pub fn to_core(&self) -> DeletedMessages {
        DeletedMessages {
            connection_id: self.0.business_connection_id.to_string(),
            chat: TelegramChatWrapper(&self.0.chat).to_core(),
            message_ids: self.0.message_ids.iter().map(|id| id.0).collect(),
        }
    }
}

/// Wrapper for converting a teloxide BusinessConnection to [`BusinessConnection`].
pub struct TelegramConnectionWrapper<'a>(pub &'a TgBusinessConnection);

impl TelegramConnectionWrapper<'_> {
    pub fn to_core(&self) -> BusinessConnection {
        BusinessConnection {
            id: self.0.id.to_string(),
            owner_user_id: self.0.user.id.0 as i64,
            enabled: self.0.is_enabled,
            date: self.0.date.timestamp(),
        }
    }
}

/// Wrapper for converting a teloxide Update to [`Update`].
pub struct TelegramUpdateWrapper<'a>(pub &'a TgUpdate);

impl TelegramUpdateWrapper<'_> {
    pub fn to_core(&self) -> Update {
        let kind = match &self.0.kind {
            TgUpdateKind::BusinessMessage(msg) => TelegramMessageWrapper(msg)
                .to_business()
                .map_or(UpdateKind::Unsupported, UpdateKind::BusinessMessage),
            TgUpdateKind::EditedBusinessMessage(msg) => TelegramMessageWrapper(msg)
                .to_business()
                .map_or(UpdateKind::Unsupported, UpdateKind::EditedBusinessMessage),
            TgUpdateKind::DeletedBusinessMessages(deleted) => {
                UpdateKind::DeletedBusinessMessages(TelegramDeletedWrapper(deleted).to_core())
            }
            TgUpdateKind::BusinessConnection(connection) => {
                UpdateKind::BusinessConnection(TelegramConnectionWrapper(connection).to_core())
            }
            TgUpdateKind::Message(msg) => {
                UpdateKind::DirectMessage(TelegramMessageWrapper(msg).to_direct())
            }
            _ => UpdateKind::Unsupported,
        };
        Update {
            update_id: i64::from(self.0.id.0),
            kind,
        }
    }
}
