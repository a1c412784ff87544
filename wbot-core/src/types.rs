//! Core types: tenants and capabilities, decoded updates, business messages and snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::media::Media;

/// Tenant (bot) id as assigned by the platform.
pub type TenantId = i64;

/// Capability flags reported by the platform for a bot account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ConnectToBusiness,
    JoinGroups,
    InlineQueries,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ConnectToBusiness => "can_connect_to_business",
            Capability::JoinGroups => "can_join_groups",
            Capability::InlineQueries => "supports_inline_queries",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a bot account as returned by the platform for a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
    pub capabilities: Vec<Capability>,
}

impl BotIdentity {
    /// Returns the required capabilities this identity lacks, in `required` order.
    pub fn missing(&self, required: &[Capability]) -> Vec<Capability> {
        required
            .iter()
            .filter(|c| !self.capabilities.contains(c))
            .copied()
            .collect()
    }
}

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Chat a message belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl ChatInfo {
    /// Display name: first and last name joined, falling back to the username, then the id.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) if !last.is_empty() => format!("{} {}", first, last),
            (Some(first), _) if !first.is_empty() => first.clone(),
            _ => self
                .username
                .clone()
                .unwrap_or_else(|| self.id.to_string()),
        }
    }
}

/// One revision of a message sent through a business connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessMessage {
    pub connection_id: String,
    pub message_id: i32,
    pub chat: ChatInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Sender>,
    /// Unix seconds.
    pub date: i64,
    /// Unix seconds; 0 if never edited.
    #[serde(default)]
    pub edit_date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_group_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
}

impl BusinessMessage {
    /// `edit_date` if the message was edited, else `date`.
    pub fn effective_timestamp(&self) -> i64 {
        if self.edit_date > 0 {
            self.edit_date
        } else {
            self.date
        }
    }
}

/// An archived, immutable revision. `sequence_id` is unique and monotonic store-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub sequence_id: i64,
    pub message: BusinessMessage,
}

/// Messages removed from a chat of a business connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedMessages {
    pub connection_id: String,
    pub chat: ChatInfo,
    pub message_ids: Vec<i32>,
}

/// A business account connected (or disconnected) the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessConnection {
    pub id: String,
    pub owner_user_id: i64,
    pub enabled: bool,
    pub date: i64,
}

/// A message sent directly to the bot (not through a business connection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub message_id: i32,
    pub chat_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Sender>,
    #[serde(default)]
    pub text: String,
}

/// Decoded inbound event for one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    pub kind: UpdateKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    BusinessMessage(BusinessMessage),
    EditedBusinessMessage(BusinessMessage),
    DeletedBusinessMessages(DeletedMessages),
    BusinessConnection(BusinessConnection),
    DirectMessage(DirectMessage),
    /// Update kinds this service does not handle.
    Unsupported,
}

impl Update {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            UpdateKind::BusinessMessage(_) => "business_message",
            UpdateKind::EditedBusinessMessage(_) => "edited_business_message",
            UpdateKind::DeletedBusinessMessages(_) => "deleted_business_messages",
            UpdateKind::BusinessConnection(_) => "business_connection",
            UpdateKind::DirectMessage(_) => "message",
            UpdateKind::Unsupported => "unsupported",
        }
    }

    /// Business connection the update belongs to, if any.
    pub fn connection_id(&self) -> Option<&str> {
        match &self.kind {
            UpdateKind::BusinessMessage(m) | UpdateKind::EditedBusinessMessage(m) => {
                Some(&m.connection_id)
            }
            UpdateKind::DeletedBusinessMessages(d) => Some(&d.connection_id),
            UpdateKind::BusinessConnection(c) => Some(&c.id),
            UpdateKind::DirectMessage(_) | UpdateKind::Unsupported => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_timestamp_prefers_edit_date() {
        let mut msg = BusinessMessage {
            connection_id: "c".to_string(),
            message_id: 1,
            chat: ChatInfo::default(),
            from: None,
            date: 100,
            edit_date: 0,
            media_group_id: None,
            text: String::new(),
            caption: String::new(),
            media: None,
        };
        assert_eq!(msg.effective_timestamp(), 100);
        msg.edit_date = 250;
        assert_eq!(msg.effective_timestamp(), 250);
    }

    #[test]
    fn test_missing_capabilities_keeps_required_order() {
        let identity = BotIdentity {
            id: 1,
            username: "bot".to_string(),
            capabilities: vec![Capability::JoinGroups],
        };
        let missing = identity.missing(&[Capability::ConnectToBusiness, Capability::JoinGroups]);
        assert_eq!(missing, vec![Capability::ConnectToBusiness]);
    }

    #[test]
    fn test_chat_display_name_fallbacks() {
        let chat = ChatInfo {
            id: 7,
            first_name: Some("Ann".to_string()),
            last_name: Some("Lee".to_string()),
            username: None,
        };
        assert_eq!(chat.display_name(), "Ann Lee");
        let chat = ChatInfo {
            id: 7,
            ..ChatInfo::default()
        };
        assert_eq!(chat.display_name(), "7");
    }
}
