//! Outbound event vocabulary.
//!
//! Every server-to-client frame is one JSON object with a `type` tag and the
//! event fields inlined, e.g.
//!
//! ```json
//! {"type":"user_typing","conversation_id":"…","user_id":"…"}
//! ```
//!
//! The enum is the single source of truth for payload shapes; handlers never
//! build frames by hand.

use crate::models::MessageRecord;
use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The requested conversation is resolved; sent to the joining
    /// connection only.
    ConversationJoined { conversation_id: Uuid },

    /// Backlog for a just-joined conversation, oldest first.
    LoadHistory { messages: Vec<MessageRecord> },

    /// Full message for everyone viewing the conversation.
    ReceiveMessage(MessageRecord),

    /// Sidebar update for one participant's personal channel. `is_own`
    /// distinguishes "increment unread" from "just reorder".
    NewMessageNotification {
        conversation_id: Uuid,
        sender_id: Uuid,
        message: String,
        is_own: bool,
    },

    /// Soft-deleted message, already reformatted with the placeholder.
    MessageDeleted(MessageRecord),

    MessagesRead {
        conversation_id: Uuid,
        reader_id: Uuid,
    },

    UserTyping {
        conversation_id: Uuid,
        user_id: Uuid,
    },

    UserStopTyping {
        conversation_id: Uuid,
        user_id: Uuid,
    },

    UserStatusChange {
        user_id: Uuid,
        is_online: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen: Option<DateTime<Utc>>,
    },

    /// Profile fields changed; bio is nulled when the user is private.
    UserUpdate {
        user_id: Uuid,
        username: String,
        avatar_url: Option<String>,
        is_private: bool,
        bio: Option<String>,
    },

    /// Per-action failure, reported to the acting connection only.
    Error { message: String },
}

impl ServerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ConversationJoined { .. } => "conversation_joined",
            Self::LoadHistory { .. } => "load_history",
            Self::ReceiveMessage(_) => "receive_message",
            Self::NewMessageNotification { .. } => "new_message_notification",
            Self::MessageDeleted(_) => "message_deleted",
            Self::MessagesRead { .. } => "messages_read",
            Self::UserTyping { .. } => "user_typing",
            Self::UserStopTyping { .. } => "user_stop_typing",
            Self::UserStatusChange { .. } => "user_status_change",
            Self::UserUpdate { .. } => "user_update",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Render as a websocket text frame. Serialization of these shapes
    /// cannot fail; the fallback frame keeps the send path infallible.
    pub fn to_message(&self) -> Message {
        match self.to_json() {
            Ok(json) => Message::Text(json),
            Err(e) => {
                tracing::error!(event = self.event_type(), error = %e, "event serialization failed");
                Message::Text(format!(
                    r#"{{"type":"error","message":"serialization failure in {}"}}"#,
                    self.event_type()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReplySnippet, DELETED_PLACEHOLDER};

    fn record() -> MessageRecord {
        MessageRecord {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            username: "ada".into(),
            avatar_url: None,
            content: "hello".into(),
            is_deleted: false,
            is_read: false,
            timestamp: Utc::now(),
            reply_to: Some(ReplySnippet {
                id: Uuid::new_v4(),
                username: "bob".into(),
                content: DELETED_PLACEHOLDER.into(),
            }),
        }
    }

    #[test]
    fn frames_carry_the_type_tag() {
        let conv = Uuid::new_v4();
        let user = Uuid::new_v4();
        let event = ServerEvent::UserTyping {
            conversation_id: conv,
            user_id: user,
        };
        let v: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "user_typing");
        assert_eq!(v["conversation_id"], conv.to_string());
        assert_eq!(v["user_id"], user.to_string());
    }

    #[test]
    fn message_record_fields_are_inlined() {
        let rec = record();
        let id = rec.id;
        let event = ServerEvent::ReceiveMessage(rec);
        let v: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "receive_message");
        assert_eq!(v["id"], id.to_string());
        assert_eq!(v["content"], "hello");
        assert_eq!(v["reply_to"]["content"], DELETED_PLACEHOLDER);
    }

    #[test]
    fn offline_status_includes_last_seen() {
        let seen = Utc::now();
        let event = ServerEvent::UserStatusChange {
            user_id: Uuid::new_v4(),
            is_online: false,
            last_seen: Some(seen),
        };
        let v: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(v["is_online"], false);
        assert!(v["last_seen"].is_string());
    }

    #[test]
    fn online_status_omits_last_seen() {
        let event = ServerEvent::UserStatusChange {
            user_id: Uuid::new_v4(),
            is_online: true,
            last_seen: None,
        };
        let v: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert!(v.get("last_seen").is_none());
    }

    #[test]
    fn every_variant_reports_a_unique_type() {
        let rec = record();
        let events = vec![
            ServerEvent::ConversationJoined {
                conversation_id: Uuid::new_v4(),
            },
            ServerEvent::LoadHistory { messages: vec![] },
            ServerEvent::ReceiveMessage(rec.clone()),
            ServerEvent::NewMessageNotification {
                conversation_id: Uuid::new_v4(),
                sender_id: Uuid::new_v4(),
                message: "hi".into(),
                is_own: false,
            },
            ServerEvent::MessageDeleted(rec),
            ServerEvent::MessagesRead {
                conversation_id: Uuid::new_v4(),
                reader_id: Uuid::new_v4(),
            },
            ServerEvent::UserTyping {
                conversation_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            },
            ServerEvent::UserStopTyping {
                conversation_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            },
            ServerEvent::UserStatusChange {
                user_id: Uuid::new_v4(),
                is_online: true,
                last_seen: None,
            },
            ServerEvent::UserUpdate {
                user_id: Uuid::new_v4(),
                username: "ada".into(),
                avatar_url: None,
                is_private: false,
                bio: None,
            },
            ServerEvent::Error {
                message: "nope".into(),
            },
        ];
        let types: std::collections::HashSet<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(types.len(), events.len());
        // the serialized tag always matches event_type()
        for event in &events {
            let v: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
            assert_eq!(v["type"], event.event_type());
        }
    }
}
