use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Replacement text for soft-deleted messages. The original content is
/// overwritten in storage and is not recoverable.
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";

/// Resolved reply context attached to a formatted message.
#[derive(Debug, Clone, Serialize)]
pub struct ReplySnippet {
    pub id: Uuid,
    pub username: String,
    pub content: String,
}

/// A message as it crosses the service boundary: author resolved, reply
/// context resolved, deleted content masked.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub author_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub content: String,
    pub is_deleted: bool,
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
    pub reply_to: Option<ReplySnippet>,
}

/// The one place deleted content is masked. Every formatting path goes
/// through here so callers cannot leak the original text.
pub fn display_content(content: &str, is_deleted: bool) -> String {
    if is_deleted {
        DELETED_PLACEHOLDER.to_string()
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_content_is_masked() {
        assert_eq!(display_content("secret", true), DELETED_PLACEHOLDER);
    }

    #[test]
    fn live_content_passes_through() {
        assert_eq!(display_content("hello", false), "hello");
    }

    #[test]
    fn record_serializes_snake_case() {
        let rec = MessageRecord {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            username: "bob".into(),
            avatar_url: None,
            content: display_content("gone", true),
            is_deleted: true,
            is_read: false,
            timestamp: Utc::now(),
            reply_to: None,
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["content"], DELETED_PLACEHOLDER);
        assert_eq!(v["is_deleted"], true);
        assert!(v["reply_to"].is_null());
    }
}
