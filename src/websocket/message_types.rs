use serde::Deserialize;
use uuid::Uuid;

/// Every event a client may send over an established connection. Unknown
/// types fail to parse and are dropped by the socket loop.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinConversation {
        recipient_id: Uuid,
    },
    SendMessage {
        conversation_id: Uuid,
        message: String,
        recipient_id: Uuid,
        #[serde(default)]
        reply_to_id: Option<Uuid>,
    },
    DeleteMessage {
        conversation_id: Uuid,
        message_id: Uuid,
    },
    MarkAsRead {
        conversation_id: Uuid,
        recipient_id: Uuid,
    },
    Typing {
        conversation_id: Uuid,
        recipient_id: Uuid,
    },
    StopTyping {
        conversation_id: Uuid,
        recipient_id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_event_kind() {
        let conv = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let msg = Uuid::new_v4();

        let cases = [
            format!(r#"{{"type":"join_conversation","recipient_id":"{peer}"}}"#),
            format!(
                r#"{{"type":"send_message","conversation_id":"{conv}","message":"hi","recipient_id":"{peer}"}}"#
            ),
            format!(
                r#"{{"type":"delete_message","conversation_id":"{conv}","message_id":"{msg}"}}"#
            ),
            format!(
                r#"{{"type":"mark_as_read","conversation_id":"{conv}","recipient_id":"{peer}"}}"#
            ),
            format!(r#"{{"type":"typing","conversation_id":"{conv}","recipient_id":"{peer}"}}"#),
            format!(
                r#"{{"type":"stop_typing","conversation_id":"{conv}","recipient_id":"{peer}"}}"#
            ),
        ];
        for case in &cases {
            assert!(
                serde_json::from_str::<ClientEvent>(case).is_ok(),
                "failed to parse {case}"
            );
        }
    }

    #[test]
    fn reply_to_is_optional() {
        let conv = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let reply = Uuid::new_v4();
        let with = format!(
            r#"{{"type":"send_message","conversation_id":"{conv}","message":"hi","recipient_id":"{peer}","reply_to_id":"{reply}"}}"#
        );
        match serde_json::from_str::<ClientEvent>(&with).unwrap() {
            ClientEvent::SendMessage { reply_to_id, .. } => {
                assert_eq!(reply_to_id, Some(reply))
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let raw = r#"{"type":"launch_missiles"}"#;
        assert!(serde_json::from_str::<ClientEvent>(raw).is_err());
    }
}
