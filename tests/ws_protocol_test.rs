//! Wire-protocol checks that need no running infrastructure: every frame a
//! client can send parses into the typed router's vocabulary, and server
//! frames carry the tags clients dispatch on.

use chat_service::websocket::events::ServerEvent;
use chat_service::websocket::message_types::ClientEvent;
use uuid::Uuid;

#[test]
fn send_message_frame_parses_with_and_without_reply() {
    let conv = Uuid::new_v4();
    let peer = Uuid::new_v4();

    let plain = format!(
        r#"{{"type":"send_message","conversation_id":"{conv}","message":"hey","recipient_id":"{peer}"}}"#
    );
    match serde_json::from_str::<ClientEvent>(&plain).unwrap() {
        ClientEvent::SendMessage {
            conversation_id,
            message,
            recipient_id,
            reply_to_id,
        } => {
            assert_eq!(conversation_id, conv);
            assert_eq!(message, "hey");
            assert_eq!(recipient_id, peer);
            assert_eq!(reply_to_id, None);
        }
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn typing_frames_relay_symmetrically() {
    let conv = Uuid::new_v4();
    let user = Uuid::new_v4();

    let start = ServerEvent::UserTyping {
        conversation_id: conv,
        user_id: user,
    };
    let stop = ServerEvent::UserStopTyping {
        conversation_id: conv,
        user_id: user,
    };

    let start_v: serde_json::Value =
        serde_json::from_str(&start.to_json().unwrap()).unwrap();
    let stop_v: serde_json::Value = serde_json::from_str(&stop.to_json().unwrap()).unwrap();
    assert_eq!(start_v["type"], "user_typing");
    assert_eq!(stop_v["type"], "user_stop_typing");
    assert_eq!(start_v["user_id"], stop_v["user_id"]);
}

#[test]
fn notification_payload_distinguishes_own_messages() {
    let event = ServerEvent::NewMessageNotification {
        conversation_id: Uuid::new_v4(),
        sender_id: Uuid::new_v4(),
        message: "You: on my way".into(),
        is_own: true,
    };
    let v: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
    assert_eq!(v["type"], "new_message_notification");
    assert_eq!(v["is_own"], true);
    assert_eq!(v["message"], "You: on my way");
}
