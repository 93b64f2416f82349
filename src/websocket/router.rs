//! Delivery router: decides which logical channels an event reaches and with
//! what payload shape. Local registry delivery is authoritative; the redis
//! publish is best-effort fan-out to sibling instances and never fails an
//! operation.

use crate::models::MessageRecord;
use crate::websocket::{events::ServerEvent, pubsub, ConnectionRegistry};
use redis::Client;
use uuid::Uuid;

#[derive(Clone)]
pub struct DeliveryRouter {
    registry: ConnectionRegistry,
    redis: Client,
    origin: Uuid,
}

impl DeliveryRouter {
    pub fn new(registry: ConnectionRegistry, redis: Client) -> Self {
        Self {
            registry,
            redis,
            origin: Uuid::new_v4(),
        }
    }

    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Emit to one logical channel: every local connection in the room plus
    /// sibling instances via redis.
    pub async fn emit_to_room(&self, room: Uuid, event: &ServerEvent) {
        let msg = event.to_message();
        self.registry.send_to_room(room, msg).await;
        if let Ok(payload) = event.to_json() {
            if let Err(e) = pubsub::publish_to_room(&self.redis, self.origin, room, &payload).await
            {
                tracing::warn!(%room, event = event.event_type(), error = %e, "redis publish failed");
            }
        }
    }

    /// Emit to a single local connection (join acknowledgements, history,
    /// per-action errors).
    pub async fn emit_to_conn(&self, conn_id: Uuid, event: &ServerEvent) {
        self.registry.send_to_conn(conn_id, event.to_message()).await;
    }

    /// Emit to everyone except the acting connection (presence changes).
    pub async fn broadcast_others(&self, conn_id: Uuid, event: &ServerEvent) {
        let msg = event.to_message();
        self.registry.broadcast_except(conn_id, msg).await;
        if let Ok(payload) = event.to_json() {
            if let Err(e) = pubsub::publish_broadcast(&self.redis, self.origin, &payload).await {
                tracing::warn!(event = event.event_type(), error = %e, "redis publish failed");
            }
        }
    }

    /// Emit to every connection everywhere (profile updates).
    pub async fn broadcast_all(&self, event: &ServerEvent) {
        let msg = event.to_message();
        self.registry.broadcast_all(msg).await;
        if let Ok(payload) = event.to_json() {
            if let Err(e) = pubsub::publish_broadcast(&self.redis, self.origin, &payload).await {
                tracing::warn!(event = event.event_type(), error = %e, "redis publish failed");
            }
        }
    }

    /// Fan out a freshly created message:
    /// 1. full record to the conversation room (open chat windows),
    /// 2. notification to the recipient's personal channel (unread badge +
    ///    sidebar reorder),
    /// 3. notification to the sender's personal channel (sidebar reorder on
    ///    their other sessions, no unread increment).
    ///
    /// The sender-side notification carries the recipient as `sender_id`:
    /// both sides key their sidebar update on "which row moves to the top",
    /// and for the sender that row is the recipient's.
    pub async fn fan_out_new_message(&self, record: &MessageRecord, recipient_id: Uuid) {
        self.emit_to_room(record.conversation_id, &ServerEvent::ReceiveMessage(record.clone()))
            .await;

        self.emit_to_room(
            recipient_id,
            &ServerEvent::NewMessageNotification {
                conversation_id: record.conversation_id,
                sender_id: record.author_id,
                message: record.content.clone(),
                is_own: false,
            },
        )
        .await;

        self.emit_to_room(
            record.author_id,
            &ServerEvent::NewMessageNotification {
                conversation_id: record.conversation_id,
                sender_id: recipient_id,
                message: format!("You: {}", record.content),
                is_own: true,
            },
        )
        .await;
    }

    /// Deletes reach only the conversation room; sidebar previews are not
    /// rewritten retroactively.
    pub async fn fan_out_deleted_message(&self, record: &MessageRecord) {
        self.emit_to_room(record.conversation_id, &ServerEvent::MessageDeleted(record.clone()))
            .await;
    }
}
