//! Redis pub/sub bridge for cross-instance fan-out.
//!
//! Each emission is published alongside local delivery; every instance runs
//! one pattern-subscribed listener that replays remote envelopes into its own
//! registry. Envelopes carry the origin instance id so an instance never
//! re-delivers its own traffic.

use crate::websocket::ConnectionRegistry;
use axum::extract::ws::Message;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const BROADCAST_CHANNEL: &str = "chat:broadcast";

fn channel_for_room(id: Uuid) -> String {
    format!("chat:room:{}", id)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: Uuid,
    pub payload: String,
}

pub async fn publish_to_room(
    client: &Client,
    origin: Uuid,
    room: Uuid,
    payload: &str,
) -> redis::RedisResult<()> {
    let envelope = Envelope {
        origin,
        payload: payload.to_string(),
    };
    let body = serde_json::to_string(&envelope).unwrap_or_default();
    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.publish::<_, _, ()>(channel_for_room(room), body).await
}

pub async fn publish_broadcast(
    client: &Client,
    origin: Uuid,
    payload: &str,
) -> redis::RedisResult<()> {
    let envelope = Envelope {
        origin,
        payload: payload.to_string(),
    };
    let body = serde_json::to_string(&envelope).unwrap_or_default();
    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.publish::<_, _, ()>(BROADCAST_CHANNEL, body).await
}

/// Long-running listener: replay remote envelopes into the local registry.
pub async fn start_psub_listener(
    client: Client,
    registry: ConnectionRegistry,
    origin: Uuid,
) -> redis::RedisResult<()> {
    // PubSub requires a dedicated connection, not multiplexed
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe("chat:room:*").await?;
    pubsub.subscribe(BROADCAST_CHANNEL).await?;

    let mut stream = pubsub.on_message();
    use futures_util::StreamExt;
    while let Some(msg) = stream.next().await {
        let channel: String = msg.get_channel_name().into();
        let body: String = msg.get_payload()?;
        let Ok(envelope) = serde_json::from_str::<Envelope>(&body) else {
            tracing::warn!(%channel, "discarding malformed pubsub envelope");
            continue;
        };
        if envelope.origin == origin {
            continue; // already delivered locally
        }

        if channel == BROADCAST_CHANNEL {
            registry.broadcast_all(Message::Text(envelope.payload)).await;
        } else if let Some(id_part) = channel.strip_prefix("chat:room:") {
            if let Ok(room) = Uuid::parse_str(id_part) {
                registry.send_to_room(room, Message::Text(envelope.payload)).await;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips() {
        let envelope = Envelope {
            origin: Uuid::new_v4(),
            payload: r#"{"type":"user_typing"}"#.into(),
        };
        let body = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&body).unwrap();
        assert_eq!(back.origin, envelope.origin);
        assert_eq!(back.payload, envelope.payload);
    }

    #[test]
    fn room_channels_are_parseable() {
        let id = Uuid::new_v4();
        let channel = channel_for_room(id);
        let rest = channel.strip_prefix("chat:room:").unwrap();
        assert_eq!(Uuid::parse_str(rest).unwrap(), id);
    }
}
