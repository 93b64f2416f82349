use axum::extract::ws::Message;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod handlers;
pub mod message_types;
pub mod pubsub;
pub mod router;

#[derive(Default)]
struct Inner {
    // connection id -> outbound channel
    connections: HashMap<Uuid, UnboundedSender<Message>>,
    // room id -> member connection ids; personal rooms are keyed by user id,
    // conversation rooms by conversation id (one shared keyspace, like the
    // rooms of the wire protocol itself)
    rooms: HashMap<Uuid, HashSet<Uuid>>,
}

/// Tracks live connections and their room membership. All state is local to
/// this process; cross-instance delivery goes through the pubsub bridge.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and hand back its outbound receiver.
    pub async fn register(&self, conn_id: Uuid) -> UnboundedReceiver<Message> {
        let (tx, rx) = unbounded_channel();
        let mut guard = self.inner.write().await;
        guard.connections.insert(conn_id, tx);
        rx
    }

    /// Drop a connection and remove it from every room it joined.
    pub async fn unregister(&self, conn_id: Uuid) {
        let mut guard = self.inner.write().await;
        guard.connections.remove(&conn_id);
        guard.rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    pub async fn join(&self, conn_id: Uuid, room: Uuid) {
        let mut guard = self.inner.write().await;
        guard.rooms.entry(room).or_default().insert(conn_id);
    }

    pub async fn send_to_conn(&self, conn_id: Uuid, msg: Message) {
        let guard = self.inner.read().await;
        if let Some(tx) = guard.connections.get(&conn_id) {
            let _ = tx.send(msg);
        }
    }

    /// Deliver to every connection currently in the room, pruning any whose
    /// receiver has gone away.
    pub async fn send_to_room(&self, room: Uuid, msg: Message) {
        let mut guard = self.inner.write().await;
        let Inner { connections, rooms } = &mut *guard;
        if let Some(members) = rooms.get_mut(&room) {
            members.retain(|conn_id| match connections.get(conn_id) {
                Some(tx) => tx.send(msg.clone()).is_ok(),
                None => false,
            });
        }
    }

    /// Deliver to every local connection except the named one.
    pub async fn broadcast_except(&self, conn_id: Uuid, msg: Message) {
        let guard = self.inner.read().await;
        for (id, tx) in guard.connections.iter() {
            if *id != conn_id {
                let _ = tx.send(msg.clone());
            }
        }
    }

    pub async fn broadcast_all(&self, msg: Message) {
        let guard = self.inner.read().await;
        for tx in guard.connections.values() {
            let _ = tx.send(msg.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Message {
        Message::Text(s.to_string())
    }

    #[tokio::test]
    async fn room_delivery_reaches_all_members() {
        let registry = ConnectionRegistry::new();
        let room = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut rx_a = registry.register(a).await;
        let mut rx_b = registry.register(b).await;
        registry.join(a, room).await;
        registry.join(b, room).await;

        registry.send_to_room(room, text("hi")).await;

        assert!(matches!(rx_a.recv().await, Some(Message::Text(t)) if t == "hi"));
        assert!(matches!(rx_b.recv().await, Some(Message::Text(t)) if t == "hi"));
    }

    #[tokio::test]
    async fn non_members_receive_nothing() {
        let registry = ConnectionRegistry::new();
        let room = Uuid::new_v4();
        let member = Uuid::new_v4();
        let outsider = Uuid::new_v4();

        let _rx_m = registry.register(member).await;
        let mut rx_o = registry.register(outsider).await;
        registry.join(member, room).await;

        registry.send_to_room(room, text("private")).await;
        assert!(rx_o.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_except_skips_origin() {
        let registry = ConnectionRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rx_a = registry.register(a).await;
        let mut rx_b = registry.register(b).await;

        registry.broadcast_except(a, text("presence")).await;

        assert!(rx_a.try_recv().is_err());
        assert!(matches!(rx_b.recv().await, Some(Message::Text(t)) if t == "presence"));
    }

    #[tokio::test]
    async fn unregister_removes_room_membership() {
        let registry = ConnectionRegistry::new();
        let room = Uuid::new_v4();
        let a = Uuid::new_v4();

        let rx = registry.register(a).await;
        registry.join(a, room).await;
        drop(rx);
        registry.unregister(a).await;

        // no members left; send must not panic and room is gone
        registry.send_to_room(room, text("x")).await;
        assert!(registry.inner.read().await.rooms.get(&room).is_none());
    }

    #[tokio::test]
    async fn dead_receivers_are_pruned_on_send() {
        let registry = ConnectionRegistry::new();
        let room = Uuid::new_v4();
        let a = Uuid::new_v4();

        let rx = registry.register(a).await;
        registry.join(a, room).await;
        drop(rx); // receiver gone, sender still registered

        registry.send_to_room(room, text("x")).await;
        let guard = registry.inner.read().await;
        assert!(guard.rooms.get(&room).map_or(true, |m| m.is_empty()));
    }
}
