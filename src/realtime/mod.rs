/// Realtime fan-out for wishlist rooms
///
/// Each wishlist is a room; every open WebSocket registers a sender in its
/// room and receives everything broadcast there. Rooms are created on first
/// connect and discarded when the last member leaves.

pub mod events;

pub use events::{ItemPayload, WsEvent};

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Registry of wishlist rooms and their connected clients
///
/// The mutex is held only for map bookkeeping; sends are non-blocking
/// unbounded pushes, so no await happens under the lock.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<Uuid, HashMap<Uuid, mpsc::UnboundedSender<String>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client in a room, returning its id and message stream
    pub fn connect(&self, wishlist_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let client_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut rooms = self.rooms.lock().unwrap();
        rooms.entry(wishlist_id).or_default().insert(client_id, tx);
        let count = rooms.get(&wishlist_id).map(|r| r.len()).unwrap_or(0);
        drop(rooms);

        tracing::debug!(
            wishlist_id = %wishlist_id,
            client_id = %client_id,
            connections = count,
            "client connected to wishlist room"
        );

        (client_id, rx)
    }

    /// Remove a client; the room is dropped when it becomes empty
    pub fn disconnect(&self, wishlist_id: Uuid, client_id: Uuid) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(&wishlist_id) {
            room.remove(&client_id);
            if room.is_empty() {
                rooms.remove(&wishlist_id);
            }
        }
    }

    /// Broadcast an event to every client in a room
    ///
    /// Clients whose receiver is gone are pruned on the way through. A
    /// broadcast to a missing room is a no-op.
    pub fn broadcast(&self, wishlist_id: Uuid, event: &WsEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("failed to serialize realtime event: {}", e);
                return;
            }
        };

        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(&wishlist_id) else {
            return;
        };

        room.retain(|_, tx| tx.send(payload.clone()).is_ok());
        if room.is_empty() {
            rooms.remove(&wishlist_id);
        }
    }

    /// Send an event to a single client
    pub fn send_direct(&self, wishlist_id: Uuid, client_id: Uuid, event: &WsEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(_) => return,
        };

        let rooms = self.rooms.lock().unwrap();
        if let Some(tx) = rooms.get(&wishlist_id).and_then(|r| r.get(&client_id)) {
            let _ = tx.send(payload);
        }
    }

    /// Number of clients currently in a room
    pub fn room_size(&self, wishlist_id: Uuid) -> usize {
        self.rooms
            .lock()
            .unwrap()
            .get(&wishlist_id)
            .map(|r| r.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_all_room_members() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();

        let (_, mut rx1) = registry.connect(room);
        let (_, mut rx2) = registry.connect(room);
        assert_eq!(registry.room_size(room), 2);

        registry.broadcast(room, &WsEvent::ItemDeleted { item_id: Uuid::nil() });

        let msg1 = rx1.recv().await.unwrap();
        let msg2 = rx2.recv().await.unwrap();
        assert_eq!(msg1, msg2);
        assert!(msg1.contains("item_deleted"));
    }

    #[tokio::test]
    async fn broadcast_does_not_cross_rooms() {
        let registry = RoomRegistry::new();
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();

        let (_, mut rx_a) = registry.connect(room_a);
        let (_, mut rx_b) = registry.connect(room_b);

        registry.broadcast(room_a, &WsEvent::Pong);

        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_room_is_discarded_and_broadcast_is_noop() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();

        let (client, rx) = registry.connect(room);
        drop(rx);
        registry.disconnect(room, client);
        assert_eq!(registry.room_size(room), 0);

        // Must not panic or recreate the room.
        registry.broadcast(room, &WsEvent::Pong);
        assert_eq!(registry.room_size(room), 0);
    }

    #[tokio::test]
    async fn dead_receivers_are_pruned_on_broadcast() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();

        let (_, rx_dead) = registry.connect(room);
        let (_, mut rx_live) = registry.connect(room);
        drop(rx_dead);

        registry.broadcast(room, &WsEvent::Pong);
        assert_eq!(registry.room_size(room), 1);
        assert!(rx_live.recv().await.is_some());
    }

    #[tokio::test]
    async fn send_direct_targets_one_client() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();

        let (client1, mut rx1) = registry.connect(room);
        let (_, mut rx2) = registry.connect(room);

        registry.send_direct(room, client1, &WsEvent::Pong);

        assert!(rx1.recv().await.is_some());
        assert!(rx2.try_recv().is_err());
    }
}
