use dashmap::DashMap;
use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::realtime::protocol::ServerMessage;

const ROOM_CHANNEL_CAPACITY: usize = 256;

/// Latest unsaved drag position for one group. Only the final position of a
/// drag needs to survive; intermediate frames are overwritten here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingMove {
    pub position_x: f64,
    pub position_y: f64,
}

/// Fanout hub for one presentation: every connected session subscribes to
/// tx. There is no shared document state in the room; the database stays
/// authoritative and sessions resync from it on lag.
pub struct Room {
    pub presentation_id: Uuid,
    pub tx: broadcast::Sender<ServerMessage>,
    pub pending_moves: Mutex<HashMap<Uuid, PendingMove>>,
    pub last_active: Mutex<Instant>,
}

impl Room {
    pub fn new(presentation_id: Uuid) -> Self {
        let (tx, _rx) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
        Self {
            presentation_id,
            tx,
            pending_moves: Mutex::new(HashMap::new()),
            last_active: Mutex::new(Instant::now()),
        }
    }

    /// Send errors only mean nobody is subscribed right now.
    pub fn publish(&self, message: ServerMessage) {
        let _ = self.tx.send(message);
    }

    pub async fn touch(&self) {
        *self.last_active.lock().await = Instant::now();
    }
}

pub type Rooms = Arc<DashMap<Uuid, Arc<Room>>>;

pub fn get_or_create_room(rooms: &Rooms, presentation_id: Uuid) -> Arc<Room> {
    rooms
        .entry(presentation_id)
        .or_insert_with(|| Arc::new(Room::new(presentation_id)))
        .clone()
}

pub fn lookup_room(rooms: &Rooms, presentation_id: Uuid) -> Option<Arc<Room>> {
    rooms.get(&presentation_id).map(|entry| entry.clone())
}

/// Publishes to the presentation's room if anyone has one open. Mutations
/// from the HTTP API fan out only when sessions exist; creating a room just
/// to drop the message would be garbage.
pub fn publish(rooms: &Rooms, presentation_id: Uuid, message: ServerMessage) {
    if let Some(room) = lookup_room(rooms, presentation_id) {
        room.publish(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let room = Room::new(Uuid::new_v4());
        room.publish(ServerMessage::SessionEnded {
            presentation_id: room.presentation_id,
        });
    }

    #[tokio::test]
    async fn subscribers_receive_published_frames() {
        let room = Room::new(Uuid::new_v4());
        let mut rx = room.tx.subscribe();
        let message = ServerMessage::SessionEnded {
            presentation_id: room.presentation_id,
        };
        room.publish(message.clone());
        let received = rx.recv().await.expect("frame");
        assert_eq!(received, message);
    }

    #[test]
    fn get_or_create_returns_the_same_room() {
        let rooms: Rooms = Arc::new(DashMap::new());
        let id = Uuid::new_v4();
        let first = get_or_create_room(&rooms, id);
        let second = get_or_create_room(&rooms, id);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(lookup_room(&rooms, Uuid::new_v4()).is_none());
    }
}
