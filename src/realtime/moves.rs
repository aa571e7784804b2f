use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    realtime::room::{PendingMove, Room, Rooms},
    repositories::groups as group_repo,
};

const MOVE_FLUSH_INTERVAL_MS: u64 = 500;

/// Records the latest drag position for a group. Broadcast happens
/// immediately from the caller; persistence waits for the next flush so a
/// fast drag costs one write instead of one per frame.
pub async fn queue_move(room: &Room, group_id: Uuid, position_x: f64, position_y: f64) {
    let mut pending = room.pending_moves.lock().await;
    pending.insert(
        group_id,
        PendingMove {
            position_x,
            position_y,
        },
    );
}

/// Persists and clears every coalesced position in the room.
pub async fn flush_room_moves(db: &PgPool, room: &Room) {
    let drained: Vec<(Uuid, PendingMove)> = {
        let mut pending = room.pending_moves.lock().await;
        if pending.is_empty() {
            return;
        }
        pending.drain().collect()
    };

    for (group_id, position) in drained {
        if let Err(error) =
            group_repo::update_position(db, group_id, position.position_x, position.position_y)
                .await
        {
            tracing::error!(
                "Failed to persist position for group {} on presentation {}: {}",
                group_id,
                room.presentation_id,
                error
            );
        }
    }
}

pub fn spawn_move_flush(db: PgPool, rooms: Rooms) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_millis(MOVE_FLUSH_INTERVAL_MS));
        loop {
            interval.tick().await;
            let rooms_snapshot: Vec<Arc<Room>> =
                rooms.iter().map(|entry| entry.value().clone()).collect();
            for room in rooms_snapshot {
                flush_room_moves(&db, &room).await;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_the_latest_position_survives() {
        let room = Room::new(Uuid::new_v4());
        let group_id = Uuid::new_v4();

        queue_move(&room, group_id, 1.0, 1.0).await;
        queue_move(&room, group_id, 2.0, 2.0).await;
        queue_move(&room, group_id, 3.5, 4.5).await;

        let pending = room.pending_moves.lock().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending[&group_id],
            PendingMove {
                position_x: 3.5,
                position_y: 4.5
            }
        );
    }

    #[tokio::test]
    async fn moves_for_different_groups_coalesce_independently() {
        let room = Room::new(Uuid::new_v4());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        queue_move(&room, first, 1.0, 2.0).await;
        queue_move(&room, second, 9.0, 9.0).await;
        queue_move(&room, first, 5.0, 6.0).await;

        let pending = room.pending_moves.lock().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[&first].position_x, 5.0);
        assert_eq!(pending[&second].position_y, 9.0);
    }
}
