use std::time::Duration;

use sqlx::PgPool;

use crate::{
    realtime::{moves, room::Rooms},
    repositories::presence as presence_repo,
    usecases::presence::PresenceService,
};

const ROOM_IDLE_SECS: u64 = 300;
const ROOM_CLEANUP_INTERVAL_SECS: u64 = 60;
const PRESENCE_SWEEP_INTERVAL_SECS: u64 = 120;

/// Evicts rooms nobody has touched for a while, flushing any coalesced
/// positions they still hold first. A dropped room only loses its broadcast
/// channel; the database keeps everything.
pub fn spawn_room_cleanup(db: PgPool, rooms: Rooms) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(ROOM_CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;

            let mut idle = Vec::new();
            for entry in rooms.iter() {
                let last_active = entry.value().last_active.lock().await;
                if last_active.elapsed().as_secs() >= ROOM_IDLE_SECS
                    && entry.value().tx.receiver_count() == 0
                {
                    idle.push(*entry.key());
                }
            }

            for presentation_id in idle {
                if let Some((_, room)) = rooms.remove(&presentation_id) {
                    moves::flush_room_moves(&db, &room).await;
                    tracing::info!(
                        "Removed idle room for presentation {}",
                        presentation_id
                    );
                }
            }
        }
    });
}

/// Sweeps presence rows whose heartbeat went quiet, so the viewer list does
/// not keep ghosts of crashed clients.
pub fn spawn_presence_sweep(db: PgPool, redis: Option<redis::Client>) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(PRESENCE_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;

            let presentations = match presence_repo::presentations_with_active_sessions(&db).await
            {
                Ok(presentations) => presentations,
                Err(error) => {
                    tracing::error!("Presence sweep query failed: {}", error);
                    continue;
                }
            };

            for presentation_id in presentations {
                match PresenceService::cleanup_stale_sessions(
                    &db,
                    redis.as_ref(),
                    presentation_id,
                )
                .await
                {
                    Ok(gone) => {
                        if !gone.is_empty() {
                            tracing::info!(
                                "Swept {} stale viewers from presentation {}",
                                gone.len(),
                                presentation_id
                            );
                        }
                    }
                    Err(error) => {
                        tracing::error!(
                            "Presence sweep failed for presentation {}: {}",
                            presentation_id,
                            error
                        );
                    }
                }
            }
        }
    });
}
