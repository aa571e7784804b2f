use redis::AsyncCommands;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::presence::PresenceViewer,
    repositories::presence as presence_repo,
};

const PRESENCE_CACHE_TTL_SECS: usize = 60;
const PRESENCE_STALE_AFTER_SECS: i64 = 300;

pub struct PresenceService;

impl PresenceService {
    pub async fn list_viewers(
        pool: &PgPool,
        redis: Option<&redis::Client>,
        presentation_id: Uuid,
    ) -> Result<Vec<PresenceViewer>, AppError> {
        if let Some(redis) = redis {
            if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                let key = cache_key(presentation_id);
                let cached: Result<Option<String>, _> = conn.get(&key).await;
                if let Ok(Some(payload)) = cached {
                    if let Ok(viewers) = serde_json::from_str::<Vec<PresenceViewer>>(&payload) {
                        return Ok(viewers);
                    }
                }
            }
        }

        let viewers = presence_repo::list_active_presence(pool, presentation_id).await?;
        if let Some(redis) = redis {
            if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
                let key = cache_key(presentation_id);
                if let Ok(payload) = serde_json::to_string(&viewers) {
                    let _: Result<(), _> = conn
                        .set_ex(key, payload, PRESENCE_CACHE_TTL_SECS.try_into().unwrap())
                        .await;
                }
            }
        }

        Ok(viewers)
    }

    pub async fn join(
        pool: &PgPool,
        redis: Option<&redis::Client>,
        presentation_id: Uuid,
        viewer_id: Uuid,
        session_id: Uuid,
        display_name: String,
    ) -> Result<(), AppError> {
        presence_repo::insert_presence(
            pool,
            presence_repo::PresenceInsertParams {
                presentation_id,
                viewer_id,
                session_id,
                display_name,
            },
        )
        .await?;
        invalidate_cache(redis, presentation_id).await;
        Ok(())
    }

    pub async fn heartbeat(
        pool: &PgPool,
        presentation_id: Uuid,
        session_id: Uuid,
    ) -> Result<(), AppError> {
        presence_repo::update_heartbeat(pool, presentation_id, session_id).await
    }

    pub async fn disconnect(
        pool: &PgPool,
        redis: Option<&redis::Client>,
        presentation_id: Uuid,
        session_id: Uuid,
    ) -> Result<(), AppError> {
        presence_repo::mark_disconnected(pool, presentation_id, session_id).await?;
        invalidate_cache(redis, presentation_id).await;
        Ok(())
    }

    pub async fn cleanup_stale_sessions(
        pool: &PgPool,
        redis: Option<&redis::Client>,
        presentation_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let viewers =
            presence_repo::cleanup_stale_presence(pool, presentation_id, PRESENCE_STALE_AFTER_SECS)
                .await?;
        if !viewers.is_empty() {
            invalidate_cache(redis, presentation_id).await;
        }
        Ok(viewers)
    }
}

fn cache_key(presentation_id: Uuid) -> String {
    format!("presence:{}", presentation_id)
}

async fn invalidate_cache(redis: Option<&redis::Client>, presentation_id: Uuid) {
    let Some(redis) = redis else {
        return;
    };
    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        let key = cache_key(presentation_id);
        let _: Result<(), _> = conn.del(key).await;
    }
}
