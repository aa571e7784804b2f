use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::presence::PresenceViewer,
};

pub struct PresenceInsertParams {
    pub presentation_id: Uuid,
    pub viewer_id: Uuid,
    pub session_id: Uuid,
    pub display_name: String,
}

pub async fn insert_presence(pool: &PgPool, params: PresenceInsertParams) -> Result<(), AppError> {
    crate::log_query_execute!(
        "presence.insert_presence",
        sqlx::query(
            r#"
                INSERT INTO live.presence (presentation_id, viewer_id, session_id, display_name)
                VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(params.presentation_id)
        .bind(params.viewer_id)
        .bind(params.session_id)
        .bind(params.display_name)
        .execute(pool)
    )?;

    Ok(())
}

pub async fn list_active_presence(
    pool: &PgPool,
    presentation_id: Uuid,
) -> Result<Vec<PresenceViewer>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "presence.list_active_presence",
        sqlx::query_as::<_, PresenceViewer>(
            r#"
                SELECT DISTINCT ON (viewer_id)
                    viewer_id,
                    display_name,
                    connected_at,
                    last_heartbeat_at
                FROM live.presence
                WHERE presentation_id = $1
                  AND disconnected_at IS NULL
                ORDER BY viewer_id, connected_at DESC
            "#,
        )
        .bind(presentation_id)
        .fetch_all(pool)
    )?;

    Ok(rows)
}

pub async fn update_heartbeat(
    pool: &PgPool,
    presentation_id: Uuid,
    session_id: Uuid,
) -> Result<(), AppError> {
    crate::log_query_execute!(
        "presence.update_heartbeat",
        sqlx::query(
            r#"
                UPDATE live.presence
                SET last_heartbeat_at = CURRENT_TIMESTAMP
                WHERE presentation_id = $1
                  AND session_id = $2
                  AND disconnected_at IS NULL
            "#,
        )
        .bind(presentation_id)
        .bind(session_id)
        .execute(pool)
    )?;

    Ok(())
}

pub async fn mark_disconnected(
    pool: &PgPool,
    presentation_id: Uuid,
    session_id: Uuid,
) -> Result<(), AppError> {
    crate::log_query_execute!(
        "presence.mark_disconnected",
        sqlx::query(
            r#"
                UPDATE live.presence
                SET disconnected_at = CURRENT_TIMESTAMP
                WHERE presentation_id = $1
                  AND session_id = $2
                  AND disconnected_at IS NULL
            "#,
        )
        .bind(presentation_id)
        .bind(session_id)
        .execute(pool)
    )?;

    Ok(())
}

/// Marks sessions whose heartbeat went quiet as disconnected, returning the
/// viewers who no longer have any live session on the presentation.
pub async fn cleanup_stale_presence(
    pool: &PgPool,
    presentation_id: Uuid,
    stale_after_secs: i64,
) -> Result<Vec<Uuid>, AppError> {
    let viewers = crate::log_query_fetch_all!(
        "presence.cleanup_stale_presence",
        sqlx::query_scalar::<_, Uuid>(
            r#"
                WITH stale AS (
                    UPDATE live.presence
                    SET disconnected_at = CURRENT_TIMESTAMP
                    WHERE presentation_id = $1
                      AND disconnected_at IS NULL
                      AND last_heartbeat_at < (CURRENT_TIMESTAMP - ($2 * INTERVAL '1 second'))
                    RETURNING viewer_id
                ),
                left_viewers AS (
                    SELECT DISTINCT viewer_id FROM stale
                )
                SELECT lv.viewer_id
                FROM left_viewers lv
                WHERE NOT EXISTS (
                    SELECT 1
                    FROM live.presence p
                    WHERE p.presentation_id = $1
                      AND p.viewer_id = lv.viewer_id
                      AND p.disconnected_at IS NULL
                )
            "#,
        )
        .bind(presentation_id)
        .bind(stale_after_secs)
        .fetch_all(pool)
    )?;

    Ok(viewers)
}

/// Presentations that still have sessions marked connected; used by the
/// sweeper so it only touches decks someone is actually watching.
pub async fn presentations_with_active_sessions(pool: &PgPool) -> Result<Vec<Uuid>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "presence.presentations_with_active_sessions",
        sqlx::query_scalar::<_, Uuid>(
            r#"
                SELECT DISTINCT presentation_id
                FROM live.presence
                WHERE disconnected_at IS NULL
            "#,
        )
        .fetch_all(pool)
    )?;

    Ok(rows)
}
