use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{courses::Course, presentations::Presentation},
};

pub async fn find_course_by_id(pool: &PgPool, course_id: Uuid) -> Result<Option<Course>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "courses.find_course_by_id",
        sqlx::query_as::<_, Course>(
            r#"
                SELECT id, title, live_presentation_id, created_at, updated_at
                FROM core.course
                WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(pool)
    )?;

    Ok(row)
}

pub async fn set_live_pointer(
    tx: &mut Transaction<'_, Postgres>,
    course_id: Uuid,
    presentation_id: Option<Uuid>,
) -> Result<(), AppError> {
    crate::log_query_execute!(
        "courses.set_live_pointer",
        sqlx::query(
            r#"
                UPDATE core.course
                SET live_presentation_id = $2,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
            "#,
        )
        .bind(course_id)
        .bind(presentation_id)
        .execute(&mut **tx)
    )?;

    Ok(())
}

/// Clears the pointer only when it still names the ending presentation, so
/// a concurrent go-live of another deck is never un-pointed.
pub async fn clear_live_pointer(
    tx: &mut Transaction<'_, Postgres>,
    course_id: Uuid,
    presentation_id: Uuid,
) -> Result<(), AppError> {
    crate::log_query_execute!(
        "courses.clear_live_pointer",
        sqlx::query(
            r#"
                UPDATE core.course
                SET live_presentation_id = NULL,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                  AND live_presentation_id = $2
            "#,
        )
        .bind(course_id)
        .bind(presentation_id)
        .execute(&mut **tx)
    )?;

    Ok(())
}

/// Resolves the course's live pointer to the presentation it names.
/// Both sides are checked so a stale pointer never resurrects an ended
/// session.
pub async fn get_live_presentation(
    pool: &PgPool,
    course_id: Uuid,
) -> Result<Option<Presentation>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "courses.get_live_presentation",
        sqlx::query_as::<_, Presentation>(
            r#"
                SELECT p.id, p.course_id, p.owner_id, p.title, p.current_slide_index,
                       p.is_live, p.audience_mode, p.created_at, p.updated_at
                FROM core.course c
                JOIN deck.presentation p ON p.id = c.live_presentation_id
                WHERE c.id = $1
                  AND p.is_live
            "#,
        )
        .bind(course_id)
        .fetch_optional(pool)
    )?;

    Ok(row)
}
