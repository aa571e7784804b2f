use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::presentations::{AudienceMode, Presentation},
};

#[derive(Debug)]
pub(crate) struct CreatePresentationParams {
    pub course_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub audience_mode: AudienceMode,
}

pub async fn create_presentation(
    pool: &PgPool,
    params: CreatePresentationParams,
) -> Result<Presentation, AppError> {
    let row = crate::log_query_fetch_one!(
        "presentations.create_presentation",
        sqlx::query_as::<_, Presentation>(
            r#"
                INSERT INTO deck.presentation (course_id, owner_id, title, audience_mode)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            "#,
        )
        .bind(params.course_id)
        .bind(params.owner_id)
        .bind(params.title)
        .bind(params.audience_mode)
        .fetch_one(pool)
    )?;

    Ok(row)
}

pub async fn find_presentation_by_id(
    pool: &PgPool,
    presentation_id: Uuid,
) -> Result<Option<Presentation>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "presentations.find_presentation_by_id",
        sqlx::query_as::<_, Presentation>(
            r#"
                SELECT * FROM deck.presentation WHERE id = $1
            "#,
        )
        .bind(presentation_id)
        .fetch_optional(pool)
    )?;

    Ok(row)
}

/// Row-locks the presentation for the duration of the transaction. Used as
/// the mutex for slide renumbering and navigation.
pub async fn lock_presentation(
    tx: &mut Transaction<'_, Postgres>,
    presentation_id: Uuid,
) -> Result<Option<Presentation>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "presentations.lock_presentation",
        sqlx::query_as::<_, Presentation>(
            r#"
                SELECT * FROM deck.presentation WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(presentation_id)
        .fetch_optional(&mut **tx)
    )?;

    Ok(row)
}

pub async fn list_presentations_by_course(
    pool: &PgPool,
    course_id: Uuid,
) -> Result<Vec<Presentation>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "presentations.list_presentations_by_course",
        sqlx::query_as::<_, Presentation>(
            r#"
                SELECT * FROM deck.presentation
                WHERE course_id = $1
                ORDER BY created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(pool)
    )?;

    Ok(rows)
}

pub async fn update_presentation(
    pool: &PgPool,
    presentation_id: Uuid,
    title: Option<String>,
    audience_mode: Option<AudienceMode>,
) -> Result<Option<Presentation>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "presentations.update_presentation",
        sqlx::query_as::<_, Presentation>(
            r#"
                UPDATE deck.presentation
                SET title = COALESCE($2, title),
                    audience_mode = COALESCE($3, audience_mode),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(presentation_id)
        .bind(title)
        .bind(audience_mode)
        .fetch_optional(pool)
    )?;

    Ok(row)
}

pub async fn delete_presentation(
    tx: &mut Transaction<'_, Postgres>,
    presentation_id: Uuid,
) -> Result<u64, AppError> {
    let result = crate::log_query_execute!(
        "presentations.delete_presentation",
        sqlx::query(
            r#"
                DELETE FROM deck.presentation WHERE id = $1
            "#,
        )
        .bind(presentation_id)
        .execute(&mut **tx)
    )?;

    Ok(result.rows_affected())
}

/// Demotes every other live presentation in the course, returning the ids
/// that were live. Paired with set_live in one transaction so the course
/// can never end up with two live presentations.
pub async fn demote_live_in_course(
    tx: &mut Transaction<'_, Postgres>,
    course_id: Uuid,
    keep_id: Uuid,
) -> Result<Vec<Uuid>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "presentations.demote_live_in_course",
        sqlx::query_scalar::<_, Uuid>(
            r#"
                UPDATE deck.presentation
                SET is_live = false,
                    updated_at = CURRENT_TIMESTAMP
                WHERE course_id = $1
                  AND id <> $2
                  AND is_live
                RETURNING id
            "#,
        )
        .bind(course_id)
        .bind(keep_id)
        .fetch_all(&mut **tx)
    )?;

    Ok(rows)
}

pub async fn set_live(
    tx: &mut Transaction<'_, Postgres>,
    presentation_id: Uuid,
    is_live: bool,
) -> Result<Option<Presentation>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "presentations.set_live",
        sqlx::query_as::<_, Presentation>(
            r#"
                UPDATE deck.presentation
                SET is_live = $2,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(presentation_id)
        .bind(is_live)
        .fetch_optional(&mut **tx)
    )?;

    Ok(row)
}

pub async fn set_current_slide(
    tx: &mut Transaction<'_, Postgres>,
    presentation_id: Uuid,
    slide_index: i32,
) -> Result<Option<Presentation>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "presentations.set_current_slide",
        sqlx::query_as::<_, Presentation>(
            r#"
                UPDATE deck.presentation
                SET current_slide_index = $2,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(presentation_id)
        .bind(slide_index)
        .fetch_optional(&mut **tx)
    )?;

    Ok(row)
}
