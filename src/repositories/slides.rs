use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::slides::{Slide, SlideBody, SlideKind},
};

#[derive(Debug)]
pub(crate) struct CreateSlideParams {
    pub presentation_id: Uuid,
    pub position: i32,
    pub kind: SlideKind,
    pub body: serde_json::Value,
}

pub async fn insert_slide(
    tx: &mut Transaction<'_, Postgres>,
    params: CreateSlideParams,
) -> Result<Slide, AppError> {
    let row = crate::log_query_fetch_one!(
        "slides.insert_slide",
        sqlx::query_as::<_, Slide>(
            r#"
                INSERT INTO deck.slide (presentation_id, position, kind, body)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            "#,
        )
        .bind(params.presentation_id)
        .bind(params.position)
        .bind(params.kind)
        .bind(params.body)
        .fetch_one(&mut **tx)
    )?;

    Ok(row)
}

pub async fn list_slides(pool: &PgPool, presentation_id: Uuid) -> Result<Vec<Slide>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "slides.list_slides",
        sqlx::query_as::<_, Slide>(
            r#"
                SELECT * FROM deck.slide
                WHERE presentation_id = $1
                ORDER BY position ASC
            "#,
        )
        .bind(presentation_id)
        .fetch_all(pool)
    )?;

    Ok(rows)
}

pub async fn list_slides_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    presentation_id: Uuid,
) -> Result<Vec<Slide>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "slides.list_slides_in_tx",
        sqlx::query_as::<_, Slide>(
            r#"
                SELECT * FROM deck.slide
                WHERE presentation_id = $1
                ORDER BY position ASC
            "#,
        )
        .bind(presentation_id)
        .fetch_all(&mut **tx)
    )?;

    Ok(rows)
}

pub async fn find_slide_by_id(
    pool: &PgPool,
    presentation_id: Uuid,
    slide_id: Uuid,
) -> Result<Option<Slide>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "slides.find_slide_by_id",
        sqlx::query_as::<_, Slide>(
            r#"
                SELECT * FROM deck.slide
                WHERE presentation_id = $1
                  AND id = $2
            "#,
        )
        .bind(presentation_id)
        .bind(slide_id)
        .fetch_optional(pool)
    )?;

    Ok(row)
}

pub async fn update_slide_body(
    pool: &PgPool,
    presentation_id: Uuid,
    slide_id: Uuid,
    body: &SlideBody,
) -> Result<Option<Slide>, AppError> {
    let payload = serde_json::to_value(body)?;
    let row = crate::log_query_fetch_optional!(
        "slides.update_slide_body",
        sqlx::query_as::<_, Slide>(
            r#"
                UPDATE deck.slide
                SET kind = $3,
                    body = $4,
                    updated_at = CURRENT_TIMESTAMP
                WHERE presentation_id = $1
                  AND id = $2
                RETURNING *
            "#,
        )
        .bind(presentation_id)
        .bind(slide_id)
        .bind(body.kind())
        .bind(payload)
        .fetch_optional(pool)
    )?;

    Ok(row)
}

pub async fn delete_slide(
    tx: &mut Transaction<'_, Postgres>,
    slide_id: Uuid,
) -> Result<u64, AppError> {
    let result = crate::log_query_execute!(
        "slides.delete_slide",
        sqlx::query(
            r#"
                DELETE FROM deck.slide WHERE id = $1
            "#,
        )
        .bind(slide_id)
        .execute(&mut **tx)
    )?;

    Ok(result.rows_affected())
}

pub async fn count_slides(pool: &PgPool, presentation_id: Uuid) -> Result<i64, AppError> {
    let count = crate::log_query_fetch_one!(
        "slides.count_slides",
        sqlx::query_scalar::<_, i64>(
            r#"
                SELECT COUNT(*) FROM deck.slide WHERE presentation_id = $1
            "#,
        )
        .bind(presentation_id)
        .fetch_one(pool)
    )?;

    Ok(count)
}

pub async fn count_slides_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    presentation_id: Uuid,
) -> Result<i64, AppError> {
    let count = crate::log_query_fetch_one!(
        "slides.count_slides_in_tx",
        sqlx::query_scalar::<_, i64>(
            r#"
                SELECT COUNT(*) FROM deck.slide WHERE presentation_id = $1
            "#,
        )
        .bind(presentation_id)
        .fetch_one(&mut **tx)
    )?;

    Ok(count)
}

/// Writes a dense renumbering produced by the ordering helpers. Only rows
/// whose position actually changed are touched.
pub async fn apply_positions(
    tx: &mut Transaction<'_, Postgres>,
    assignments: &[(Uuid, i32)],
) -> Result<(), AppError> {
    for (slide_id, position) in assignments {
        crate::log_query_execute!(
            "slides.apply_positions",
            sqlx::query(
                r#"
                    UPDATE deck.slide
                    SET position = $2,
                        updated_at = CURRENT_TIMESTAMP
                    WHERE id = $1
                      AND position <> $2
                "#,
            )
            .bind(slide_id)
            .bind(position)
            .execute(&mut **tx)
        )?;
    }

    Ok(())
}
