use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{error::AppError, models::groups::CommentGroup};

#[derive(Debug)]
pub(crate) struct CreateGroupParams {
    pub presentation_id: Uuid,
    pub slide_index: i32,
    pub label: String,
    pub seed_comment_id: Uuid,
    pub position_x: f64,
    pub position_y: f64,
}

pub async fn insert_group(
    tx: &mut Transaction<'_, Postgres>,
    params: CreateGroupParams,
) -> Result<CommentGroup, AppError> {
    let row = crate::log_query_fetch_one!(
        "groups.insert_group",
        sqlx::query_as::<_, CommentGroup>(
            r#"
                INSERT INTO live.comment_group
                    (presentation_id, slide_index, label, comment_ids, position_x, position_y)
                VALUES ($1, $2, $3, ARRAY[$4]::uuid[], $5, $6)
                RETURNING *
            "#,
        )
        .bind(params.presentation_id)
        .bind(params.slide_index)
        .bind(params.label)
        .bind(params.seed_comment_id)
        .bind(params.position_x)
        .bind(params.position_y)
        .fetch_one(&mut **tx)
    )?;

    Ok(row)
}

pub async fn find_group_by_id(
    pool: &PgPool,
    group_id: Uuid,
) -> Result<Option<CommentGroup>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "groups.find_group_by_id",
        sqlx::query_as::<_, CommentGroup>(
            r#"
                SELECT * FROM live.comment_group WHERE id = $1
            "#,
        )
        .bind(group_id)
        .fetch_optional(pool)
    )?;

    Ok(row)
}

/// Row-locks a group for membership edits; concurrent add/remove of the
/// same group serialize here instead of losing updates.
pub async fn lock_group(
    tx: &mut Transaction<'_, Postgres>,
    group_id: Uuid,
) -> Result<Option<CommentGroup>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "groups.lock_group",
        sqlx::query_as::<_, CommentGroup>(
            r#"
                SELECT * FROM live.comment_group WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(group_id)
        .fetch_optional(&mut **tx)
    )?;

    Ok(row)
}

pub async fn list_groups_for_slide(
    pool: &PgPool,
    presentation_id: Uuid,
    slide_index: i32,
) -> Result<Vec<CommentGroup>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "groups.list_groups_for_slide",
        sqlx::query_as::<_, CommentGroup>(
            r#"
                SELECT * FROM live.comment_group
                WHERE presentation_id = $1
                  AND slide_index = $2
                ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(presentation_id)
        .bind(slide_index)
        .fetch_all(pool)
    )?;

    Ok(rows)
}

pub async fn set_comment_ids(
    tx: &mut Transaction<'_, Postgres>,
    group_id: Uuid,
    comment_ids: &[Uuid],
) -> Result<Option<CommentGroup>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "groups.set_comment_ids",
        sqlx::query_as::<_, CommentGroup>(
            r#"
                UPDATE live.comment_group
                SET comment_ids = $2,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(comment_ids)
        .fetch_optional(&mut **tx)
    )?;

    Ok(row)
}

/// Last-write-wins position update, fed by the coalesced drag buffer.
pub async fn update_position(
    pool: &PgPool,
    group_id: Uuid,
    position_x: f64,
    position_y: f64,
) -> Result<u64, AppError> {
    let result = crate::log_query_execute!(
        "groups.update_position",
        sqlx::query(
            r#"
                UPDATE live.comment_group
                SET position_x = $2,
                    position_y = $3,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
            "#,
        )
        .bind(group_id)
        .bind(position_x)
        .bind(position_y)
        .execute(pool)
    )?;

    Ok(result.rows_affected())
}

pub async fn update_group(
    pool: &PgPool,
    group_id: Uuid,
    label: Option<String>,
    collapsed: Option<bool>,
) -> Result<Option<CommentGroup>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "groups.update_group",
        sqlx::query_as::<_, CommentGroup>(
            r#"
                UPDATE live.comment_group
                SET label = COALESCE($2, label),
                    collapsed = COALESCE($3, collapsed),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(label)
        .bind(collapsed)
        .fetch_optional(pool)
    )?;

    Ok(row)
}

pub async fn delete_group(
    tx: &mut Transaction<'_, Postgres>,
    group_id: Uuid,
) -> Result<u64, AppError> {
    let result = crate::log_query_execute!(
        "groups.delete_group",
        sqlx::query(
            r#"
                DELETE FROM live.comment_group WHERE id = $1
            "#,
        )
        .bind(group_id)
        .execute(&mut **tx)
    )?;

    Ok(result.rows_affected())
}
