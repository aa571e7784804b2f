use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::comments::{Comment, Reply},
};

#[derive(Debug)]
pub(crate) struct CreateCommentParams {
    pub presentation_id: Uuid,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub body: String,
}

/// Inserts a comment scoped to the presenter's current slide index, read
/// from the presentation row in the same statement. The poster's local idea
/// of the current slide never reaches the database, so a comment can never
/// land on a slide the presenter has already left.
///
/// Returns None when the presentation is missing or not live.
pub async fn insert_comment(
    tx: &mut Transaction<'_, Postgres>,
    params: CreateCommentParams,
) -> Result<Option<Comment>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "comments.insert_comment",
        sqlx::query_as::<_, Comment>(
            r#"
                INSERT INTO live.comment
                    (presentation_id, slide_index, author_id, author_display_name, body)
                SELECT p.id, p.current_slide_index, $2, $3, $4
                FROM deck.presentation p
                WHERE p.id = $1
                  AND p.is_live
                RETURNING *
            "#,
        )
        .bind(params.presentation_id)
        .bind(params.author_id)
        .bind(params.author_display_name)
        .bind(params.body)
        .fetch_optional(&mut **tx)
    )?;

    Ok(row)
}

pub async fn find_comment_by_id(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<Option<Comment>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "comments.find_comment_by_id",
        sqlx::query_as::<_, Comment>(
            r#"
                SELECT * FROM live.comment WHERE id = $1
            "#,
        )
        .bind(comment_id)
        .fetch_optional(pool)
    )?;

    Ok(row)
}

/// Row-locks a comment for reply edits and grouping; serializes concurrent
/// writers of the embedded replies column.
pub async fn lock_comment(
    tx: &mut Transaction<'_, Postgres>,
    comment_id: Uuid,
) -> Result<Option<Comment>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "comments.lock_comment",
        sqlx::query_as::<_, Comment>(
            r#"
                SELECT * FROM live.comment WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(comment_id)
        .fetch_optional(&mut **tx)
    )?;

    Ok(row)
}

pub async fn list_comments_for_slide(
    pool: &PgPool,
    presentation_id: Uuid,
    slide_index: i32,
) -> Result<Vec<Comment>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "comments.list_comments_for_slide",
        sqlx::query_as::<_, Comment>(
            r#"
                SELECT * FROM live.comment
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

/// Toggles the participant's membership in liked_by as one atomic
/// set-difference/union statement. Never an increment, so concurrent
/// togglers from different clients converge.
pub async fn toggle_like(
    pool: &PgPool,
    comment_id: Uuid,
    participant_id: Uuid,
) -> Result<Option<Comment>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "comments.toggle_like",
        sqlx::query_as::<_, Comment>(
            r#"
                UPDATE live.comment
                SET liked_by = CASE
                        WHEN $2 = ANY(liked_by) THEN array_remove(liked_by, $2)
                        ELSE array_append(liked_by, $2)
                    END,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(comment_id)
        .bind(participant_id)
        .fetch_optional(pool)
    )?;

    Ok(row)
}

pub async fn update_replies(
    tx: &mut Transaction<'_, Postgres>,
    comment_id: Uuid,
    replies: &[Reply],
) -> Result<Option<Comment>, AppError> {
    let payload = serde_json::to_value(replies)?;
    let row = crate::log_query_fetch_optional!(
        "comments.update_replies",
        sqlx::query_as::<_, Comment>(
            r#"
                UPDATE live.comment
                SET replies = $2,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(comment_id)
        .bind(payload)
        .fetch_optional(&mut **tx)
    )?;

    Ok(row)
}

pub async fn set_group(
    tx: &mut Transaction<'_, Postgres>,
    comment_id: Uuid,
    group_id: Option<Uuid>,
) -> Result<Option<Comment>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "comments.set_group",
        sqlx::query_as::<_, Comment>(
            r#"
                UPDATE live.comment
                SET group_id = $2,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $1
                RETURNING *
            "#,
        )
        .bind(comment_id)
        .bind(group_id)
        .fetch_optional(&mut **tx)
    )?;

    Ok(row)
}

/// Clears group_id on every member of the group. Run in the same
/// transaction that deletes the group so no comment ever points at a
/// deleted group.
pub async fn detach_group_members(
    tx: &mut Transaction<'_, Postgres>,
    group_id: Uuid,
) -> Result<Vec<Comment>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "comments.detach_group_members",
        sqlx::query_as::<_, Comment>(
            r#"
                UPDATE live.comment
                SET group_id = NULL,
                    updated_at = CURRENT_TIMESTAMP
                WHERE group_id = $1
                RETURNING *
            "#,
        )
        .bind(group_id)
        .fetch_all(&mut **tx)
    )?;

    Ok(rows)
}

pub async fn delete_comment(
    tx: &mut Transaction<'_, Postgres>,
    comment_id: Uuid,
) -> Result<u64, AppError> {
    let result = crate::log_query_execute!(
        "comments.delete_comment",
        sqlx::query(
            r#"
                DELETE FROM live.comment WHERE id = $1
            "#,
        )
        .bind(comment_id)
        .execute(&mut **tx)
    )?;

    Ok(result.rows_affected())
}
