use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::middleware::Identity,
    dto::comments::{CommentListResponse, CommentView, PostCommentRequest, PostReplyRequest},
    error::AppError,
    models::comments::Reply,
    realtime::{
        protocol::{ChangeKind, ServerMessage},
        room,
    },
    repositories::{
        comments as comment_repo, comments::CreateCommentParams, groups as group_repo,
    },
    telemetry::BusinessEvent,
    usecases::presentations::{ensure_can_view, require_presentation},
};

const MIN_COMMENT_LENGTH: usize = 1;
const MAX_COMMENT_LENGTH: usize = 2000;

pub struct CommentService;

impl CommentService {
    /// Posts a comment onto the presenter's current slide. The slide index
    /// is read from the presentation record inside the insert itself, never
    /// taken from the posting client.
    pub async fn post_comment(
        pool: &PgPool,
        rooms: &room::Rooms,
        presentation_id: Uuid,
        identity: &Identity,
        req: PostCommentRequest,
    ) -> Result<CommentView, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_can_view(&presentation, identity)?;
        let body = normalize_comment_body(&req.body)?;

        let mut tx = pool.begin().await?;
        let comment = comment_repo::insert_comment(
            &mut tx,
            CreateCommentParams {
                presentation_id,
                author_id: identity.participant_id(),
                author_display_name: identity.display_name().to_string(),
                body,
            },
        )
        .await?
        .ok_or(AppError::Conflict(
            "Presentation is not live".to_string(),
        ))?;
        tx.commit().await?;

        BusinessEvent::CommentPosted {
            comment_id: comment.id,
            presentation_id,
            slide_index: comment.slide_index,
            author_id: comment.author_id,
        }
        .log();

        let view = CommentView::from(comment);
        room::publish(
            rooms,
            presentation_id,
            ServerMessage::comment_delta(ChangeKind::Added, view.clone()),
        );

        Ok(view)
    }

    /// Toggles the caller's like. Applying it twice nets back to the
    /// original state regardless of what other participants do in between.
    pub async fn toggle_like(
        pool: &PgPool,
        rooms: &room::Rooms,
        comment_id: Uuid,
        identity: &Identity,
    ) -> Result<CommentView, AppError> {
        let comment = comment_repo::find_comment_by_id(pool, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        let presentation = require_presentation(pool, comment.presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let updated = comment_repo::toggle_like(pool, comment_id, identity.participant_id())
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;

        let view = CommentView::from(updated);
        room::publish(
            rooms,
            presentation.id,
            ServerMessage::comment_delta(ChangeKind::Modified, view.clone()),
        );

        Ok(view)
    }

    pub async fn post_reply(
        pool: &PgPool,
        rooms: &room::Rooms,
        comment_id: Uuid,
        identity: &Identity,
        req: PostReplyRequest,
    ) -> Result<CommentView, AppError> {
        let comment = comment_repo::find_comment_by_id(pool, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        let presentation = require_presentation(pool, comment.presentation_id).await?;
        ensure_can_view(&presentation, identity)?;
        let body = normalize_comment_body(&req.body)?;

        let mut tx = pool.begin().await?;
        let locked = comment_repo::lock_comment(&mut tx, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        let mut replies = locked.replies;
        replies.push(Reply {
            id: Uuid::new_v4(),
            author_id: identity.participant_id(),
            author_display_name: identity.display_name().to_string(),
            body,
            liked_by: Vec::new(),
            created_at: Utc::now(),
        });
        let updated = comment_repo::update_replies(&mut tx, comment_id, &replies)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        tx.commit().await?;

        let view = CommentView::from(updated);
        room::publish(
            rooms,
            presentation.id,
            ServerMessage::comment_delta(ChangeKind::Modified, view.clone()),
        );

        Ok(view)
    }

    /// Reply likes are their own set, independent of the parent comment's.
    pub async fn toggle_reply_like(
        pool: &PgPool,
        rooms: &room::Rooms,
        comment_id: Uuid,
        reply_id: Uuid,
        identity: &Identity,
    ) -> Result<CommentView, AppError> {
        let comment = comment_repo::find_comment_by_id(pool, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        let presentation = require_presentation(pool, comment.presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let mut tx = pool.begin().await?;
        let locked = comment_repo::lock_comment(&mut tx, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        let mut replies = locked.replies;
        let reply = replies
            .iter_mut()
            .find(|reply| reply.id == reply_id)
            .ok_or(AppError::NotFound("Reply not found".to_string()))?;
        toggle_membership(&mut reply.liked_by, identity.participant_id());
        let updated = comment_repo::update_replies(&mut tx, comment_id, &replies)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        tx.commit().await?;

        let view = CommentView::from(updated);
        room::publish(
            rooms,
            presentation.id,
            ServerMessage::comment_delta(ChangeKind::Modified, view.clone()),
        );

        Ok(view)
    }

    /// Author or any instructor. The comment leaves its group in the same
    /// transaction that deletes it, so the group never lists a dead id.
    pub async fn delete_comment(
        pool: &PgPool,
        rooms: &room::Rooms,
        comment_id: Uuid,
        identity: &Identity,
    ) -> Result<(), AppError> {
        let comment = comment_repo::find_comment_by_id(pool, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        let presentation = require_presentation(pool, comment.presentation_id).await?;
        ensure_can_view(&presentation, identity)?;
        if !identity.is_instructor() && identity.participant_id() != comment.author_id {
            return Err(AppError::Forbidden(
                "Only the author or an instructor may delete a comment".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;
        let locked = comment_repo::lock_comment(&mut tx, comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        let mut group_update = None;
        if let Some(group_id) = locked.group_id {
            if let Some(group) = group_repo::lock_group(&mut tx, group_id).await? {
                let remaining: Vec<Uuid> = group
                    .comment_ids
                    .iter()
                    .copied()
                    .filter(|id| *id != comment_id)
                    .collect();
                group_update = group_repo::set_comment_ids(&mut tx, group_id, &remaining).await?;
            }
        }
        comment_repo::delete_comment(&mut tx, comment_id).await?;
        tx.commit().await?;

        BusinessEvent::CommentDeleted {
            comment_id,
            presentation_id: presentation.id,
            actor_id: identity.participant_id(),
        }
        .log();

        room::publish(
            rooms,
            presentation.id,
            ServerMessage::comment_delta(ChangeKind::Removed, CommentView::from(locked)),
        );
        if let Some(group) = group_update {
            room::publish(
                rooms,
                presentation.id,
                ServerMessage::group_delta(ChangeKind::Modified, group.into()),
            );
        }

        Ok(())
    }

    pub async fn list_for_slide(
        pool: &PgPool,
        presentation_id: Uuid,
        slide_index: i32,
        identity: &Identity,
    ) -> Result<CommentListResponse, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let rows =
            comment_repo::list_comments_for_slide(pool, presentation_id, slide_index).await?;
        Ok(CommentListResponse {
            data: rows.into_iter().map(CommentView::from).collect(),
        })
    }
}

fn normalize_comment_body(body: &str) -> Result<String, AppError> {
    let trimmed = body.trim();
    let len = trimmed.chars().count();
    if len < MIN_COMMENT_LENGTH {
        return Err(AppError::ValidationError(
            "Comment text is required".to_string(),
        ));
    }
    if len > MAX_COMMENT_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Comment text exceeds {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Set-semantics like toggle shared by replies; comments toggle atomically
/// in SQL with the same union/difference rule.
pub(crate) fn toggle_membership(set: &mut Vec<Uuid>, participant_id: Uuid) -> bool {
    if let Some(index) = set.iter().position(|id| *id == participant_id) {
        set.remove(index);
        false
    } else {
        set.push(participant_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_comment_text() {
        assert!(matches!(
            normalize_comment_body("   "),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_oversized_comment_text() {
        let body = "a".repeat(MAX_COMMENT_LENGTH + 1);
        assert!(matches!(
            normalize_comment_body(&body),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn trims_comment_text() {
        assert_eq!(normalize_comment_body("  hi there ").unwrap(), "hi there");
    }

    #[test]
    fn like_toggle_is_idempotent_per_user() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut set = vec![other];

        // Twice nets back to the original state.
        assert!(toggle_membership(&mut set, user));
        assert!(!toggle_membership(&mut set, user));
        assert_eq!(set, vec![other]);

        // Three times lands on the once-applied state.
        toggle_membership(&mut set, user);
        toggle_membership(&mut set, user);
        toggle_membership(&mut set, user);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&user));
    }

    #[test]
    fn like_toggle_never_double_counts() {
        let user = Uuid::new_v4();
        let mut set = Vec::new();
        toggle_membership(&mut set, user);
        // A replayed add (double submit) cannot inflate the set.
        if !set.contains(&user) {
            set.push(user);
        }
        assert_eq!(set.len(), 1);
    }
}
