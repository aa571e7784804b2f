use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::middleware::Identity,
    dto::{
        comments::CommentView,
        groups::{AddCommentToGroupRequest, CreateGroupRequest, GroupView, MoveGroupRequest, UpdateGroupRequest},
    },
    error::AppError,
    models::{comments::Comment, groups::CommentGroup},
    realtime::{
        moves,
        protocol::{ChangeKind, ServerMessage},
        room,
    },
    repositories::{
        comments as comment_repo, groups as group_repo, groups::CreateGroupParams,
    },
    telemetry::BusinessEvent,
    usecases::presentations::{ensure_can_view, require_presentation},
};

const MAX_LABEL_LENGTH: usize = 120;

pub struct GroupService;

impl GroupService {
    /// Wraps a single comment in a brand-new group at the dropped position.
    /// A comment that is already grouped is re-parented, never duplicated.
    pub async fn create_group(
        pool: &PgPool,
        rooms: &room::Rooms,
        presentation_id: Uuid,
        identity: &Identity,
        req: CreateGroupRequest,
    ) -> Result<GroupView, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_can_view(&presentation, identity)?;
        let label = normalize_label(req.label)?;
        validate_position(req.position_x, req.position_y)?;

        let mut tx = pool.begin().await?;
        let comment = comment_repo::lock_comment(&mut tx, req.comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        if comment.presentation_id != presentation_id {
            return Err(AppError::BadRequest(
                "Comment belongs to a different presentation".to_string(),
            ));
        }

        let mut detached_from = None;
        if let Some(previous_id) = comment.group_id {
            if let Some(previous) = group_repo::lock_group(&mut tx, previous_id).await? {
                let remaining: Vec<Uuid> = previous
                    .comment_ids
                    .iter()
                    .copied()
                    .filter(|id| *id != comment.id)
                    .collect();
                detached_from =
                    group_repo::set_comment_ids(&mut tx, previous_id, &remaining).await?;
            }
        }

        let group = group_repo::insert_group(
            &mut tx,
            CreateGroupParams {
                presentation_id,
                slide_index: comment.slide_index,
                label,
                seed_comment_id: comment.id,
                position_x: req.position_x,
                position_y: req.position_y,
            },
        )
        .await?;
        let comment = comment_repo::set_group(&mut tx, comment.id, Some(group.id))
            .await?
            .ok_or(AppError::Internal(
                "Comment vanished while grouping".to_string(),
            ))?;
        tx.commit().await?;

        BusinessEvent::GroupCreated {
            group_id: group.id,
            presentation_id,
            slide_index: group.slide_index,
            seed_comment_id: comment.id,
        }
        .log();

        if let Some(previous) = detached_from {
            room::publish(
                rooms,
                presentation_id,
                ServerMessage::group_delta(ChangeKind::Modified, previous.into()),
            );
        }
        let view = GroupView::from(group);
        room::publish(
            rooms,
            presentation_id,
            ServerMessage::group_delta(ChangeKind::Added, view.clone()),
        );
        room::publish(
            rooms,
            presentation_id,
            ServerMessage::comment_delta(ChangeKind::Modified, CommentView::from(comment)),
        );

        Ok(view)
    }

    /// Adds a comment to an existing group; both sides of the reference are
    /// written in one transaction. Already-member calls are a no-op.
    pub async fn add_comment(
        pool: &PgPool,
        rooms: &room::Rooms,
        group_id: Uuid,
        identity: &Identity,
        req: AddCommentToGroupRequest,
    ) -> Result<GroupView, AppError> {
        let group = group_repo::find_group_by_id(pool, group_id)
            .await?
            .ok_or(AppError::NotFound("Group not found".to_string()))?;
        let presentation = require_presentation(pool, group.presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let mut tx = pool.begin().await?;
        let group = group_repo::lock_group(&mut tx, group_id)
            .await?
            .ok_or(AppError::NotFound("Group not found".to_string()))?;
        let comment = comment_repo::lock_comment(&mut tx, req.comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        if comment.presentation_id != group.presentation_id
            || comment.slide_index != group.slide_index
        {
            return Err(AppError::BadRequest(
                "Comment and group belong to different slides".to_string(),
            ));
        }

        if group.contains(comment.id) && comment.group_id == Some(group.id) {
            tx.commit().await?;
            return Ok(GroupView::from(group));
        }

        let mut detached_from = None;
        if let Some(previous_id) = comment.group_id.filter(|id| *id != group_id) {
            if let Some(previous) = group_repo::lock_group(&mut tx, previous_id).await? {
                let remaining: Vec<Uuid> = previous
                    .comment_ids
                    .iter()
                    .copied()
                    .filter(|id| *id != comment.id)
                    .collect();
                detached_from =
                    group_repo::set_comment_ids(&mut tx, previous_id, &remaining).await?;
            }
        }

        let mut comment_ids = group.comment_ids.clone();
        if !comment_ids.contains(&comment.id) {
            comment_ids.push(comment.id);
        }
        let group = group_repo::set_comment_ids(&mut tx, group_id, &comment_ids)
            .await?
            .ok_or(AppError::NotFound("Group not found".to_string()))?;
        let comment = comment_repo::set_group(&mut tx, comment.id, Some(group_id))
            .await?
            .ok_or(AppError::Internal(
                "Comment vanished while grouping".to_string(),
            ))?;
        tx.commit().await?;

        BusinessEvent::CommentGrouped {
            comment_id: comment.id,
            group_id,
        }
        .log();

        if let Some(previous) = detached_from {
            room::publish(
                rooms,
                presentation.id,
                ServerMessage::group_delta(ChangeKind::Modified, previous.into()),
            );
        }
        let view = GroupView::from(group);
        room::publish(
            rooms,
            presentation.id,
            ServerMessage::group_delta(ChangeKind::Modified, view.clone()),
        );
        room::publish(
            rooms,
            presentation.id,
            ServerMessage::comment_delta(ChangeKind::Modified, CommentView::from(comment)),
        );

        Ok(view)
    }

    /// Deletes the group after detaching every member in the same
    /// transaction. Members are orphaned back into the ungrouped list,
    /// never deleted.
    pub async fn remove_group(
        pool: &PgPool,
        rooms: &room::Rooms,
        group_id: Uuid,
        identity: &Identity,
    ) -> Result<(), AppError> {
        let group = group_repo::find_group_by_id(pool, group_id)
            .await?
            .ok_or(AppError::NotFound("Group not found".to_string()))?;
        let presentation = require_presentation(pool, group.presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let mut tx = pool.begin().await?;
        let group = group_repo::lock_group(&mut tx, group_id)
            .await?
            .ok_or(AppError::NotFound("Group not found".to_string()))?;
        let detached = comment_repo::detach_group_members(&mut tx, group_id).await?;
        group_repo::delete_group(&mut tx, group_id).await?;
        tx.commit().await?;

        BusinessEvent::GroupRemoved {
            group_id,
            presentation_id: presentation.id,
            detached_comments: detached.len(),
        }
        .log();

        room::publish(
            rooms,
            presentation.id,
            ServerMessage::group_delta(ChangeKind::Removed, group.into()),
        );
        for comment in detached {
            room::publish(
                rooms,
                presentation.id,
                ServerMessage::comment_delta(ChangeKind::Modified, CommentView::from(comment)),
            );
        }

        Ok(())
    }

    /// Last-write-wins drag position. When a live room exists the write is
    /// coalesced: subscribers see every frame, the store only the last one
    /// per flush interval.
    pub async fn move_group(
        pool: &PgPool,
        rooms: &room::Rooms,
        group_id: Uuid,
        identity: &Identity,
        req: MoveGroupRequest,
    ) -> Result<GroupView, AppError> {
        validate_position(req.position_x, req.position_y)?;
        let group = group_repo::find_group_by_id(pool, group_id)
            .await?
            .ok_or(AppError::NotFound("Group not found".to_string()))?;
        let presentation = require_presentation(pool, group.presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let mut view = GroupView::from(group);
        view.position_x = req.position_x;
        view.position_y = req.position_y;

        match room::lookup_room(rooms, presentation.id) {
            Some(active) => {
                moves::queue_move(&active, group_id, req.position_x, req.position_y).await;
                active.publish(ServerMessage::group_delta(ChangeKind::Modified, view.clone()));
            }
            None => {
                group_repo::update_position(pool, group_id, req.position_x, req.position_y)
                    .await?;
            }
        }

        Ok(view)
    }

    /// Rename and collapse toggles; the label is instructor-editable free
    /// text.
    pub async fn update_group(
        pool: &PgPool,
        rooms: &room::Rooms,
        group_id: Uuid,
        identity: &Identity,
        req: UpdateGroupRequest,
    ) -> Result<GroupView, AppError> {
        let group = group_repo::find_group_by_id(pool, group_id)
            .await?
            .ok_or(AppError::NotFound("Group not found".to_string()))?;
        let presentation = require_presentation(pool, group.presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let label = match req.label {
            Some(label) => Some(normalize_label(Some(label))?),
            None => None,
        };
        let updated = group_repo::update_group(pool, group_id, label, req.collapsed)
            .await?
            .ok_or(AppError::NotFound("Group not found".to_string()))?;

        let view = GroupView::from(updated);
        room::publish(
            rooms,
            presentation.id,
            ServerMessage::group_delta(ChangeKind::Modified, view.clone()),
        );

        Ok(view)
    }

    /// Assembles the reconciled annotation set for one slide. This backs
    /// both the HTTP snapshot endpoint and the WebSocket feed (re)scope.
    pub async fn load_annotations(
        pool: &PgPool,
        presentation_id: Uuid,
        slide_index: i32,
    ) -> Result<(Vec<CommentView>, Vec<GroupView>), AppError> {
        let comments =
            comment_repo::list_comments_for_slide(pool, presentation_id, slide_index).await?;
        let groups =
            group_repo::list_groups_for_slide(pool, presentation_id, slide_index).await?;

        let (comments, groups, dropped) = reconcile_annotations(comments, groups);
        if dropped > 0 {
            BusinessEvent::AnnotationDriftRepaired {
                presentation_id,
                slide_index,
                dropped_refs: dropped,
            }
            .log();
        }

        Ok((
            comments.into_iter().map(CommentView::from).collect(),
            groups.into_iter().map(GroupView::from).collect(),
        ))
    }
}

/// Repairs comment↔group cross-reference drift in a loaded slide set.
///
/// A group keeps only member ids whose comment exists and points back at it;
/// a comment keeps its group_id only when the surviving group still lists
/// it. Returns how many references were dropped on either side.
pub(crate) fn reconcile_annotations(
    mut comments: Vec<Comment>,
    mut groups: Vec<CommentGroup>,
) -> (Vec<Comment>, Vec<CommentGroup>, usize) {
    let mut dropped = 0;

    let backlinks: HashMap<Uuid, Option<Uuid>> = comments
        .iter()
        .map(|comment| (comment.id, comment.group_id))
        .collect();
    for group in &mut groups {
        let before = group.comment_ids.len();
        group
            .comment_ids
            .retain(|id| backlinks.get(id) == Some(&Some(group.id)));
        dropped += before - group.comment_ids.len();
    }

    let membership: HashMap<Uuid, &CommentGroup> = groups
        .iter()
        .map(|group| (group.id, group))
        .collect();
    for comment in &mut comments {
        let Some(group_id) = comment.group_id else {
            continue;
        };
        let listed = membership
            .get(&group_id)
            .is_some_and(|group| group.contains(comment.id));
        if !listed {
            comment.group_id = None;
            dropped += 1;
        }
    }

    (comments, groups, dropped)
}

fn normalize_label(label: Option<String>) -> Result<String, AppError> {
    let label = label.unwrap_or_default();
    let trimmed = label.trim();
    if trimmed.chars().count() > MAX_LABEL_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Group label exceeds {MAX_LABEL_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_position(position_x: f64, position_y: f64) -> Result<(), AppError> {
    if !position_x.is_finite() || !position_y.is_finite() {
        return Err(AppError::ValidationError(
            "Group position must be finite".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn comment(group_id: Option<Uuid>) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            presentation_id: Uuid::new_v4(),
            slide_index: 0,
            author_id: Uuid::new_v4(),
            author_display_name: "Student".to_string(),
            body: "hm".to_string(),
            liked_by: Vec::new(),
            replies: Vec::new(),
            group_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn group(comment_ids: Vec<Uuid>) -> CommentGroup {
        CommentGroup {
            id: Uuid::new_v4(),
            presentation_id: Uuid::new_v4(),
            slide_index: 0,
            label: String::new(),
            comment_ids,
            position_x: 0.0,
            position_y: 0.0,
            collapsed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// C.id ∈ G.comment_ids ⇔ C.group_id == G.id, for all pairs.
    fn assert_bidirectional(comments: &[Comment], groups: &[CommentGroup]) {
        for group in groups {
            for id in &group.comment_ids {
                let member = comments.iter().find(|c| c.id == *id).expect("member exists");
                assert_eq!(member.group_id, Some(group.id));
            }
        }
        for comment in comments {
            if let Some(group_id) = comment.group_id {
                let owner = groups.iter().find(|g| g.id == group_id).expect("group exists");
                assert!(owner.contains(comment.id));
            }
        }
    }

    #[test]
    fn consistent_annotations_pass_through_unchanged() {
        let mut group_a = group(vec![]);
        let member = comment(Some(group_a.id));
        group_a.comment_ids = vec![member.id];
        let loose = comment(None);

        let (comments, groups, dropped) =
            reconcile_annotations(vec![member, loose], vec![group_a]);
        assert_eq!(dropped, 0);
        assert_bidirectional(&comments, &groups);
        assert_eq!(groups[0].comment_ids.len(), 1);
    }

    #[test]
    fn dangling_member_ids_are_dropped() {
        let mut group_a = group(vec![]);
        let member = comment(Some(group_a.id));
        // One id points at a comment that no longer exists.
        group_a.comment_ids = vec![member.id, Uuid::new_v4()];

        let (comments, groups, dropped) = reconcile_annotations(vec![member], vec![group_a]);
        assert_eq!(dropped, 1);
        assert_eq!(groups[0].comment_ids.len(), 1);
        assert_bidirectional(&comments, &groups);
    }

    #[test]
    fn disagreeing_backlink_is_dropped_from_the_group() {
        let other_group = Uuid::new_v4();
        let mut group_a = group(vec![]);
        let defector = comment(Some(other_group));
        group_a.comment_ids = vec![defector.id];

        let (comments, groups, dropped) = reconcile_annotations(vec![defector], vec![group_a]);
        // Dropped from the group, and the backlink to the missing group is
        // cleared too.
        assert_eq!(dropped, 2);
        assert!(groups[0].comment_ids.is_empty());
        assert_eq!(comments[0].group_id, None);
        assert_bidirectional(&comments, &groups);
    }

    #[test]
    fn backlink_to_deleted_group_is_cleared() {
        let orphaned = comment(Some(Uuid::new_v4()));

        let (comments, groups, dropped) = reconcile_annotations(vec![orphaned], vec![]);
        assert_eq!(dropped, 1);
        assert_eq!(comments[0].group_id, None);
        assert_bidirectional(&comments, &groups);
    }

    #[test]
    fn unlisted_membership_claim_is_cleared() {
        let group_a = group(vec![]);
        let claimant = comment(Some(group_a.id));

        let (comments, groups, dropped) = reconcile_annotations(vec![claimant], vec![group_a]);
        assert_eq!(dropped, 1);
        assert_eq!(comments[0].group_id, None);
        assert_bidirectional(&comments, &groups);
    }

    #[test]
    fn labels_are_trimmed_and_bounded() {
        assert_eq!(
            normalize_label(Some("  Clarifications ".to_string())).unwrap(),
            "Clarifications"
        );
        assert_eq!(normalize_label(None).unwrap(), "");
        assert!(normalize_label(Some("x".repeat(MAX_LABEL_LENGTH + 1))).is_err());
    }

    #[test]
    fn non_finite_positions_are_rejected() {
        assert!(validate_position(f64::NAN, 0.0).is_err());
        assert!(validate_position(0.0, f64::INFINITY).is_err());
        assert!(validate_position(-120.5, 48.25).is_ok());
    }
}
