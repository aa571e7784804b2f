use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    dto::{comments::CommentView, groups::GroupView},
    realtime::protocol::ChangeKind,
};

/// Per-connection view of "the current slide's annotations".
///
/// The feed is level-triggered: a snapshot replaces the whole state, deltas
/// fold in keyed by entity id. The scope captures the slide index at
/// subscribe time; any delivery tagged with a different index is discarded,
/// so a late delta from a cancelled subscription can never leak into the new
/// slide's view.
///
/// Between a rescope and its snapshot the state is "unknown", not "empty" —
/// callers must not render a loading feed as "no comments yet".
#[derive(Debug, Default)]
pub struct AnnotationFeed {
    scope: Option<Scope>,
}

#[derive(Debug)]
struct Scope {
    slide_index: i32,
    loaded: bool,
    comments: HashMap<Uuid, CommentView>,
    groups: HashMap<Uuid, GroupView>,
}

impl AnnotationFeed {
    pub fn new() -> Self {
        Self { scope: None }
    }

    /// Tears down the old scope and adopts the new slide index. Always
    /// unsubscribe-then-subscribe: the old map is dropped before the new
    /// index is observed, never the other way around.
    pub fn rescope(&mut self, slide_index: i32) {
        self.scope = Some(Scope {
            slide_index,
            loaded: false,
            comments: HashMap::new(),
            groups: HashMap::new(),
        });
    }

    pub fn slide_index(&self) -> Option<i32> {
        self.scope.as_ref().map(|scope| scope.slide_index)
    }

    /// True once the snapshot for the current scope has been applied.
    pub fn is_loaded(&self) -> bool {
        self.scope.as_ref().is_some_and(|scope| scope.loaded)
    }

    /// Applies a full snapshot. Returns false (and changes nothing) when the
    /// feed has moved to a different slide since the snapshot was requested.
    pub fn load_snapshot(
        &mut self,
        slide_index: i32,
        comments: Vec<CommentView>,
        groups: Vec<GroupView>,
    ) -> bool {
        let Some(scope) = self.scope.as_mut() else {
            return false;
        };
        if scope.slide_index != slide_index {
            return false;
        }

        scope.comments = comments
            .into_iter()
            .map(|comment| (comment.id, comment))
            .collect();
        scope.groups = groups.into_iter().map(|group| (group.id, group)).collect();
        scope.loaded = true;
        true
    }

    /// Folds one comment delta into the feed. Returns false when the delta
    /// is stale (different slide) or arrives while the snapshot is still
    /// loading; a rejected-while-loading delta is safe to drop because the
    /// pending snapshot already includes its effect or a newer one.
    pub fn apply_comment(
        &mut self,
        slide_index: i32,
        change: ChangeKind,
        comment: &CommentView,
    ) -> bool {
        let Some(scope) = self.in_scope(slide_index) else {
            return false;
        };
        match change {
            ChangeKind::Added | ChangeKind::Modified => {
                scope.comments.insert(comment.id, comment.clone());
            }
            ChangeKind::Removed => {
                scope.comments.remove(&comment.id);
            }
        }
        true
    }

    /// Folds one group delta into the feed; same guards as apply_comment.
    pub fn apply_group(&mut self, slide_index: i32, change: ChangeKind, group: &GroupView) -> bool {
        let Some(scope) = self.in_scope(slide_index) else {
            return false;
        };
        match change {
            ChangeKind::Added | ChangeKind::Modified => {
                scope.groups.insert(group.id, group.clone());
            }
            ChangeKind::Removed => {
                scope.groups.remove(&group.id);
            }
        }
        true
    }

    /// Comments in creation order, ties broken by id so every replica sorts
    /// identically.
    pub fn comments(&self) -> Vec<&CommentView> {
        let mut comments: Vec<&CommentView> = self
            .scope
            .iter()
            .flat_map(|scope| scope.comments.values())
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        comments
    }

    pub fn groups(&self) -> Vec<&GroupView> {
        let mut groups: Vec<&GroupView> = self
            .scope
            .iter()
            .flat_map(|scope| scope.groups.values())
            .collect();
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        groups
    }

    pub fn comment(&self, comment_id: Uuid) -> Option<&CommentView> {
        self.scope
            .as_ref()
            .and_then(|scope| scope.comments.get(&comment_id))
    }

    pub fn group(&self, group_id: Uuid) -> Option<&GroupView> {
        self.scope
            .as_ref()
            .and_then(|scope| scope.groups.get(&group_id))
    }

    fn in_scope(&mut self, slide_index: i32) -> Option<&mut Scope> {
        self.scope
            .as_mut()
            .filter(|scope| scope.loaded && scope.slide_index == slide_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn comment(slide_index: i32, body: &str) -> CommentView {
        CommentView {
            id: Uuid::new_v4(),
            presentation_id: Uuid::new_v4(),
            slide_index,
            author_id: Uuid::new_v4(),
            author_display_name: "Student".to_string(),
            body: body.to_string(),
            liked_by: Vec::new(),
            likes: 0,
            replies: Vec::new(),
            group_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn group(slide_index: i32, label: &str, comment_ids: Vec<Uuid>) -> GroupView {
        GroupView {
            id: Uuid::new_v4(),
            presentation_id: Uuid::new_v4(),
            slide_index,
            label: label.to_string(),
            comment_ids,
            position_x: 10.0,
            position_y: 20.0,
            collapsed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn loading_scope_is_unknown_not_empty() {
        let mut feed = AnnotationFeed::new();
        feed.rescope(0);
        assert_eq!(feed.slide_index(), Some(0));
        assert!(!feed.is_loaded());
        assert!(feed.comments().is_empty());
    }

    #[test]
    fn stale_slide_delta_is_discarded() {
        let mut feed = AnnotationFeed::new();
        feed.rescope(0);
        assert!(feed.load_snapshot(0, vec![], vec![]));

        feed.rescope(1);
        assert!(feed.load_snapshot(1, vec![comment(1, "on slide one")], vec![]));

        // A slide-0 delta arriving late, after the switch to slide 1.
        let late = comment(0, "late delivery");
        assert!(!feed.apply_comment(0, ChangeKind::Added, &late));

        let bodies: Vec<&str> = feed.comments().iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["on slide one"]);
    }

    #[test]
    fn snapshot_for_an_abandoned_scope_is_ignored() {
        let mut feed = AnnotationFeed::new();
        feed.rescope(1);
        feed.rescope(2);
        assert!(!feed.load_snapshot(1, vec![comment(1, "stale")], vec![]));
        assert!(!feed.is_loaded());
        assert_eq!(feed.slide_index(), Some(2));
    }

    #[test]
    fn delta_before_snapshot_is_rejected() {
        let mut feed = AnnotationFeed::new();
        feed.rescope(3);
        let early = comment(3, "raced the snapshot");
        assert!(!feed.apply_comment(3, ChangeKind::Added, &early));
        assert!(feed.load_snapshot(3, vec![], vec![]));
        assert!(feed.apply_comment(3, ChangeKind::Added, &early));
    }

    #[test]
    fn deltas_fold_by_id() {
        let mut feed = AnnotationFeed::new();
        feed.rescope(0);
        feed.load_snapshot(0, vec![], vec![]);

        let first = comment(0, "first");
        let second = comment(0, "second");
        assert!(feed.apply_comment(0, ChangeKind::Added, &first));
        assert!(feed.apply_comment(0, ChangeKind::Added, &second));

        let mut edited = first.clone();
        edited.body = "first, edited".to_string();
        assert!(feed.apply_comment(0, ChangeKind::Modified, &edited));
        assert!(feed.apply_comment(0, ChangeKind::Removed, &second));

        let bodies: Vec<&str> = feed.comments().iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first, edited"]);
    }

    #[test]
    fn replayed_delta_is_idempotent() {
        let mut feed = AnnotationFeed::new();
        feed.rescope(0);
        feed.load_snapshot(0, vec![], vec![]);

        let entry = comment(0, "once");
        assert!(feed.apply_comment(0, ChangeKind::Added, &entry));
        assert!(feed.apply_comment(0, ChangeKind::Added, &entry));
        assert_eq!(feed.comments().len(), 1);
    }

    #[test]
    fn comments_sort_by_creation_time() {
        let mut feed = AnnotationFeed::new();
        feed.rescope(0);
        feed.load_snapshot(0, vec![], vec![]);

        let mut older = comment(0, "older");
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = comment(0, "newer");
        assert!(feed.apply_comment(0, ChangeKind::Added, &newer));
        assert!(feed.apply_comment(0, ChangeKind::Added, &older));

        let bodies: Vec<&str> = feed.comments().iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["older", "newer"]);
    }

    #[test]
    fn comment_lifecycle_group_then_ungroup() {
        let mut feed = AnnotationFeed::new();
        feed.rescope(2);

        let question = comment(2, "What does X mean?");
        feed.load_snapshot(2, vec![question.clone()], vec![]);

        // Instructor drags the comment into a fresh "Clarifications" group.
        let clarifications = group(2, "Clarifications", vec![question.id]);
        assert!(feed.apply_group(2, ChangeKind::Added, &clarifications));
        let mut grouped = question.clone();
        grouped.group_id = Some(clarifications.id);
        assert!(feed.apply_comment(2, ChangeKind::Modified, &grouped));

        let held = feed.comment(question.id).expect("present");
        assert_eq!(held.group_id, Some(clarifications.id));
        assert_eq!(
            feed.group(clarifications.id).expect("present").comment_ids,
            vec![question.id]
        );

        // Group removal detaches the member instead of deleting it.
        assert!(feed.apply_group(2, ChangeKind::Removed, &clarifications));
        let mut detached = grouped.clone();
        detached.group_id = None;
        assert!(feed.apply_comment(2, ChangeKind::Modified, &detached));

        assert!(feed.group(clarifications.id).is_none());
        let held = feed.comment(question.id).expect("still present");
        assert_eq!(held.group_id, None);
        assert_eq!(feed.comments().len(), 1);
    }
}
