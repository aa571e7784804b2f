use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(tag = "event_type")]
pub enum BusinessEvent {
    PresentationCreated {
        presentation_id: Uuid,
        course_id: Uuid,
        owner_id: Uuid,
    },
    PresentationDeleted {
        presentation_id: Uuid,
        actor_id: Uuid,
    },
    PresentationWentLive {
        presentation_id: Uuid,
        course_id: Uuid,
        actor_id: Uuid,
        demoted: Vec<Uuid>,
    },
    PresentationNavigated {
        presentation_id: Uuid,
        slide_index: i32,
    },
    PresentationEnded {
        presentation_id: Uuid,
        course_id: Uuid,
        actor_id: Uuid,
    },
    SlideCreated {
        slide_id: Uuid,
        presentation_id: Uuid,
        position: i32,
    },
    SlideDeleted {
        slide_id: Uuid,
        presentation_id: Uuid,
    },
    CommentPosted {
        comment_id: Uuid,
        presentation_id: Uuid,
        slide_index: i32,
        author_id: Uuid,
    },
    CommentDeleted {
        comment_id: Uuid,
        presentation_id: Uuid,
        actor_id: Uuid,
    },
    GroupCreated {
        group_id: Uuid,
        presentation_id: Uuid,
        slide_index: i32,
        seed_comment_id: Uuid,
    },
    CommentGrouped {
        comment_id: Uuid,
        group_id: Uuid,
    },
    GroupRemoved {
        group_id: Uuid,
        presentation_id: Uuid,
        detached_comments: usize,
    },
    VoteCast {
        slide_id: Uuid,
        presentation_id: Uuid,
    },
    ViewerJoined {
        presentation_id: Uuid,
        viewer_id: Uuid,
        anonymous: bool,
    },
    ViewerLeft {
        presentation_id: Uuid,
        viewer_id: Uuid,
    },
    AnnotationDriftRepaired {
        presentation_id: Uuid,
        slide_index: i32,
        dropped_refs: usize,
    },
}

impl BusinessEvent {
    pub fn log(&self) {
        let event_json = serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self));
        info!(
            target: "business_events",
            event = %event_json,
            "Business event occurred"
        );
    }
}
