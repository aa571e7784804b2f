use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dto::{comments::CommentView, groups::GroupView, presentations::PresentationView},
    models::polls::PollTally,
};

/// Delta tag for collection members. Consumers fold these into an id-keyed
/// map, so replayed or cross-writer-reordered deltas converge to the same
/// state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// Frames fanned out to every subscriber of a presentation room, and sent
/// directly to single sessions for snapshots. Serialized as tagged JSON text
/// frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// The full presentation record, delivered on connect and again on every
    /// remote mutation.
    #[serde(rename_all = "camelCase")]
    Presentation { presentation: PresentationView },
    /// Full annotation set for one slide; replaces whatever the feed held.
    #[serde(rename_all = "camelCase")]
    Annotations {
        slide_index: i32,
        comments: Vec<CommentView>,
        groups: Vec<GroupView>,
    },
    #[serde(rename_all = "camelCase")]
    CommentChanged {
        slide_index: i32,
        change: ChangeKind,
        comment: CommentView,
    },
    #[serde(rename_all = "camelCase")]
    GroupChanged {
        slide_index: i32,
        change: ChangeKind,
        group: GroupView,
    },
    #[serde(rename_all = "camelCase")]
    PollTally { tally: PollTally },
    /// Terminal frame: the deck stopped being authoritative. Clients show
    /// "presentation ended", not a frozen last slide.
    #[serde(rename_all = "camelCase")]
    SessionEnded { presentation_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

impl ServerMessage {
    pub fn comment_delta(change: ChangeKind, comment: CommentView) -> Self {
        Self::CommentChanged {
            slide_index: comment.slide_index,
            change,
            comment,
        }
    }

    pub fn group_delta(change: ChangeKind, group: GroupView) -> Self {
        Self::GroupChanged {
            slide_index: group.slide_index,
            change,
            group,
        }
    }
}

/// Frames viewers may send upstream. Viewers are passive followers; the only
/// upstream traffic is liveness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Heartbeat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_frames_carry_type_tag() {
        let message = ServerMessage::SessionEnded {
            presentation_id: Uuid::new_v4(),
        };
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["type"], "sessionEnded");
        assert!(value["presentationId"].is_string());
    }

    #[test]
    fn change_kind_is_lowercase_on_the_wire() {
        let value = serde_json::to_value(ChangeKind::Removed).expect("serialize");
        assert_eq!(value, "removed");
    }

    #[test]
    fn heartbeat_parses() {
        let message: ClientMessage =
            serde_json::from_str(r#"{"type":"heartbeat"}"#).expect("parse");
        assert_eq!(message, ClientMessage::Heartbeat);
    }

    #[test]
    fn unknown_client_frame_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"type":"navigate"}"#);
        assert!(result.is_err());
    }
}
