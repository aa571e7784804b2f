use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::groups::CommentGroup;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub comment_id: Uuid,
    pub label: Option<String>,
    pub position_x: f64,
    pub position_y: f64,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentToGroupRequest {
    pub comment_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MoveGroupRequest {
    pub position_x: f64,
    pub position_y: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub label: Option<String>,
    pub collapsed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: Uuid,
    pub presentation_id: Uuid,
    pub slide_index: i32,
    pub label: String,
    pub comment_ids: Vec<Uuid>,
    pub position_x: f64,
    pub position_y: f64,
    pub collapsed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentGroup> for GroupView {
    fn from(group: CommentGroup) -> Self {
        Self {
            id: group.id,
            presentation_id: group.presentation_id,
            slide_index: group.slide_index,
            label: group.label,
            comment_ids: group.comment_ids,
            position_x: group.position_x,
            position_y: group.position_y,
            collapsed: group.collapsed,
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSnapshotResponse {
    pub slide_index: i32,
    pub comments: Vec<crate::dto::comments::CommentView>,
    pub groups: Vec<GroupView>,
}
