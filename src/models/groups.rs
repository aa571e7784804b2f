use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Comment group model mapped to live.comment_group.
///
/// Invariant: a comment id listed in comment_ids has its group_id set to this
/// group's id. Both sides are written in one transaction; drift that slips
/// through anyway is dropped by the reconciliation pass on snapshot load.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentGroup {
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

impl CommentGroup {
    pub fn contains(&self, comment_id: Uuid) -> bool {
        self.comment_ids.contains(&comment_id)
    }
}
