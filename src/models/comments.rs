use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Reply embedded in its parent comment's JSONB column. Replies have no
/// standalone row; deleting the parent deletes them with it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub body: String,
    pub liked_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Reply {
    pub fn like_count(&self) -> usize {
        self.liked_by.len()
    }
}

/// Comment model mapped to live.comment.
///
/// liked_by is the sole source of truth for likes; the count is always
/// derived from its cardinality and never stored separately.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub presentation_id: Uuid,
    pub slide_index: i32,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub body: String,
    pub liked_by: Vec<Uuid>,
    #[sqlx(json)]
    pub replies: Vec<Reply>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn like_count(&self) -> usize {
        self.liked_by.len()
    }
}
