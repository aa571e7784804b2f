use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::comments::{Comment, Reply};

#[derive(Debug, Deserialize)]
pub struct PostCommentRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct PostReplyRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub body: String,
    pub liked_by: Vec<Uuid>,
    pub likes: usize,
    pub created_at: DateTime<Utc>,
}

impl From<Reply> for ReplyView {
    fn from(reply: Reply) -> Self {
        let likes = reply.like_count();
        Self {
            id: reply.id,
            author_id: reply.author_id,
            author_display_name: reply.author_display_name,
            body: reply.body,
            liked_by: reply.liked_by,
            likes,
            created_at: reply.created_at,
        }
    }
}

/// Wire view of a comment. likes is derived from liked_by on every mapping;
/// the two can never drift because only the set is stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub presentation_id: Uuid,
    pub slide_index: i32,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub body: String,
    pub liked_by: Vec<Uuid>,
    pub likes: usize,
    pub replies: Vec<ReplyView>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        let likes = comment.like_count();
        Self {
            id: comment.id,
            presentation_id: comment.presentation_id,
            slide_index: comment.slide_index,
            author_id: comment.author_id,
            author_display_name: comment.author_display_name,
            body: comment.body,
            liked_by: comment.liked_by,
            likes,
            replies: comment.replies.into_iter().map(ReplyView::from).collect(),
            group_id: comment.group_id,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub data: Vec<CommentView>,
}
