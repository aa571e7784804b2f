use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::slides::{Slide, SlideBody, SlideKind};

#[derive(Debug, Deserialize)]
pub struct CreateSlideRequest {
    pub body: SlideBody,
    /// Insert position; appended when omitted or past the end.
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSlideRequest {
    pub body: SlideBody,
}

#[derive(Debug, Deserialize)]
pub struct MoveSlideRequest {
    pub to_position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlideView {
    pub id: Uuid,
    pub presentation_id: Uuid,
    pub position: i32,
    pub kind: SlideKind,
    pub body: SlideBody,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Slide> for SlideView {
    fn from(slide: Slide) -> Self {
        Self {
            id: slide.id,
            presentation_id: slide.presentation_id,
            position: slide.position,
            kind: slide.kind,
            body: slide.body,
            created_at: slide.created_at,
            updated_at: slide.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SlideListResponse {
    pub data: Vec<SlideView>,
}
