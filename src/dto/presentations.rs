use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::presentations::{AudienceMode, Presentation};

#[derive(Debug, Deserialize)]
pub struct CreatePresentationRequest {
    pub course_id: Uuid,
    pub title: String,
    pub audience_mode: Option<AudienceMode>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePresentationRequest {
    pub title: Option<String>,
    pub audience_mode: Option<AudienceMode>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NavigationDirection {
    Next,
    Prev,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub direction: NavigationDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresentationView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub current_slide_index: i32,
    pub is_live: bool,
    pub audience_mode: AudienceMode,
    pub slide_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PresentationView {
    pub fn from_record(presentation: Presentation, slide_count: i64) -> Self {
        Self {
            id: presentation.id,
            course_id: presentation.course_id,
            owner_id: presentation.owner_id,
            title: presentation.title,
            current_slide_index: presentation.current_slide_index,
            is_live: presentation.is_live,
            audience_mode: presentation.audience_mode,
            slide_count,
            created_at: presentation.created_at,
            updated_at: presentation.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PresentationListResponse {
    pub data: Vec<PresentationView>,
}

/// Resolution of a course's live-presentation pointer. presentation is None
/// when nothing is live; clients poll until one appears.
#[derive(Debug, Serialize)]
pub struct CourseLiveResponse {
    pub presentation: Option<PresentationView>,
}
