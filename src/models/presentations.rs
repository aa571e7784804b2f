use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Audience mode mapping for deck.audience_mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "deck.audience_mode", rename_all = "lowercase")]
pub enum AudienceMode {
    Enrolled,
    Anonymous,
}

impl AudienceMode {
    /// Returns true when viewers without an enrolled account may join.
    pub fn admits_anonymous(self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

/// Presentation model mapped to deck.presentation.
///
/// current_slide_index and is_live are conceptually owned by the presenting
/// instructor; only the owner may write them (enforced in the usecases, the
/// data layer has no lock).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Presentation {
    pub id: Uuid,
    pub course_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub current_slide_index: i32,
    pub is_live: bool,
    pub audience_mode: AudienceMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::AudienceMode;

    #[test]
    fn enrolled_mode_rejects_anonymous() {
        assert!(!AudienceMode::Enrolled.admits_anonymous());
        assert!(AudienceMode::Anonymous.admits_anonymous());
    }
}
