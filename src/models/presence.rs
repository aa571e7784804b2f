use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Deduplicated viewer list entry served to clients, projected from the
/// live.presence session rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PresenceViewer {
    pub viewer_id: Uuid,
    pub display_name: String,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
}
