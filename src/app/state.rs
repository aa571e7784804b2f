use sqlx::PgPool;
use std::sync::Arc;

use crate::{auth::jwt::JwtConfig, realtime::room::Rooms};
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: Option<redis::Client>,
    pub jwt_config: JwtConfig,
    pub rooms: Rooms,
}

impl AppState {
    pub fn new(db: PgPool) -> Self {
        let redis = match std::env::var("REDIS_URL") {
            Ok(url) => match redis::Client::open(url) {
                Ok(client) => Some(client),
                Err(error) => {
                    warn!("Redis cache not configured: {}", error);
                    None
                }
            },
            Err(_) => None,
        };

        let secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "slidecast-dev-secret".to_string());

        Self {
            db,
            redis,
            jwt_config: JwtConfig::from_env(secret),
            rooms: Arc::new(dashmap::DashMap::new()),
        }
    }
}
