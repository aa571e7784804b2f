use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{app::state::AppState, error::AppError};

pub const ANON_ID_HEADER: &str = "x-anon-id";
pub const ANON_NAME_HEADER: &str = "x-anon-name";

const DEFAULT_ANON_NAME: &str = "Anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Instructor,
    Student,
}

impl Role {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "instructor" => Some(Self::Instructor),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

/// The identity a request acts as. Accounts come from the external auth
/// provider's token; anonymous viewers carry a client-generated pseudo-id
/// that is stable per browser profile but spoofable by design.
#[derive(Debug, Clone)]
pub enum Identity {
    Account {
        user_id: Uuid,
        display_name: String,
        role: Role,
    },
    Anonymous {
        viewer_id: Uuid,
        display_name: String,
    },
}

impl Identity {
    /// The id likes, votes, and authorship are tracked under.
    pub fn participant_id(&self) -> Uuid {
        match self {
            Identity::Account { user_id, .. } => *user_id,
            Identity::Anonymous { viewer_id, .. } => *viewer_id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Identity::Account { display_name, .. } => display_name,
            Identity::Anonymous { display_name, .. } => display_name,
        }
    }

    pub fn is_instructor(&self) -> bool {
        matches!(
            self,
            Identity::Account {
                role: Role::Instructor,
                ..
            }
        )
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous { .. })
    }
}

/// Requires an account token. Used for authoring and live-control routes.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or(AppError::Unauthorized(
        "Missing authorization token".to_string(),
    ))?;
    let identity = account_identity(&state, &token)?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Accepts an account token or an anonymous pseudo-id. Used for viewer
/// routes; whether an anonymous identity may actually see a presentation
/// depends on its audience mode and is checked in the usecases.
pub async fn viewer_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = if let Some(token) = bearer_token(&req) {
        account_identity(&state, &token)?
    } else if let Some(viewer_id) = anon_id(&req) {
        let display_name = anon_name(&req).unwrap_or_else(|| DEFAULT_ANON_NAME.to_string());
        Identity::Anonymous {
            viewer_id,
            display_name,
        }
    } else {
        return Err(AppError::Unauthorized(
            "Missing authorization token or anonymous id".to_string(),
        ));
    };

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

fn account_identity(state: &AppState, token: &str) -> Result<Identity, AppError> {
    let claims = state
        .jwt_config
        .verify_token(token)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id".to_string()))?;
    let role = Role::parse(&claims.role)
        .ok_or(AppError::Unauthorized("Unknown role".to_string()))?;

    Ok(Identity::Account {
        user_id,
        display_name: claims.name,
        role,
    })
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| query_params(req).get("token").cloned())
}

fn anon_id(req: &Request) -> Option<Uuid> {
    req.headers()
        .get(ANON_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| query_params(req).get("anonId").cloned())
        .and_then(|value| Uuid::parse_str(&value).ok())
}

fn anon_name(req: &Request) -> Option<String> {
    req.headers()
        .get(ANON_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| query_params(req).get("anonName").cloned())
        .filter(|value| !value.trim().is_empty())
}

fn query_params(req: &Request) -> std::collections::HashMap<String, String> {
    let query = req.uri().query().unwrap_or("");
    serde_urlencoded::from_str(query).unwrap_or_default()
}
