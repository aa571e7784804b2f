use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::middleware::{Identity, Role},
    dto::presentations::{
        CreatePresentationRequest, PresentationListResponse, PresentationView,
        UpdatePresentationRequest,
    },
    error::AppError,
    models::presentations::{AudienceMode, Presentation},
    repositories::{
        courses as course_repo, presentations as presentation_repo,
        presentations::CreatePresentationParams, slides as slide_repo,
    },
    telemetry::BusinessEvent,
};

const MAX_TITLE_LENGTH: usize = 200;

pub struct PresentationService;

impl PresentationService {
    pub async fn create_presentation(
        pool: &PgPool,
        identity: &Identity,
        req: CreatePresentationRequest,
    ) -> Result<PresentationView, AppError> {
        let owner_id = require_instructor(identity)?;
        let title = normalize_title(&req.title)?;

        course_repo::find_course_by_id(pool, req.course_id)
            .await?
            .ok_or(AppError::NotFound("Course not found".to_string()))?;

        let row = presentation_repo::create_presentation(
            pool,
            CreatePresentationParams {
                course_id: req.course_id,
                owner_id,
                title,
                audience_mode: req.audience_mode.unwrap_or(AudienceMode::Enrolled),
            },
        )
        .await?;

        BusinessEvent::PresentationCreated {
            presentation_id: row.id,
            course_id: row.course_id,
            owner_id,
        }
        .log();

        Ok(PresentationView::from_record(row, 0))
    }

    pub async fn get_presentation(
        pool: &PgPool,
        presentation_id: Uuid,
        identity: &Identity,
    ) -> Result<PresentationView, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_can_view(&presentation, identity)?;
        Self::to_view(pool, presentation).await
    }

    pub async fn list_by_course(
        pool: &PgPool,
        course_id: Uuid,
        identity: &Identity,
    ) -> Result<PresentationListResponse, AppError> {
        if identity.is_anonymous() {
            return Err(AppError::Forbidden(
                "Listing presentations requires an account".to_string(),
            ));
        }
        course_repo::find_course_by_id(pool, course_id)
            .await?
            .ok_or(AppError::NotFound("Course not found".to_string()))?;

        let rows = presentation_repo::list_presentations_by_course(pool, course_id).await?;
        let mut data = Vec::with_capacity(rows.len());
        for row in rows {
            data.push(Self::to_view(pool, row).await?);
        }
        Ok(PresentationListResponse { data })
    }

    pub async fn update_presentation(
        pool: &PgPool,
        presentation_id: Uuid,
        identity: &Identity,
        req: UpdatePresentationRequest,
    ) -> Result<PresentationView, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_presenter(&presentation, identity)?;

        let title = match req.title {
            Some(title) => Some(normalize_title(&title)?),
            None => None,
        };
        let row = presentation_repo::update_presentation(
            pool,
            presentation_id,
            title,
            req.audience_mode,
        )
        .await?
        .ok_or(AppError::NotFound("Presentation not found".to_string()))?;

        Self::to_view(pool, row).await
    }

    /// Deletion is refused while the deck is live; viewers hold a reference
    /// to it and must see an explicit session end first.
    pub async fn delete_presentation(
        pool: &PgPool,
        presentation_id: Uuid,
        identity: &Identity,
    ) -> Result<(), AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        let actor_id = ensure_presenter(&presentation, identity)?;
        if presentation.is_live {
            return Err(AppError::Conflict(
                "End the live session before deleting the presentation".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;
        presentation_repo::delete_presentation(&mut tx, presentation_id).await?;
        tx.commit().await?;

        BusinessEvent::PresentationDeleted {
            presentation_id,
            actor_id,
        }
        .log();

        Ok(())
    }

    pub async fn to_view(
        pool: &PgPool,
        presentation: Presentation,
    ) -> Result<PresentationView, AppError> {
        let slide_count = slide_repo::count_slides(pool, presentation.id).await?;
        Ok(PresentationView::from_record(presentation, slide_count))
    }
}

pub(crate) async fn require_presentation(
    pool: &PgPool,
    presentation_id: Uuid,
) -> Result<Presentation, AppError> {
    presentation_repo::find_presentation_by_id(pool, presentation_id)
        .await?
        .ok_or(AppError::NotFound("Presentation not found".to_string()))
}

/// Anonymous identities are admitted only when the presentation runs in
/// anonymous audience mode; accounts always may view.
pub(crate) fn ensure_can_view(
    presentation: &Presentation,
    identity: &Identity,
) -> Result<(), AppError> {
    if identity.is_anonymous() && !presentation.audience_mode.admits_anonymous() {
        return Err(AppError::Forbidden(
            "This presentation is limited to enrolled viewers".to_string(),
        ));
    }
    Ok(())
}

/// Navigation and live control belong to the owning instructor's client
/// alone; nothing at the data layer enforces a single writer, so this
/// convention is the lock.
pub(crate) fn ensure_presenter(
    presentation: &Presentation,
    identity: &Identity,
) -> Result<Uuid, AppError> {
    match identity {
        Identity::Account { user_id, .. } if *user_id == presentation.owner_id => Ok(*user_id),
        _ => Err(AppError::Forbidden(
            "Only the presentation owner may do this".to_string(),
        )),
    }
}

pub(crate) fn require_instructor(identity: &Identity) -> Result<Uuid, AppError> {
    match identity {
        Identity::Account {
            user_id,
            role: Role::Instructor,
            ..
        } => Ok(*user_id),
        _ => Err(AppError::Forbidden(
            "Only instructors may do this".to_string(),
        )),
    }
}

fn normalize_title(title: &str) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(
            "Presentation title is required".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::ValidationError(format!(
            "Presentation title exceeds {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn presentation(owner_id: Uuid, audience_mode: AudienceMode) -> Presentation {
        Presentation {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            owner_id,
            title: "Memory safety".to_string(),
            current_slide_index: 0,
            is_live: false,
            audience_mode,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn account(user_id: Uuid, role: Role) -> Identity {
        Identity::Account {
            user_id,
            display_name: "Someone".to_string(),
            role,
        }
    }

    #[test]
    fn anonymous_viewer_needs_anonymous_mode() {
        let anon = Identity::Anonymous {
            viewer_id: Uuid::new_v4(),
            display_name: "Anonymous".to_string(),
        };
        let enrolled_only = presentation(Uuid::new_v4(), AudienceMode::Enrolled);
        assert!(ensure_can_view(&enrolled_only, &anon).is_err());

        let open = presentation(Uuid::new_v4(), AudienceMode::Anonymous);
        assert!(ensure_can_view(&open, &anon).is_ok());
    }

    #[test]
    fn accounts_view_either_mode() {
        let student = account(Uuid::new_v4(), Role::Student);
        let enrolled_only = presentation(Uuid::new_v4(), AudienceMode::Enrolled);
        assert!(ensure_can_view(&enrolled_only, &student).is_ok());
    }

    #[test]
    fn only_the_owner_presents() {
        let owner = Uuid::new_v4();
        let deck = presentation(owner, AudienceMode::Enrolled);

        assert!(ensure_presenter(&deck, &account(owner, Role::Instructor)).is_ok());
        assert!(ensure_presenter(&deck, &account(Uuid::new_v4(), Role::Instructor)).is_err());
        let anon = Identity::Anonymous {
            viewer_id: Uuid::new_v4(),
            display_name: "Anonymous".to_string(),
        };
        assert!(ensure_presenter(&deck, &anon).is_err());
    }

    #[test]
    fn titles_are_trimmed_and_bounded() {
        assert_eq!(normalize_title("  Borrowing  ").unwrap(), "Borrowing");
        assert!(normalize_title("   ").is_err());
        assert!(normalize_title(&"x".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }

    #[test]
    fn students_cannot_create_presentations() {
        assert!(require_instructor(&account(Uuid::new_v4(), Role::Student)).is_err());
        assert!(require_instructor(&account(Uuid::new_v4(), Role::Instructor)).is_ok());
    }
}
