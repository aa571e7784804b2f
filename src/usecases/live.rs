use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::middleware::Identity,
    dto::presentations::{CourseLiveResponse, NavigationDirection, PresentationView},
    error::AppError,
    realtime::{protocol::ServerMessage, room},
    repositories::{
        courses as course_repo, presentations as presentation_repo, slides as slide_repo,
    },
    telemetry::BusinessEvent,
    usecases::presentations::{
        PresentationService, ensure_can_view, ensure_presenter, require_presentation,
    },
};

pub struct LiveSessionService;

impl LiveSessionService {
    /// Promotes this presentation to the course's live session. Demotion of
    /// every other deck, promotion, and the course pointer move commit as
    /// one transaction; whatever fails, the course never ends up with two
    /// live presentations.
    pub async fn go_live(
        pool: &PgPool,
        rooms: &room::Rooms,
        presentation_id: Uuid,
        identity: &Identity,
    ) -> Result<PresentationView, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        let actor_id = ensure_presenter(&presentation, identity)?;

        let mut tx = pool.begin().await?;
        let demoted =
            presentation_repo::demote_live_in_course(&mut tx, presentation.course_id, presentation_id)
                .await?;
        let promoted = presentation_repo::set_live(&mut tx, presentation_id, true)
            .await?
            .ok_or(AppError::NotFound("Presentation not found".to_string()))?;
        course_repo::set_live_pointer(&mut tx, presentation.course_id, Some(presentation_id))
            .await?;
        tx.commit().await?;

        BusinessEvent::PresentationWentLive {
            presentation_id,
            course_id: promoted.course_id,
            actor_id,
            demoted: demoted.clone(),
        }
        .log();

        // A demoted deck had viewers only if the instructor switched decks
        // mid-class; those sessions get a terminal frame, not a frozen slide.
        for demoted_id in demoted {
            room::publish(
                rooms,
                demoted_id,
                ServerMessage::SessionEnded {
                    presentation_id: demoted_id,
                },
            );
        }

        let view = PresentationService::to_view(pool, promoted).await?;
        room::publish(
            rooms,
            presentation_id,
            ServerMessage::Presentation {
                presentation: view.clone(),
            },
        );

        Ok(view)
    }

    /// Moves the current slide one step, clamped to the deck. Every
    /// connected session re-scopes its annotation feed when the resulting
    /// presentation frame arrives.
    pub async fn navigate(
        pool: &PgPool,
        rooms: &room::Rooms,
        presentation_id: Uuid,
        identity: &Identity,
        direction: NavigationDirection,
    ) -> Result<PresentationView, AppError> {
        let mut tx = pool.begin().await?;
        let presentation = presentation_repo::lock_presentation(&mut tx, presentation_id)
            .await?
            .ok_or(AppError::NotFound("Presentation not found".to_string()))?;
        ensure_presenter(&presentation, identity)?;
        if !presentation.is_live {
            return Err(AppError::Conflict(
                "Presentation is not live".to_string(),
            ));
        }

        let slide_count = slide_repo::count_slides_in_tx(&mut tx, presentation_id).await?;
        let target = clamp_slide_index(presentation.current_slide_index, direction, slide_count);
        let changed = target != presentation.current_slide_index;
        let updated = if changed {
            presentation_repo::set_current_slide(&mut tx, presentation_id, target)
                .await?
                .ok_or(AppError::NotFound("Presentation not found".to_string()))?
        } else {
            presentation
        };
        tx.commit().await?;

        let view = PresentationView::from_record(updated, slide_count);
        if changed {
            BusinessEvent::PresentationNavigated {
                presentation_id,
                slide_index: target,
            }
            .log();
            room::publish(
                rooms,
                presentation_id,
                ServerMessage::Presentation {
                    presentation: view.clone(),
                },
            );
        }

        Ok(view)
    }

    /// Ends the live session. Idempotent: ending an already-ended deck just
    /// returns its current state.
    pub async fn end_live(
        pool: &PgPool,
        rooms: &room::Rooms,
        presentation_id: Uuid,
        identity: &Identity,
    ) -> Result<PresentationView, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        let actor_id = ensure_presenter(&presentation, identity)?;
        if !presentation.is_live {
            return PresentationService::to_view(pool, presentation).await;
        }

        let mut tx = pool.begin().await?;
        let updated = presentation_repo::set_live(&mut tx, presentation_id, false)
            .await?
            .ok_or(AppError::NotFound("Presentation not found".to_string()))?;
        course_repo::clear_live_pointer(&mut tx, updated.course_id, presentation_id).await?;
        tx.commit().await?;

        BusinessEvent::PresentationEnded {
            presentation_id,
            course_id: updated.course_id,
            actor_id,
        }
        .log();

        let view = PresentationService::to_view(pool, updated).await?;
        room::publish(
            rooms,
            presentation_id,
            ServerMessage::Presentation {
                presentation: view.clone(),
            },
        );
        room::publish(
            rooms,
            presentation_id,
            ServerMessage::SessionEnded { presentation_id },
        );

        Ok(view)
    }

    /// Resolves the course's live pointer for joining viewers. None means
    /// nothing is live yet; clients keep polling until one appears.
    pub async fn current_live(
        pool: &PgPool,
        course_id: Uuid,
        identity: &Identity,
    ) -> Result<CourseLiveResponse, AppError> {
        course_repo::find_course_by_id(pool, course_id)
            .await?
            .ok_or(AppError::NotFound("Course not found".to_string()))?;

        let presentation = course_repo::get_live_presentation(pool, course_id).await?;
        let presentation = match presentation {
            Some(presentation) => {
                ensure_can_view(&presentation, identity)?;
                Some(PresentationService::to_view(pool, presentation).await?)
            }
            None => None,
        };

        Ok(CourseLiveResponse { presentation })
    }
}

/// Clamps one navigation step to [0, slide_count - 1]. An empty deck pins
/// the index at 0.
pub(crate) fn clamp_slide_index(
    current: i32,
    direction: NavigationDirection,
    slide_count: i64,
) -> i32 {
    let last = i32::try_from(slide_count.max(0)).unwrap_or(i32::MAX).saturating_sub(1).max(0);
    let stepped = match direction {
        NavigationDirection::Next => current.saturating_add(1),
        NavigationDirection::Prev => current.saturating_sub(1),
    };
    stepped.clamp(0, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_clamps_at_the_last_slide() {
        let mut index = 0;
        for _ in 0..4 {
            index = clamp_slide_index(index, NavigationDirection::Next, 5);
        }
        assert_eq!(index, 4);
        // A fifth next stays clamped.
        assert_eq!(clamp_slide_index(index, NavigationDirection::Next, 5), 4);
    }

    #[test]
    fn navigation_clamps_at_zero() {
        assert_eq!(clamp_slide_index(0, NavigationDirection::Prev, 5), 0);
        assert_eq!(clamp_slide_index(1, NavigationDirection::Prev, 5), 0);
    }

    #[test]
    fn empty_deck_pins_index_at_zero() {
        assert_eq!(clamp_slide_index(0, NavigationDirection::Next, 0), 0);
        assert_eq!(clamp_slide_index(0, NavigationDirection::Prev, 0), 0);
    }

    #[test]
    fn out_of_range_index_recovers_into_bounds() {
        // A shrunken deck leaves the stored index past the end; the next
        // step lands back inside the deck.
        assert_eq!(clamp_slide_index(9, NavigationDirection::Next, 3), 2);
        assert_eq!(clamp_slide_index(9, NavigationDirection::Prev, 3), 2);
    }
}
