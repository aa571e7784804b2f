use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::middleware::Identity,
    dto::{
        presentations::PresentationView,
        slides::{CreateSlideRequest, MoveSlideRequest, SlideListResponse, SlideView, UpdateSlideRequest},
    },
    error::AppError,
    models::slides::SlideBody,
    realtime::{protocol::ServerMessage, room},
    repositories::{
        presentations as presentation_repo, slides as slide_repo, slides::CreateSlideParams,
    },
    telemetry::BusinessEvent,
    usecases::presentations::{ensure_can_view, ensure_presenter, require_presentation},
};

const MAX_POLL_OPTIONS: usize = 10;

pub struct SlideService;

impl SlideService {
    pub async fn list_slides(
        pool: &PgPool,
        presentation_id: Uuid,
        identity: &Identity,
    ) -> Result<SlideListResponse, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let rows = slide_repo::list_slides(pool, presentation_id).await?;
        Ok(SlideListResponse {
            data: rows.into_iter().map(SlideView::from).collect(),
        })
    }

    pub async fn add_slide(
        pool: &PgPool,
        presentation_id: Uuid,
        identity: &Identity,
        req: CreateSlideRequest,
    ) -> Result<SlideView, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_presenter(&presentation, identity)?;
        validate_slide_body(&req.body)?;
        let payload = serde_json::to_value(&req.body)?;

        let mut tx = pool.begin().await?;
        // The presentation row serves as the renumbering mutex.
        presentation_repo::lock_presentation(&mut tx, presentation_id)
            .await?
            .ok_or(AppError::NotFound("Presentation not found".to_string()))?;
        let slides = slide_repo::list_slides_in_tx(&mut tx, presentation_id).await?;

        // Append first (no position collision), then renumber to the
        // requested insertion point.
        let inserted = slide_repo::insert_slide(
            &mut tx,
            CreateSlideParams {
                presentation_id,
                position: slides.len() as i32,
                kind: req.body.kind(),
                body: payload,
            },
        )
        .await?;

        let mut order: Vec<Uuid> = slides.iter().map(|slide| slide.id).collect();
        let index = insertion_index(req.position, order.len());
        order.insert(index, inserted.id);
        slide_repo::apply_positions(&mut tx, &renumber(&order)).await?;
        tx.commit().await?;

        BusinessEvent::SlideCreated {
            slide_id: inserted.id,
            presentation_id,
            position: index as i32,
        }
        .log();

        let mut view = SlideView::from(inserted);
        view.position = index as i32;
        Ok(view)
    }

    pub async fn update_slide(
        pool: &PgPool,
        presentation_id: Uuid,
        slide_id: Uuid,
        identity: &Identity,
        req: UpdateSlideRequest,
    ) -> Result<SlideView, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_presenter(&presentation, identity)?;
        validate_slide_body(&req.body)?;

        let row = slide_repo::update_slide_body(pool, presentation_id, slide_id, &req.body)
            .await?
            .ok_or(AppError::NotFound("Slide not found".to_string()))?;

        Ok(SlideView::from(row))
    }

    pub async fn delete_slide(
        pool: &PgPool,
        rooms: &room::Rooms,
        presentation_id: Uuid,
        slide_id: Uuid,
        identity: &Identity,
    ) -> Result<(), AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_presenter(&presentation, identity)?;

        let mut tx = pool.begin().await?;
        let presentation = presentation_repo::lock_presentation(&mut tx, presentation_id)
            .await?
            .ok_or(AppError::NotFound("Presentation not found".to_string()))?;
        let slides = slide_repo::list_slides_in_tx(&mut tx, presentation_id).await?;
        if !slides.iter().any(|slide| slide.id == slide_id) {
            return Err(AppError::NotFound("Slide not found".to_string()));
        }

        slide_repo::delete_slide(&mut tx, slide_id).await?;
        let order: Vec<Uuid> = slides
            .iter()
            .map(|slide| slide.id)
            .filter(|id| *id != slide_id)
            .collect();
        slide_repo::apply_positions(&mut tx, &renumber(&order)).await?;

        // A shrunken deck may strand the cursor past the end; pull it back
        // so navigation and comment scoping stay inside the deck.
        let last = (order.len() as i32 - 1).max(0);
        let moved_cursor = presentation.current_slide_index > last;
        let updated = if moved_cursor {
            presentation_repo::set_current_slide(&mut tx, presentation_id, last).await?
        } else {
            None
        };
        tx.commit().await?;

        BusinessEvent::SlideDeleted {
            slide_id,
            presentation_id,
        }
        .log();

        if let Some(updated) = updated {
            let view = PresentationView::from_record(updated, order.len() as i64);
            room::publish(
                rooms,
                presentation_id,
                ServerMessage::Presentation { presentation: view },
            );
        }

        Ok(())
    }

    pub async fn move_slide(
        pool: &PgPool,
        presentation_id: Uuid,
        slide_id: Uuid,
        identity: &Identity,
        req: MoveSlideRequest,
    ) -> Result<SlideListResponse, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_presenter(&presentation, identity)?;

        let mut tx = pool.begin().await?;
        presentation_repo::lock_presentation(&mut tx, presentation_id)
            .await?
            .ok_or(AppError::NotFound("Presentation not found".to_string()))?;
        let slides = slide_repo::list_slides_in_tx(&mut tx, presentation_id).await?;
        let mut order: Vec<Uuid> = slides.iter().map(|slide| slide.id).collect();
        if !move_within(&mut order, slide_id, req.to_position) {
            return Err(AppError::NotFound("Slide not found".to_string()));
        }
        slide_repo::apply_positions(&mut tx, &renumber(&order)).await?;
        tx.commit().await?;

        let rows = slide_repo::list_slides(pool, presentation_id).await?;
        Ok(SlideListResponse {
            data: rows.into_iter().map(SlideView::from).collect(),
        })
    }
}

fn validate_slide_body(body: &SlideBody) -> Result<(), AppError> {
    match body {
        SlideBody::Content { .. } => Ok(()),
        SlideBody::Image { url, .. } => {
            if url.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Image slides need a url".to_string(),
                ));
            }
            Ok(())
        }
        SlideBody::Mcq { prompt, options } => {
            if prompt.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Poll slides need a prompt".to_string(),
                ));
            }
            if options.len() < 2 || options.len() > MAX_POLL_OPTIONS {
                return Err(AppError::ValidationError(format!(
                    "Poll slides need between 2 and {MAX_POLL_OPTIONS} options"
                )));
            }
            if options.iter().any(|option| option.trim().is_empty()) {
                return Err(AppError::ValidationError(
                    "Poll options must not be empty".to_string(),
                ));
            }
            Ok(())
        }
        SlideBody::Open { prompt } => {
            if prompt.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Open-question slides need a prompt".to_string(),
                ));
            }
            Ok(())
        }
        SlideBody::Imported { source_url, page } => {
            if source_url.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Imported slides need a source url".to_string(),
                ));
            }
            if *page < 0 {
                return Err(AppError::ValidationError(
                    "Imported slide page must not be negative".to_string(),
                ));
            }
            Ok(())
        }
    }
}

/// Resolves a requested insertion position to an index into the current
/// order; out-of-range requests clamp to the ends.
fn insertion_index(requested: Option<i32>, len: usize) -> usize {
    match requested {
        None => len,
        Some(position) if position < 0 => 0,
        Some(position) => (position as usize).min(len),
    }
}

/// Dense renumbering: the id list's order becomes positions 0..n-1.
fn renumber(order: &[Uuid]) -> Vec<(Uuid, i32)> {
    order
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as i32))
        .collect()
}

/// Moves the slide to the requested position, clamped into range. Returns
/// false when the id is not part of the deck.
fn move_within(order: &mut Vec<Uuid>, slide_id: Uuid, to_position: i32) -> bool {
    let Some(from) = order.iter().position(|id| *id == slide_id) else {
        return false;
    };
    order.remove(from);
    let target = if to_position < 0 {
        0
    } else {
        (to_position as usize).min(order.len())
    };
    order.insert(target, slide_id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn positions(assignments: &[(Uuid, i32)]) -> Vec<i32> {
        let mut positions: Vec<i32> = assignments.iter().map(|(_, p)| *p).collect();
        positions.sort();
        positions
    }

    #[test]
    fn renumbering_is_dense_after_any_sequence() {
        let mut order = deck(4);

        // insert at front, delete from the middle, move one to the end
        order.insert(0, Uuid::new_v4());
        let removed = order.remove(2);
        assert!(!order.contains(&removed));
        let moved = order[0];
        assert!(move_within(&mut order, moved, i32::MAX));

        let assignments = renumber(&order);
        assert_eq!(positions(&assignments), (0..order.len() as i32).collect::<Vec<_>>());
    }

    #[test]
    fn insertion_index_clamps() {
        assert_eq!(insertion_index(None, 3), 3);
        assert_eq!(insertion_index(Some(-5), 3), 0);
        assert_eq!(insertion_index(Some(1), 3), 1);
        assert_eq!(insertion_index(Some(99), 3), 3);
    }

    #[test]
    fn move_within_clamps_and_rejects_unknown_ids() {
        let mut order = deck(3);
        let first = order[0];
        assert!(move_within(&mut order, first, 99));
        assert_eq!(*order.last().unwrap(), first);
        assert!(move_within(&mut order, first, -1));
        assert_eq!(order[0], first);
        assert!(!move_within(&mut order, Uuid::new_v4(), 0));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn poll_bodies_are_validated() {
        let no_options = SlideBody::Mcq {
            prompt: "Pick".to_string(),
            options: vec!["only one".to_string()],
        };
        assert!(validate_slide_body(&no_options).is_err());

        let blank_option = SlideBody::Mcq {
            prompt: "Pick".to_string(),
            options: vec!["a".to_string(), "  ".to_string()],
        };
        assert!(validate_slide_body(&blank_option).is_err());

        let ok = SlideBody::Mcq {
            prompt: "Pick".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
        };
        assert!(validate_slide_body(&ok).is_ok());
    }

    #[test]
    fn empty_image_url_is_rejected() {
        let body = SlideBody::Image {
            url: " ".to_string(),
            caption: None,
        };
        assert!(validate_slide_body(&body).is_err());
    }
}
