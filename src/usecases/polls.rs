use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::middleware::Identity,
    dto::polls::CastVoteRequest,
    error::AppError,
    models::polls::PollTally,
    realtime::{protocol::ServerMessage, room},
    repositories::{polls as poll_repo, polls::UpsertVoteParams, slides as slide_repo},
    telemetry::BusinessEvent,
    usecases::presentations::{ensure_can_view, require_presentation},
};

pub struct PollService;

impl PollService {
    /// Records the caller's single vote for an mcq slide. Voting again
    /// replaces the previous choice; two browser profiles are two voters,
    /// one profile voting twice nets one vote.
    pub async fn cast_vote(
        pool: &PgPool,
        rooms: &room::Rooms,
        presentation_id: Uuid,
        slide_id: Uuid,
        identity: &Identity,
        req: CastVoteRequest,
    ) -> Result<PollTally, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let slide = slide_repo::find_slide_by_id(pool, presentation_id, slide_id)
            .await?
            .ok_or(AppError::NotFound("Slide not found".to_string()))?;
        let options = slide
            .body
            .poll_options()
            .ok_or(AppError::BadRequest("Slide is not a poll".to_string()))?;
        validate_choice(req.choice, options.len())?;

        poll_repo::upsert_vote(
            pool,
            UpsertVoteParams {
                slide_id,
                presentation_id,
                voter_id: identity.participant_id(),
                choice: req.choice,
            },
        )
        .await?;

        BusinessEvent::VoteCast {
            slide_id,
            presentation_id,
        }
        .log();

        let tally = Self::tally_slide(pool, slide_id, options.len()).await?;
        room::publish(
            rooms,
            presentation_id,
            ServerMessage::PollTally {
                tally: tally.clone(),
            },
        );

        Ok(tally)
    }

    pub async fn tally(
        pool: &PgPool,
        presentation_id: Uuid,
        slide_id: Uuid,
        identity: &Identity,
    ) -> Result<PollTally, AppError> {
        let presentation = require_presentation(pool, presentation_id).await?;
        ensure_can_view(&presentation, identity)?;

        let slide = slide_repo::find_slide_by_id(pool, presentation_id, slide_id)
            .await?
            .ok_or(AppError::NotFound("Slide not found".to_string()))?;
        let options = slide
            .body
            .poll_options()
            .ok_or(AppError::BadRequest("Slide is not a poll".to_string()))?;

        Self::tally_slide(pool, slide_id, options.len()).await
    }

    async fn tally_slide(
        pool: &PgPool,
        slide_id: Uuid,
        option_count: usize,
    ) -> Result<PollTally, AppError> {
        let rows = poll_repo::tally_votes(pool, slide_id).await?;
        Ok(PollTally::from_rows(slide_id, option_count, &rows))
    }
}

fn validate_choice(choice: i32, option_count: usize) -> Result<(), AppError> {
    let valid = usize::try_from(choice).is_ok_and(|index| index < option_count);
    if !valid {
        return Err(AppError::ValidationError(
            "Poll choice is out of range".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_outside_the_option_range_are_rejected() {
        assert!(validate_choice(-1, 3).is_err());
        assert!(validate_choice(3, 3).is_err());
        assert!(validate_choice(0, 3).is_ok());
        assert!(validate_choice(2, 3).is_ok());
    }

    #[test]
    fn no_options_means_no_valid_choice() {
        assert!(validate_choice(0, 0).is_err());
    }
}
