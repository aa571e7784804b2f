use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppError, models::polls::PollVote};

#[derive(Debug)]
pub(crate) struct UpsertVoteParams {
    pub slide_id: Uuid,
    pub presentation_id: Uuid,
    pub voter_id: Uuid,
    pub choice: i32,
}

/// One row per (slide, voter); casting again replaces the previous choice,
/// so a voter nets exactly one counted vote no matter how often they change
/// their mind.
pub async fn upsert_vote(pool: &PgPool, params: UpsertVoteParams) -> Result<PollVote, AppError> {
    let row = crate::log_query_fetch_one!(
        "polls.upsert_vote",
        sqlx::query_as::<_, PollVote>(
            r#"
                INSERT INTO live.poll_vote (slide_id, presentation_id, voter_id, choice)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (slide_id, voter_id)
                DO UPDATE SET choice = EXCLUDED.choice,
                              updated_at = CURRENT_TIMESTAMP
                RETURNING *
            "#,
        )
        .bind(params.slide_id)
        .bind(params.presentation_id)
        .bind(params.voter_id)
        .bind(params.choice)
        .fetch_one(pool)
    )?;

    Ok(row)
}

/// Tally by counting rows, never by reading a stored counter.
pub async fn tally_votes(pool: &PgPool, slide_id: Uuid) -> Result<Vec<(i32, i64)>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "polls.tally_votes",
        sqlx::query_as::<_, (i32, i64)>(
            r#"
                SELECT choice, COUNT(*)
                FROM live.poll_vote
                WHERE slide_id = $1
                GROUP BY choice
            "#,
        )
        .bind(slide_id)
        .fetch_all(pool)
    )?;

    Ok(rows)
}

