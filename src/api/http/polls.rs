use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    app::state::AppState,
    auth::middleware::Identity,
    dto::polls::CastVoteRequest,
    error::AppError,
    models::polls::PollTally,
    usecases::polls::PollService,
};

pub async fn cast_vote_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((presentation_id, slide_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CastVoteRequest>,
) -> Result<Json<PollTally>, AppError> {
    let response = PollService::cast_vote(
        &state.db,
        &state.rooms,
        presentation_id,
        slide_id,
        &identity,
        req,
    )
    .await?;
    Ok(Json(response))
}

pub async fn tally_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((presentation_id, slide_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PollTally>, AppError> {
    let response = PollService::tally(&state.db, presentation_id, slide_id, &identity).await?;
    Ok(Json(response))
}
