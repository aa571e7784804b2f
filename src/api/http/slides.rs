use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    app::state::AppState,
    auth::middleware::Identity,
    dto::slides::{
        CreateSlideRequest, MoveSlideRequest, SlideListResponse, SlideView, UpdateSlideRequest,
    },
    error::AppError,
    usecases::slides::SlideService,
};

pub async fn list_slides_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
) -> Result<Json<SlideListResponse>, AppError> {
    let response = SlideService::list_slides(&state.db, presentation_id, &identity).await?;
    Ok(Json(response))
}

pub async fn create_slide_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
    Json(req): Json<CreateSlideRequest>,
) -> Result<(StatusCode, Json<SlideView>), AppError> {
    let response = SlideService::add_slide(&state.db, presentation_id, &identity, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_slide_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((presentation_id, slide_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateSlideRequest>,
) -> Result<Json<SlideView>, AppError> {
    let response =
        SlideService::update_slide(&state.db, presentation_id, slide_id, &identity, req).await?;
    Ok(Json(response))
}

pub async fn delete_slide_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((presentation_id, slide_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    SlideService::delete_slide(&state.db, &state.rooms, presentation_id, slide_id, &identity)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn move_slide_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((presentation_id, slide_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<MoveSlideRequest>,
) -> Result<Json<SlideListResponse>, AppError> {
    let response =
        SlideService::move_slide(&state.db, presentation_id, slide_id, &identity, req).await?;
    Ok(Json(response))
}
