use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    app::state::AppState,
    auth::middleware::Identity,
    dto::{
        groups::AnnotationSnapshotResponse,
        presentations::{
            CourseLiveResponse, CreatePresentationRequest, NavigateRequest,
            PresentationListResponse, PresentationView, UpdatePresentationRequest,
        },
    },
    error::AppError,
    models::presence::PresenceViewer,
    usecases::{
        groups::GroupService, live::LiveSessionService, presence::PresenceService,
        presentations::PresentationService,
    },
};

pub async fn create_presentation_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreatePresentationRequest>,
) -> Result<(StatusCode, Json<PresentationView>), AppError> {
    let response = PresentationService::create_presentation(&state.db, &identity, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_presentation_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
) -> Result<Json<PresentationView>, AppError> {
    let response =
        PresentationService::get_presentation(&state.db, presentation_id, &identity).await?;
    Ok(Json(response))
}

pub async fn list_course_presentations_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<PresentationListResponse>, AppError> {
    let response = PresentationService::list_by_course(&state.db, course_id, &identity).await?;
    Ok(Json(response))
}

pub async fn update_presentation_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
    Json(req): Json<UpdatePresentationRequest>,
) -> Result<Json<PresentationView>, AppError> {
    let response =
        PresentationService::update_presentation(&state.db, presentation_id, &identity, req)
            .await?;
    Ok(Json(response))
}

pub async fn delete_presentation_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    PresentationService::delete_presentation(&state.db, presentation_id, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn go_live_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
) -> Result<Json<PresentationView>, AppError> {
    let response =
        LiveSessionService::go_live(&state.db, &state.rooms, presentation_id, &identity).await?;
    Ok(Json(response))
}

pub async fn end_live_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
) -> Result<Json<PresentationView>, AppError> {
    let response =
        LiveSessionService::end_live(&state.db, &state.rooms, presentation_id, &identity).await?;
    Ok(Json(response))
}

pub async fn navigate_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<PresentationView>, AppError> {
    let response = LiveSessionService::navigate(
        &state.db,
        &state.rooms,
        presentation_id,
        &identity,
        req.direction,
    )
    .await?;
    Ok(Json(response))
}

pub async fn course_live_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseLiveResponse>, AppError> {
    let response = LiveSessionService::current_live(&state.db, course_id, &identity).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct AnnotationQuery {
    pub slide_index: i32,
}

pub async fn annotations_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
    Query(query): Query<AnnotationQuery>,
) -> Result<Json<AnnotationSnapshotResponse>, AppError> {
    let presentation =
        crate::usecases::presentations::require_presentation(&state.db, presentation_id).await?;
    crate::usecases::presentations::ensure_can_view(&presentation, &identity)?;

    let (comments, groups) =
        GroupService::load_annotations(&state.db, presentation_id, query.slide_index).await?;
    Ok(Json(AnnotationSnapshotResponse {
        slide_index: query.slide_index,
        comments,
        groups,
    }))
}

pub async fn presence_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
) -> Result<Json<Vec<PresenceViewer>>, AppError> {
    let presentation =
        crate::usecases::presentations::require_presentation(&state.db, presentation_id).await?;
    crate::usecases::presentations::ensure_can_view(&presentation, &identity)?;

    let viewers =
        PresenceService::list_viewers(&state.db, state.redis.as_ref(), presentation_id).await?;
    Ok(Json(viewers))
}
