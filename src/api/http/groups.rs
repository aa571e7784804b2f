use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    app::state::AppState,
    auth::middleware::Identity,
    dto::groups::{
        AddCommentToGroupRequest, CreateGroupRequest, GroupView, MoveGroupRequest,
        UpdateGroupRequest,
    },
    error::AppError,
    usecases::groups::GroupService,
};

pub async fn create_group_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupView>), AppError> {
    let response =
        GroupService::create_group(&state.db, &state.rooms, presentation_id, &identity, req)
            .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn add_comment_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<AddCommentToGroupRequest>,
) -> Result<Json<GroupView>, AppError> {
    let response =
        GroupService::add_comment(&state.db, &state.rooms, group_id, &identity, req).await?;
    Ok(Json(response))
}

pub async fn move_group_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<MoveGroupRequest>,
) -> Result<Json<GroupView>, AppError> {
    let response =
        GroupService::move_group(&state.db, &state.rooms, group_id, &identity, req).await?;
    Ok(Json(response))
}

pub async fn update_group_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<GroupView>, AppError> {
    let response =
        GroupService::update_group(&state.db, &state.rooms, group_id, &identity, req).await?;
    Ok(Json(response))
}

pub async fn remove_group_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    GroupService::remove_group(&state.db, &state.rooms, group_id, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}
