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
    dto::comments::{CommentListResponse, CommentView, PostCommentRequest, PostReplyRequest},
    error::AppError,
    usecases::comments::CommentService,
};

pub async fn post_comment_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
    Json(req): Json<PostCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let response =
        CommentService::post_comment(&state.db, &state.rooms, presentation_id, &identity, req)
            .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct SlideCommentsQuery {
    pub slide_index: i32,
}

pub async fn list_comments_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
    Query(query): Query<SlideCommentsQuery>,
) -> Result<Json<CommentListResponse>, AppError> {
    let response = CommentService::list_for_slide(
        &state.db,
        presentation_id,
        query.slide_index,
        &identity,
    )
    .await?;
    Ok(Json(response))
}

pub async fn toggle_like_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CommentView>, AppError> {
    let response =
        CommentService::toggle_like(&state.db, &state.rooms, comment_id, &identity).await?;
    Ok(Json(response))
}

pub async fn post_reply_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(comment_id): Path<Uuid>,
    Json(req): Json<PostReplyRequest>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let response =
        CommentService::post_reply(&state.db, &state.rooms, comment_id, &identity, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn toggle_reply_like_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((comment_id, reply_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CommentView>, AppError> {
    let response = CommentService::toggle_reply_like(
        &state.db,
        &state.rooms,
        comment_id,
        reply_id,
        &identity,
    )
    .await?;
    Ok(Json(response))
}

pub async fn delete_comment_handle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    CommentService::delete_comment(&state.db, &state.rooms, comment_id, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}
