use std::sync::Arc;

use axum::{
    Extension,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc::UnboundedSender};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use uuid::Uuid;

use crate::{
    app::state::AppState,
    auth::middleware::Identity,
    error::AppError,
    realtime::{
        feed::AnnotationFeed,
        protocol::{ClientMessage, ServerMessage},
        room::{self, Room},
    },
    repositories::presentations as presentation_repo,
    telemetry::BusinessEvent,
    usecases::{
        groups::GroupService,
        presence::PresenceService,
        presentations::{PresentationService, ensure_can_view, require_presentation},
    },
};

pub async fn ws_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(presentation_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    // Authorization happens before the upgrade; a viewer the audience mode
    // rejects never gets a socket.
    let presentation = require_presentation(&state.db, presentation_id).await?;
    ensure_can_view(&presentation, &identity)?;
    let room = room::get_or_create_room(&state.rooms, presentation_id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, presentation_id, identity, room)))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    presentation_id: Uuid,
    identity: Identity,
    room: Arc<Room>,
) {
    let session_id = Uuid::new_v4();
    let viewer_id = identity.participant_id();
    let (sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = tokio::sync::mpsc::unbounded_channel::<Message>();
    let rx = room.tx.subscribe();
    room.touch().await;

    if let Err(error) = PresenceService::join(
        &state.db,
        state.redis.as_ref(),
        presentation_id,
        viewer_id,
        session_id,
        identity.display_name().to_string(),
    )
    .await
    {
        tracing::warn!(
            "Failed to record presence for viewer {} on presentation {}: {}",
            viewer_id,
            presentation_id,
            error
        );
    }
    BusinessEvent::ViewerJoined {
        presentation_id,
        viewer_id,
        anonymous: identity.is_anonymous(),
    }
    .log();

    let mut write_task = tokio::spawn(async move {
        let mut sender = sender;
        while let Some(msg) = out_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let feed_state = state.clone();
    let feed_out = out_tx.clone();
    let mut send_task = tokio::spawn(async move {
        run_feed(feed_state, presentation_id, rx, feed_out).await;
    });

    let recv_state = state.clone();
    let recv_room = room.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Heartbeat) => {
                        recv_room.touch().await;
                        if let Err(error) =
                            PresenceService::heartbeat(&recv_state.db, presentation_id, session_id)
                                .await
                        {
                            tracing::warn!(
                                "Heartbeat update failed for session {}: {}",
                                session_id,
                                error
                            );
                        }
                    }
                    Err(error) => {
                        tracing::debug!("Ignoring unknown client frame: {}", error);
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut write_task) => {},
        _ = (&mut send_task) => {},
        _ = (&mut recv_task) => {},
    }
    write_task.abort();
    send_task.abort();
    recv_task.abort();

    if let Err(error) = PresenceService::disconnect(
        &state.db,
        state.redis.as_ref(),
        presentation_id,
        session_id,
    )
    .await
    {
        tracing::warn!(
            "Failed to clear presence for session {}: {}",
            session_id,
            error
        );
    }
    BusinessEvent::ViewerLeft {
        presentation_id,
        viewer_id,
    }
    .log();
}

/// Drives one session's slide-scoped view: initial full sync, delta
/// forwarding behind the stale guard, re-scope on slide changes, and a full
/// resync whenever the broadcast channel lags (the client is told it was
/// behind via a fresh snapshot, never silently starved).
async fn run_feed(
    state: AppState,
    presentation_id: Uuid,
    rx: broadcast::Receiver<ServerMessage>,
    out: UnboundedSender<Message>,
) {
    let mut feed = AnnotationFeed::new();
    if !full_sync(&state, presentation_id, &mut feed, &out).await {
        return;
    }

    let mut frames = BroadcastStream::new(rx);
    while let Some(delivery) = frames.next().await {
        match delivery {
            Ok(frame) => {
                if !handle_frame(&state, presentation_id, &mut feed, &out, frame).await {
                    return;
                }
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(
                    "Session behind by {} frames on presentation {}; resyncing",
                    skipped,
                    presentation_id
                );
                if !full_sync(&state, presentation_id, &mut feed, &out).await {
                    return;
                }
            }
        }
    }
}

/// Returns false once the client side is gone.
async fn handle_frame(
    state: &AppState,
    presentation_id: Uuid,
    feed: &mut AnnotationFeed,
    out: &UnboundedSender<Message>,
    frame: ServerMessage,
) -> bool {
    match frame {
        ServerMessage::Presentation { presentation } => {
            let slide_index = presentation.current_slide_index;
            let slide_changed = feed.slide_index() != Some(slide_index);
            if !send(out, ServerMessage::Presentation { presentation }) {
                return false;
            }
            if slide_changed {
                return rescope(state, presentation_id, feed, out, slide_index).await;
            }
            true
        }
        ServerMessage::CommentChanged {
            slide_index,
            change,
            comment,
        } => {
            if feed.slide_index().is_none() {
                // The join sync failed earlier; this delta is the recovery
                // signal.
                return full_sync(state, presentation_id, feed, out).await;
            }
            if feed.slide_index() == Some(slide_index) && !feed.is_loaded() {
                // Snapshot load previously failed or is outstanding; the
                // reload covers this delta.
                return rescope(state, presentation_id, feed, out, slide_index).await;
            }
            if feed.apply_comment(slide_index, change, &comment) {
                return send(
                    out,
                    ServerMessage::CommentChanged {
                        slide_index,
                        change,
                        comment,
                    },
                );
            }
            // Stale delta from a slide this session already left.
            true
        }
        ServerMessage::GroupChanged {
            slide_index,
            change,
            group,
        } => {
            if feed.slide_index().is_none() {
                return full_sync(state, presentation_id, feed, out).await;
            }
            if feed.slide_index() == Some(slide_index) && !feed.is_loaded() {
                return rescope(state, presentation_id, feed, out, slide_index).await;
            }
            if feed.apply_group(slide_index, change, &group) {
                return send(
                    out,
                    ServerMessage::GroupChanged {
                        slide_index,
                        change,
                        group,
                    },
                );
            }
            true
        }
        ServerMessage::PollTally { tally } => send(out, ServerMessage::PollTally { tally }),
        ServerMessage::SessionEnded { presentation_id } => {
            send(out, ServerMessage::SessionEnded { presentation_id })
        }
        // Snapshots and errors travel per-session, never via broadcast.
        ServerMessage::Annotations { .. } | ServerMessage::Error { .. } => true,
    }
}

/// Unsubscribe-then-subscribe: the feed adopts the new index (dropping the
/// old map) before the snapshot is fetched, so deliveries tagged with the
/// old index are rejected while the load is in flight. A failed load leaves
/// the feed "unknown" and tells the client, instead of faking an empty
/// slide.
async fn rescope(
    state: &AppState,
    presentation_id: Uuid,
    feed: &mut AnnotationFeed,
    out: &UnboundedSender<Message>,
    slide_index: i32,
) -> bool {
    feed.rescope(slide_index);
    match GroupService::load_annotations(&state.db, presentation_id, slide_index).await {
        Ok((comments, groups)) => {
            if !feed.load_snapshot(slide_index, comments.clone(), groups.clone()) {
                return true;
            }
            send(
                out,
                ServerMessage::Annotations {
                    slide_index,
                    comments,
                    groups,
                },
            )
        }
        Err(error) => {
            tracing::error!(
                "Failed to load annotations for presentation {} slide {}: {}",
                presentation_id,
                slide_index,
                error
            );
            send(
                out,
                ServerMessage::Error {
                    message: "Annotations are temporarily unavailable".to_string(),
                },
            )
        }
    }
}

/// Sends the complete current state: presentation record plus the
/// annotation snapshot for its current slide. Used on join (viewers can
/// arrive mid-session) and on lag recovery.
async fn full_sync(
    state: &AppState,
    presentation_id: Uuid,
    feed: &mut AnnotationFeed,
    out: &UnboundedSender<Message>,
) -> bool {
    let presentation =
        match presentation_repo::find_presentation_by_id(&state.db, presentation_id).await {
            Ok(Some(presentation)) => presentation,
            Ok(None) => {
                // Deleted mid-session is a valid terminal state.
                send(out, ServerMessage::SessionEnded { presentation_id });
                return false;
            }
            Err(error) => {
                tracing::error!(
                    "Failed to load presentation {}: {}",
                    presentation_id,
                    error
                );
                return send(
                    out,
                    ServerMessage::Error {
                        message: "Live data is temporarily unavailable".to_string(),
                    },
                );
            }
        };

    let view = match PresentationService::to_view(&state.db, presentation).await {
        Ok(view) => view,
        Err(error) => {
            tracing::error!(
                "Failed to assemble presentation view {}: {}",
                presentation_id,
                error
            );
            return send(
                out,
                ServerMessage::Error {
                    message: "Live data is temporarily unavailable".to_string(),
                },
            );
        }
    };

    let slide_index = view.current_slide_index;
    if !send(out, ServerMessage::Presentation { presentation: view }) {
        return false;
    }
    rescope(state, presentation_id, feed, out, slide_index).await
}

fn send(out: &UnboundedSender<Message>, message: ServerMessage) -> bool {
    match serde_json::to_string(&message) {
        Ok(payload) => out.send(Message::Text(payload.into())).is_ok(),
        Err(error) => {
            tracing::error!("Failed to encode server frame: {}", error);
            true
        }
    }
}
