use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, Query,
    },
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::broadcast;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        FilterMessageDto, FilterRoomDto, HistoryQueryDto, MessageData, MessageListResponseDto,
        MessageResponseDto, MessageStreamEnvelope, RoomData, RoomResponseDto, SendMessageDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    service::chat::{self, ChatError},
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/bookings/:booking_id/room", get(open_room))
        .route("/rooms/:room_id/messages", post(send_message).get(room_history))
        .route("/rooms/:room_id/stream", get(stream_room_ws))
}

/// Lazily creates the booking's single room on first access by either
/// participant and reports its live activity.
pub async fn open_room(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let view = chat::get_or_create_room(&app_state.db_client, booking_id, user.user_id)
        .await
        .map_err(map_chat_error)?;

    Ok(Json(RoomResponseDto {
        status: "success".to_string(),
        data: RoomData {
            room: FilterRoomDto::filter_room(&view),
        },
    }))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(room_id): Path<Uuid>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let message = chat::append_message(
        &app_state.db_client,
        room_id,
        user.user_id,
        body.body,
        body.attachment_url,
    )
    .await
    .map_err(map_chat_error)?;

    app_state.realtime.publish(room_id, message.clone()).await;

    Ok(Json(MessageResponseDto {
        status: "success".to_string(),
        data: MessageData {
            message: FilterMessageDto::filter_message(&message),
        },
    }))
}

/// Catch-up read. Works regardless of whether the session window is still
/// open; only participation is required.
pub async fn room_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(room_id): Path<Uuid>,
    Query(query_params): Query<HistoryQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let messages = chat::history(
        &app_state.db_client,
        room_id,
        user.user_id,
        query_params.since_sequence.unwrap_or(0),
        query_params.limit,
    )
    .await
    .map_err(map_chat_error)?;

    let results = messages.len();

    Ok(Json(MessageListResponseDto {
        status: "success".to_string(),
        messages: FilterMessageDto::filter_messages(&messages),
        results,
    }))
}

/// Push stream for a room. The connection walks Subscribing -> Live: the
/// subscription is taken first, then the backlog since the client's cursor is
/// flushed, then broadcast messages are forwarded in sequence order. Any gap
/// (lag, out-of-order publish) is closed from the ledger, so the client sees
/// every message exactly once per connection.
pub async fn stream_room_ws(
    ws: WebSocketUpgrade,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(room_id): Path<Uuid>,
    Query(query_params): Query<HistoryQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    // Authorize before upgrading; strangers never reach the socket loop.
    let view = chat::get_room_view(&app_state.db_client, room_id)
        .await
        .map_err(map_chat_error)?;

    if !view.booking.is_participant(user.user_id) {
        return Err(HttpError::forbidden(ErrorMessage::NotAParticipant.to_string()));
    }

    let receiver = app_state.realtime.subscribe(room_id).await;
    let since_sequence = query_params.since_sequence.unwrap_or(0);
    let user_id = user.user_id;

    Ok(ws.on_upgrade(move |socket| async move {
        handle_room_socket(socket, app_state, room_id, user_id, since_sequence, receiver).await;
    }))
}

async fn handle_room_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    room_id: Uuid,
    user_id: Uuid,
    since_sequence: i64,
    mut receiver: broadcast::Receiver<crate::models::chatmodel::ChatMessage>,
) {
    let (mut sink, mut stream) = socket.split();
    let mut last_sequence = since_sequence;

    // Flush the backlog between the client's cursor and now. The broadcast
    // receiver was taken before this read, so anything appended meanwhile is
    // either in the backlog or queued on the channel; the sequence cursor
    // deduplicates the overlap.
    if replay_from_ledger(&app_state, room_id, user_id, &mut last_sequence, &mut sink)
        .await
        .is_err()
    {
        app_state.realtime.prune(room_id).await;
        return;
    }

    loop {
        tokio::select! {
            event = receiver.recv() => {
                match event {
                    Ok(message) => {
                        if message.sequence <= last_sequence {
                            continue;
                        }
                        // A hole means an earlier append committed but its
                        // publish has not arrived; the ledger has it already.
                        if message.sequence > last_sequence + 1 {
                            if replay_from_ledger(&app_state, room_id, user_id, &mut last_sequence, &mut sink).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        if forward_message(&message, &mut last_sequence, &mut sink).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::debug!(room_id = %room_id, missed, "subscriber lagged, replaying from ledger");
                        if replay_from_ledger(&app_state, room_id, user_id, &mut last_sequence, &mut sink).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    // Sends go through the HTTP append endpoint; inbound
                    // frames other than close are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    app_state.realtime.prune(room_id).await;
}

async fn forward_message(
    message: &crate::models::chatmodel::ChatMessage,
    last_sequence: &mut i64,
    sink: &mut (impl Sink<WsMessage, Error = axum::Error> + Unpin),
) -> Result<(), ()> {
    let envelope = MessageStreamEnvelope {
        event_type: "message",
        message: FilterMessageDto::filter_message(message),
    };
    let payload = serde_json::to_string(&envelope).map_err(|_| ())?;
    sink.send(WsMessage::Text(payload)).await.map_err(|_| ())?;
    *last_sequence = message.sequence;
    Ok(())
}

/// Pages the ledger forward from the cursor and forwards everything newer.
/// Also re-checks participation, so a subscriber loses the stream if its
/// access ever goes away mid-connection.
async fn replay_from_ledger(
    app_state: &AppState,
    room_id: Uuid,
    user_id: Uuid,
    last_sequence: &mut i64,
    sink: &mut (impl Sink<WsMessage, Error = axum::Error> + Unpin),
) -> Result<(), ()> {
    loop {
        let batch = chat::history(
            &app_state.db_client,
            room_id,
            user_id,
            *last_sequence,
            Some(chat::MAX_HISTORY_LIMIT),
        )
        .await
        .map_err(|e| {
            tracing::warn!(room_id = %room_id, "ledger replay failed: {}", e);
        })?;

        if batch.is_empty() {
            return Ok(());
        }

        for message in &batch {
            forward_message(message, last_sequence, sink).await?;
        }
    }
}

fn map_chat_error(err: ChatError) -> HttpError {
    match err {
        ChatError::BookingNotFound => {
            HttpError::not_found(ErrorMessage::BookingNotFound.to_string())
        }
        ChatError::RoomNotFound => HttpError::not_found(ErrorMessage::RoomNotFound.to_string()),
        ChatError::NotAParticipant => {
            HttpError::forbidden(ErrorMessage::NotAParticipant.to_string())
        }
        ChatError::EmptyMessage => HttpError::bad_request(ErrorMessage::EmptyMessage.to_string()),
        ChatError::RoomInactive => HttpError::conflict(ErrorMessage::RoomInactive.to_string()),
        ChatError::SequenceContention => {
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        }
        ChatError::Storage(e) => HttpError::server_error(e.to_string()),
    }
}
