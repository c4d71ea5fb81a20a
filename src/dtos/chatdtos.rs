use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::chatmodel::ChatMessage;
use crate::service::chat::RoomView;

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SendMessageDto {
    #[validate(length(max = 2000, message = "Message body must be at most 2000 characters"))]
    pub body: Option<String>,

    #[validate(url(message = "Attachment must be a valid URL"))]
    #[serde(rename = "attachmentUrl")]
    pub attachment_url: Option<String>,
}

#[derive(Serialize, Deserialize, Validate, Default)]
pub struct HistoryQueryDto {
    /// Last sequence the caller has already seen; 0 (or absent) reads from
    /// the start of the room.
    #[validate(range(min = 0))]
    #[serde(rename = "sinceSequence")]
    pub since_sequence: Option<i64>,

    #[validate(range(min = 1, max = 200))]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterRoomDto {
    pub id: String,
    pub booking_id: String,
    pub client_id: String,
    pub counselor_id: String,
    /// Live activity derived from the booking status, not the stored flag.
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FilterRoomDto {
    pub fn filter_room(view: &RoomView) -> Self {
        let (client_id, counselor_id) = view.participants();
        FilterRoomDto {
            id: view.room.id.to_string(),
            booking_id: view.room.booking_id.to_string(),
            client_id: client_id.to_string(),
            counselor_id: counselor_id.to_string(),
            is_active: view.is_active,
            created_at: view.room.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterMessageDto {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub body: Option<String>,
    #[serde(rename = "attachmentUrl")]
    pub attachment_url: Option<String>,
    pub sequence: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FilterMessageDto {
    pub fn filter_message(message: &ChatMessage) -> Self {
        FilterMessageDto {
            id: message.id.to_string(),
            room_id: message.room_id.to_string(),
            sender_id: message.sender_id.to_string(),
            body: message.body.clone(),
            attachment_url: message.attachment_url.clone(),
            sequence: message.sequence,
            created_at: message.created_at,
        }
    }

    pub fn filter_messages(messages: &[ChatMessage]) -> Vec<FilterMessageDto> {
        messages.iter().map(FilterMessageDto::filter_message).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomData {
    pub room: FilterRoomDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomResponseDto {
    pub status: String,
    pub data: RoomData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageData {
    pub message: FilterMessageDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponseDto {
    pub status: String,
    pub data: MessageData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageListResponseDto {
    pub status: String,
    pub messages: Vec<FilterMessageDto>,
    pub results: usize,
}

/// Frame pushed over the WebSocket stream.
#[derive(Debug, Serialize)]
pub struct MessageStreamEnvelope {
    pub event_type: &'static str,
    pub message: FilterMessageDto,
}
