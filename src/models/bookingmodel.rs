use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn to_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "service_type", rename_all = "snake_case")]
pub enum ServiceType {
    SingleSession,
    Monthly,
    ChatOnly,
}

impl ServiceType {
    pub fn to_str(&self) -> &str {
        match self {
            ServiceType::SingleSession => "single_session",
            ServiceType::Monthly => "monthly",
            ServiceType::ChatOnly => "chat_only",
        }
    }
}

/// Lifecycle events a booking can receive. `ConfirmPayment` arrives from the
/// payment collaborator (PayPal capture or manually confirmed bank transfer),
/// the rest from the participants or an admin.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    ConfirmPayment,
    CompleteSession,
    Cancel,
}

impl BookingEvent {
    pub fn to_str(&self) -> &str {
        match self {
            BookingEvent::ConfirmPayment => "confirm_payment",
            BookingEvent::CompleteSession => "complete_session",
            BookingEvent::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Booking {
    pub id: uuid::Uuid,
    pub client_id: uuid::Uuid,
    pub counselor_id: uuid::Uuid,
    pub service_type: ServiceType,
    pub scheduled_at: DateTime<Utc>,
    pub status: BookingStatus,
    /// Amount in the smallest currency unit.
    pub amount: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// The two users allowed to read/write the booking's chat room. Always
    /// derived from the booking itself, never cached on the room.
    pub fn participants(&self) -> (uuid::Uuid, uuid::Uuid) {
        (self.client_id, self.counselor_id)
    }

    pub fn is_participant(&self, user_id: uuid::Uuid) -> bool {
        self.client_id == user_id || self.counselor_id == user_id
    }
}
