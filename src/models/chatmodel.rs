use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ChatRoom {
    pub id: uuid::Uuid,
    /// Exactly one room per booking, enforced by a UNIQUE constraint.
    pub booking_id: uuid::Uuid,
    /// Snapshot taken at creation. Read paths recompute activity from the
    /// booking status instead of trusting this flag.
    pub is_active: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct ChatMessage {
    pub id: uuid::Uuid,
    pub room_id: uuid::Uuid,
    pub sender_id: uuid::Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    /// Authoritative per-room order key, strictly increasing from 1.
    pub sequence: i64,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
