use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::db::{BookingExt, ChatExt};
use crate::models::bookingmodel::{Booking, BookingStatus, ServiceType};
use crate::models::chatmodel::{ChatMessage, ChatRoom};

/// In-memory store standing in for Postgres, implementing the same storage
/// traits the handlers use. The mutex serializes writes the way the
/// database's constraints would.
#[derive(Default, Clone)]
pub struct MemStore {
    pub inner: Arc<Mutex<MemInner>>,
}

#[derive(Default)]
pub struct MemInner {
    pub bookings: HashMap<Uuid, Booking>,
    pub rooms: Vec<ChatRoom>,
    pub messages: Vec<ChatMessage>,
}

impl MemStore {
    pub fn add_booking(&self, status: BookingStatus) -> Booking {
        let booking = Booking {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            counselor_id: Uuid::new_v4(),
            service_type: ServiceType::SingleSession,
            scheduled_at: Utc::now(),
            status,
            amount: 7500,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.inner
            .lock()
            .unwrap()
            .bookings
            .insert(booking.id, booking.clone());
        booking
    }

    pub fn set_status(&self, booking_id: Uuid, status: BookingStatus) {
        let mut inner = self.inner.lock().unwrap();
        inner.bookings.get_mut(&booking_id).unwrap().status = status;
    }
}

#[async_trait]
impl BookingExt for MemStore {
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, sqlx::Error> {
        Ok(self.inner.lock().unwrap().bookings.get(&booking_id).cloned())
    }

    async fn save_booking(
        &self,
        client_id: Uuid,
        counselor_id: Uuid,
        service_type: ServiceType,
        scheduled_at: DateTime<Utc>,
        amount: i64,
        notes: Option<String>,
    ) -> Result<Booking, sqlx::Error> {
        let booking = Booking {
            id: Uuid::new_v4(),
            client_id,
            counselor_id,
            service_type,
            scheduled_at,
            status: BookingStatus::Pending,
            amount,
            notes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.inner
            .lock()
            .unwrap()
            .bookings
            .insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_bookings_for_user(
        &self,
        user_id: Uuid,
        _page: u32,
        _limit: usize,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.client_id == user_id || b.counselor_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        // UPDATE ... WHERE id = $2 AND status = $3
        match inner.bookings.get_mut(&booking_id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                booking.updated_at = Utc::now();
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ChatExt for MemStore {
    async fn get_room_by_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<ChatRoom>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .rooms
            .iter()
            .find(|r| r.booking_id == booking_id)
            .cloned())
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Option<ChatRoom>, sqlx::Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .cloned())
    }

    async fn insert_room(
        &self,
        booking_id: Uuid,
        is_active: bool,
    ) -> Result<Option<ChatRoom>, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        // ON CONFLICT (booking_id) DO NOTHING
        if inner.rooms.iter().any(|r| r.booking_id == booking_id) {
            return Ok(None);
        }
        let room = ChatRoom {
            id: Uuid::new_v4(),
            booking_id,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.rooms.push(room.clone());
        Ok(Some(room))
    }

    async fn insert_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        body: Option<String>,
        attachment_url: Option<String>,
    ) -> Result<ChatMessage, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let sequence = inner
            .messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .map(|m| m.sequence)
            .max()
            .unwrap_or(0)
            + 1;
        let message = ChatMessage {
            id: Uuid::new_v4(),
            room_id,
            sender_id,
            body,
            attachment_url,
            sequence,
            created_at: Utc::now(),
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn get_messages(
        &self,
        room_id: Uuid,
        since_sequence: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.room_id == room_id && m.sequence > since_sequence)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.sequence);
        messages.truncate(limit as usize);
        Ok(messages)
    }
}
