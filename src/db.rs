use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{
    bookingmodel::{Booking, BookingStatus, ServiceType},
    chatmodel::{ChatMessage, ChatRoom},
};

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

#[async_trait]
pub trait BookingExt {
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, sqlx::Error>;

    async fn save_booking(
        &self,
        client_id: Uuid,
        counselor_id: Uuid,
        service_type: ServiceType,
        scheduled_at: DateTime<Utc>,
        amount: i64,
        notes: Option<String>,
    ) -> Result<Booking, sqlx::Error>;

    async fn get_bookings_for_user(
        &self,
        user_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Booking>, sqlx::Error>;

    /// Compare-and-swap status write: succeeds only while the booking still
    /// holds the status the gate validated against. `None` means a concurrent
    /// transition committed first and the caller must re-read and re-validate.
    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, sqlx::Error>;
}

#[async_trait]
pub trait ChatExt {
    async fn get_room_by_booking(&self, booking_id: Uuid)
        -> Result<Option<ChatRoom>, sqlx::Error>;

    async fn get_room(&self, room_id: Uuid) -> Result<Option<ChatRoom>, sqlx::Error>;

    /// Inserts a room for the booking. Returns `None` when another caller won
    /// the creation race (the UNIQUE constraint on booking_id absorbed the
    /// insert); the caller re-fetches in that case.
    async fn insert_room(
        &self,
        booking_id: Uuid,
        is_active: bool,
    ) -> Result<Option<ChatRoom>, sqlx::Error>;

    /// Appends a message with the next per-room sequence number. Concurrent
    /// appends can collide on UNIQUE(room_id, sequence); the service layer
    /// retries on that conflict.
    async fn insert_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        body: Option<String>,
        attachment_url: Option<String>,
    ) -> Result<ChatMessage, sqlx::Error>;

    async fn get_messages(
        &self,
        room_id: Uuid,
        since_sequence: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, sqlx::Error>;
}

#[async_trait]
impl BookingExt for DBClient {
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, sqlx::Error> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
        SELECT id, client_id, counselor_id, service_type, scheduled_at,
               status, amount, notes, created_at, updated_at
        FROM bookings
        WHERE id = $1"#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
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
        let booking = sqlx::query_as::<_, Booking>(
            r#"
        INSERT INTO bookings (client_id, counselor_id, service_type, scheduled_at, amount, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, client_id, counselor_id, service_type, scheduled_at,
                  status, amount, notes, created_at, updated_at
        "#,
        )
        .bind(client_id)
        .bind(counselor_id)
        .bind(service_type)
        .bind(scheduled_at)
        .bind(amount)
        .bind(notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(booking)
    }

    async fn get_bookings_for_user(
        &self,
        user_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        let offset = (page - 1) * limit as u32;

        let bookings = sqlx::query_as::<_, Booking>(
            r#"
        SELECT id, client_id, counselor_id, service_type, scheduled_at,
               status, amount, notes, created_at, updated_at
        FROM bookings
        WHERE client_id = $1 OR counselor_id = $1
        ORDER BY scheduled_at DESC LIMIT $2 OFFSET $3"#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING id, client_id, counselor_id, service_type, scheduled_at,
                      status, amount, notes, created_at, updated_at
            "#,
        )
        .bind(to)
        .bind(booking_id)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }
}

#[async_trait]
impl ChatExt for DBClient {
    async fn get_room_by_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<ChatRoom>, sqlx::Error> {
        sqlx::query_as::<_, ChatRoom>(
            r#"
            SELECT id, booking_id, is_active, created_at, updated_at
            FROM chat_rooms
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_room(&self, room_id: Uuid) -> Result<Option<ChatRoom>, sqlx::Error> {
        sqlx::query_as::<_, ChatRoom>(
            r#"
            SELECT id, booking_id, is_active, created_at, updated_at
            FROM chat_rooms
            WHERE id = $1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_room(
        &self,
        booking_id: Uuid,
        is_active: bool,
    ) -> Result<Option<ChatRoom>, sqlx::Error> {
        sqlx::query_as::<_, ChatRoom>(
            r#"
            INSERT INTO chat_rooms (booking_id, is_active)
            VALUES ($1, $2)
            ON CONFLICT (booking_id) DO NOTHING
            RETURNING id, booking_id, is_active, created_at, updated_at
            "#,
        )
        .bind(booking_id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        body: Option<String>,
        attachment_url: Option<String>,
    ) -> Result<ChatMessage, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO messages (room_id, sender_id, body, attachment_url, sequence)
            VALUES ($1, $2, $3, $4,
                (SELECT COALESCE(MAX(sequence), 0) + 1 FROM messages WHERE room_id = $1))
            RETURNING id, room_id, sender_id, body, attachment_url, sequence, created_at
            "#,
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(body)
        .bind(attachment_url)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_messages(
        &self,
        room_id: Uuid,
        since_sequence: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, room_id, sender_id, body, attachment_url, sequence, created_at
            FROM messages
            WHERE room_id = $1 AND sequence > $2
            ORDER BY sequence ASC
            LIMIT $3
            "#,
        )
        .bind(room_id)
        .bind(since_sequence)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
