use uuid::Uuid;

use crate::db::{BookingExt, ChatExt};
use crate::models::bookingmodel::Booking;
use crate::models::chatmodel::{ChatMessage, ChatRoom};
use crate::service::booking_gate;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 200;

/// Concurrent appends to one room can collide on the UNIQUE(room_id, sequence)
/// constraint; the append is retried with a fresh sequence a few times before
/// giving up.
const MAX_APPEND_RETRIES: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("booking not found")]
    BookingNotFound,
    #[error("chat room not found")]
    RoomNotFound,
    #[error("sender is not a participant of this room")]
    NotAParticipant,
    #[error("message must have a body or an attachment")]
    EmptyMessage,
    #[error("session is closed")]
    RoomInactive,
    #[error("could not assign a message sequence, too much contention")]
    SequenceContention,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// A room together with its activity recomputed from the live booking.
/// The stored `room.is_active` is a creation-time snapshot and is never
/// consulted after this point.
#[derive(Debug, Clone)]
pub struct RoomView {
    pub room: ChatRoom,
    pub booking: Booking,
    pub is_active: bool,
}

impl RoomView {
    pub fn participants(&self) -> (Uuid, Uuid) {
        self.booking.participants()
    }
}

/// Find-or-create the single room for a booking, on behalf of one of its
/// participants. The requester is authorized before the insert, so a
/// stranger can never trigger room creation. Safe under concurrent first
/// access from both participants: the insert absorbs the duplicate and both
/// callers observe the same room id.
pub async fn get_or_create_room<S>(
    store: &S,
    booking_id: Uuid,
    requester_id: Uuid,
) -> Result<RoomView, ChatError>
where
    S: BookingExt + ChatExt + Sync,
{
    let booking = store
        .get_booking(booking_id)
        .await?
        .ok_or(ChatError::BookingNotFound)?;

    if !booking.is_participant(requester_id) {
        return Err(ChatError::NotAParticipant);
    }

    let is_active = booking_gate::can_activate_room(&booking);

    if let Some(room) = store.get_room_by_booking(booking_id).await? {
        return Ok(RoomView {
            room,
            booking,
            is_active,
        });
    }

    let room = match store.insert_room(booking_id, is_active).await? {
        Some(room) => room,
        // Lost the creation race; the other participant's room is the room.
        None => store
            .get_room_by_booking(booking_id)
            .await?
            .ok_or(ChatError::RoomNotFound)?,
    };

    tracing::info!(room_id = %room.id, booking_id = %booking_id, "chat room created");

    Ok(RoomView {
        room,
        booking,
        is_active,
    })
}

/// Fetch a room by id with its activity recomputed from the booking.
pub async fn get_room_view<S>(store: &S, room_id: Uuid) -> Result<RoomView, ChatError>
where
    S: BookingExt + ChatExt + Sync,
{
    let room = store.get_room(room_id).await?.ok_or(ChatError::RoomNotFound)?;

    let booking = store
        .get_booking(room.booking_id)
        .await?
        .ok_or(ChatError::BookingNotFound)?;

    let is_active = booking_gate::can_activate_room(&booking);

    Ok(RoomView {
        room,
        booking,
        is_active,
    })
}

/// Append one immutable message to the room's ledger.
///
/// Rejected when the sender is not one of the booking's two participants,
/// when both body and attachment are blank, or when the room's live activity
/// is false. The assigned sequence is the authoritative order key.
pub async fn append_message<S>(
    store: &S,
    room_id: Uuid,
    sender_id: Uuid,
    body: Option<String>,
    attachment_url: Option<String>,
) -> Result<ChatMessage, ChatError>
where
    S: BookingExt + ChatExt + Sync,
{
    let view = get_room_view(store, room_id).await?;

    if !view.booking.is_participant(sender_id) {
        return Err(ChatError::NotAParticipant);
    }

    let body = body.filter(|b| !b.trim().is_empty());
    let attachment_url = attachment_url.filter(|u| !u.trim().is_empty());

    if body.is_none() && attachment_url.is_none() {
        return Err(ChatError::EmptyMessage);
    }

    if !view.is_active {
        return Err(ChatError::RoomInactive);
    }

    let mut attempt = 0;
    loop {
        match store
            .insert_message(room_id, sender_id, body.clone(), attachment_url.clone())
            .await
        {
            Ok(message) => {
                tracing::debug!(
                    room_id = %room_id,
                    sequence = message.sequence,
                    "message appended"
                );
                return Ok(message);
            }
            Err(err) if is_unique_violation(&err) => {
                attempt += 1;
                if attempt >= MAX_APPEND_RETRIES {
                    tracing::warn!(room_id = %room_id, "append gave up after sequence conflicts");
                    return Err(ChatError::SequenceContention);
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Ordered, gap-free catch-up read. `since_sequence = 0` reads from the
/// beginning. History stays readable after the session window closes.
pub async fn history<S>(
    store: &S,
    room_id: Uuid,
    requester_id: Uuid,
    since_sequence: i64,
    limit: Option<i64>,
) -> Result<Vec<ChatMessage>, ChatError>
where
    S: BookingExt + ChatExt + Sync,
{
    let view = get_room_view(store, room_id).await?;

    if !view.booking.is_participant(requester_id) {
        return Err(ChatError::NotAParticipant);
    }

    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let messages = store.get_messages(room_id, since_sequence, limit).await?;
    Ok(messages)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bookingmodel::{BookingEvent, BookingStatus};
    use crate::service::booking_gate;
    use crate::service::teststore::MemStore;

    #[tokio::test]
    async fn pending_booking_gets_inactive_room_and_rejects_sends() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Pending);

        let view = get_or_create_room(&store, booking.id, booking.client_id)
            .await
            .unwrap();
        assert!(!view.is_active);

        let err = append_message(&store, view.room.id, booking.client_id, Some("hi".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::RoomInactive));
    }

    #[tokio::test]
    async fn confirming_reopens_the_room_without_a_room_write() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Pending);
        let view = get_or_create_room(&store, booking.id, booking.client_id).await.unwrap();
        assert!(!view.is_active);

        // Payment collaborator confirms; only the booking row changes.
        let next = booking_gate::transition(&booking, BookingEvent::ConfirmPayment).unwrap();
        store.set_status(booking.id, next);

        let view = get_or_create_room(&store, booking.id, booking.client_id).await.unwrap();
        assert!(view.is_active);

        let msg = append_message(&store, view.room.id, booking.client_id, Some("hi".into()), None)
            .await
            .unwrap();
        assert_eq!(msg.sequence, 1);
    }

    #[tokio::test]
    async fn attachment_only_messages_are_valid() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Confirmed);
        let view = get_or_create_room(&store, booking.id, booking.client_id).await.unwrap();

        append_message(&store, view.room.id, booking.client_id, Some("hi".into()), None)
            .await
            .unwrap();
        let msg = append_message(
            &store,
            view.room.id,
            booking.counselor_id,
            None,
            Some("https://files/x.png".into()),
        )
        .await
        .unwrap();
        assert_eq!(msg.sequence, 2);

        let messages = history(&store, view.room.id, booking.client_id, 0, None)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body.as_deref(), Some("hi"));
        assert_eq!(messages[1].attachment_url.as_deref(), Some("https://files/x.png"));
    }

    #[tokio::test]
    async fn append_validation_rejects_strangers_and_blank_messages() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Confirmed);
        let view = get_or_create_room(&store, booking.id, booking.client_id).await.unwrap();

        let stranger = Uuid::new_v4();
        let err = append_message(&store, view.room.id, stranger, Some("hi".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotAParticipant));

        let err = append_message(
            &store,
            view.room.id,
            booking.client_id,
            Some("   ".into()),
            Some("".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
    }

    #[tokio::test]
    async fn cancelled_booking_closes_sends_but_keeps_history() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Confirmed);
        let view = get_or_create_room(&store, booking.id, booking.client_id).await.unwrap();

        append_message(&store, view.room.id, booking.client_id, Some("hi".into()), None)
            .await
            .unwrap();
        append_message(&store, view.room.id, booking.counselor_id, Some("hello".into()), None)
            .await
            .unwrap();

        store.set_status(booking.id, BookingStatus::Cancelled);

        let err = append_message(
            &store,
            view.room.id,
            booking.client_id,
            Some("still there?".into()),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChatError::RoomInactive));

        let messages = history(&store, view.room.id, booking.client_id, 0, None)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_first_access_yields_one_room() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Confirmed);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let booking_id = booking.id;
            let requester = if i % 2 == 0 {
                booking.client_id
            } else {
                booking.counselor_id
            };
            handles.push(tokio::spawn(async move {
                get_or_create_room(&store, booking_id, requester)
                    .await
                    .unwrap()
                    .room
                    .id
            }));
        }

        let mut room_ids = Vec::new();
        for handle in handles {
            room_ids.push(handle.await.unwrap());
        }
        room_ids.sort();
        room_ids.dedup();
        assert_eq!(room_ids.len(), 1, "all callers must observe the same room");
        assert_eq!(store.inner.lock().unwrap().rooms.len(), 1);
    }

    #[tokio::test]
    async fn missing_booking_creates_no_orphan_room() {
        let store = MemStore::default();
        let err = get_or_create_room(&store, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::BookingNotFound));
        assert!(store.inner.lock().unwrap().rooms.is_empty());
    }

    #[tokio::test]
    async fn strangers_cannot_trigger_room_creation() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Confirmed);

        // Authenticated but not a party to the booking: rejected before any
        // room write happens.
        let err = get_or_create_room(&store, booking.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotAParticipant));
        assert!(store.inner.lock().unwrap().rooms.is_empty());

        let view = get_or_create_room(&store, booking.id, booking.counselor_id)
            .await
            .unwrap();
        assert_eq!(view.room.booking_id, booking.id);
    }

    #[tokio::test]
    async fn interleaved_senders_get_strictly_increasing_sequences() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Confirmed);
        let view = get_or_create_room(&store, booking.id, booking.client_id).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let room_id = view.room.id;
            let sender = if i % 2 == 0 {
                booking.client_id
            } else {
                booking.counselor_id
            };
            handles.push(tokio::spawn(async move {
                append_message(&store, room_id, sender, Some(format!("m{}", i)), None)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let messages = history(&store, view.room.id, booking.client_id, 0, Some(200))
            .await
            .unwrap();
        assert_eq!(messages.len(), 20);
        for (i, message) in messages.iter().enumerate() {
            assert_eq!(message.sequence, i as i64 + 1);
        }
    }

    #[tokio::test]
    async fn history_since_sequence_closes_gaps_without_duplicates() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Confirmed);
        let view = get_or_create_room(&store, booking.id, booking.client_id).await.unwrap();

        for i in 0..10 {
            append_message(&store, view.room.id, booking.client_id, Some(format!("m{}", i)), None)
                .await
                .unwrap();
        }

        // Subscriber saw up to sequence 4, then disconnected.
        let missed = history(&store, view.room.id, booking.counselor_id, 4, None)
            .await
            .unwrap();
        let sequences: Vec<i64> = missed.iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![5, 6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn history_rejects_non_participants() {
        let store = MemStore::default();
        let booking = store.add_booking(BookingStatus::Confirmed);
        let view = get_or_create_room(&store, booking.id, booking.client_id).await.unwrap();

        let err = history(&store, view.room.id, Uuid::new_v4(), 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotAParticipant));
    }
}
