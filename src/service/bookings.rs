use uuid::Uuid;

use crate::db::BookingExt;
use crate::models::bookingmodel::{Booking, BookingEvent};
use crate::service::booking_gate::{self, TransitionError};

/// A concurrent transition makes the compare-and-swap miss; the event is
/// re-validated against what actually committed, a bounded number of times.
const MAX_TRANSITION_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking not found")]
    NotFound,
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("could not apply the transition, too much contention")]
    Contention,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

/// Applies a lifecycle event to a booking. The status write is a
/// compare-and-swap on the status the gate validated, so a transition racing
/// this one can never be overwritten: the swap misses, the booking is
/// re-read and the event re-validated against the committed state. Returns
/// the booking and whether this call changed it.
pub async fn apply_event<S>(
    store: &S,
    booking_id: Uuid,
    event: BookingEvent,
) -> Result<(Booking, bool), BookingError>
where
    S: BookingExt + Sync,
{
    let mut attempt = 0;
    loop {
        let booking = store
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        let next_status = booking_gate::transition(&booking, event)?;

        // Idempotent repeat: nothing to write.
        if next_status == booking.status {
            return Ok((booking, false));
        }

        match store
            .update_booking_status(booking_id, booking.status, next_status)
            .await?
        {
            Some(updated) => return Ok((updated, true)),
            None => {
                attempt += 1;
                if attempt >= MAX_TRANSITION_RETRIES {
                    return Err(BookingError::Contention);
                }
                tracing::debug!(
                    booking_id = %booking_id,
                    "booking status moved underneath the transition, re-validating"
                );
            }
        }
    }
}
