use crate::models::bookingmodel::{Booking, BookingEvent, BookingStatus};

/// Legal status graph: pending -> confirmed -> completed, with cancelled
/// reachable from pending or confirmed. Completed and cancelled are terminal.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransitionError {
    #[error("invalid transition: booking in status '{from}' cannot accept '{event}'")]
    InvalidTransition { from: String, event: String },
}

/// A room is active only while the session window is open. Re-evaluated on
/// every room fetch; never trusted from a stored flag, so an externally
/// driven cancellation takes effect on the very next read.
pub fn can_activate_room(booking: &Booking) -> bool {
    booking.status == BookingStatus::Confirmed
}

/// Validates `event` against the current status and returns the status the
/// booking should move to. Repeating the transition a booking already took
/// is an idempotent no-op success, so at-least-once delivery of payment
/// confirmations never errors.
pub fn transition(
    booking: &Booking,
    event: BookingEvent,
) -> Result<BookingStatus, TransitionError> {
    use BookingEvent::*;
    use BookingStatus::*;

    match (booking.status, event) {
        (Pending, ConfirmPayment) => Ok(Confirmed),
        (Confirmed, CompleteSession) => Ok(Completed),
        (Pending, Cancel) | (Confirmed, Cancel) => Ok(Cancelled),

        // idempotent repeats
        (Confirmed, ConfirmPayment) => Ok(Confirmed),
        (Completed, CompleteSession) => Ok(Completed),
        (Cancelled, Cancel) => Ok(Cancelled),

        (from, event) => Err(TransitionError::InvalidTransition {
            from: from.to_str().to_string(),
            event: event.to_str().to_string(),
        }),
    }
}
