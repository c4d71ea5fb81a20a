use crate::config::Config;
use crate::models::bookingmodel::Booking;

use super::sendmail::send_email;

/// Sent when the payment collaborator confirms a booking. Failures are the
/// caller's to log; a lost email never rolls back the transition.
pub async fn send_booking_confirmed_email(
    config: &Config,
    to: &str,
    booking: &Booking,
) -> Result<(), String> {
    let subject = "Your counseling session is confirmed";
    let html = format!(
        r#"<p>Your session is confirmed.</p>
        <p>Scheduled for: <strong>{}</strong></p>
        <p>Amount: <strong>{}</strong></p>
        <p>The chat room for your session is now open.</p>"#,
        booking.scheduled_at.format("%Y-%m-%d %H:%M UTC"),
        booking.amount,
    );

    send_email(config, to, subject, &html).await
}

pub async fn send_booking_cancelled_email(
    config: &Config,
    to: &str,
    booking: &Booking,
) -> Result<(), String> {
    let subject = "Your counseling session was cancelled";
    let html = format!(
        r#"<p>Your session scheduled for <strong>{}</strong> has been cancelled.</p>
        <p>The session chat is closed; your message history remains available.</p>"#,
        booking.scheduled_at.format("%Y-%m-%d %H:%M UTC"),
    );

    send_email(config, to, subject, &html).await
}
