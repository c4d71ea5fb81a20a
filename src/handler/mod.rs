pub mod bookings;
pub mod chat;
