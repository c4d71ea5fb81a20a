pub mod booking_gate;
pub mod bookings;
pub mod chat;

#[cfg(test)]
pub mod teststore;
