pub mod bookingmodel;
pub mod chatmodel;
