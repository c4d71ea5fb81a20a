pub mod bookingdtos;
pub mod chatdtos;

pub use bookingdtos::*;
pub use chatdtos::*;
