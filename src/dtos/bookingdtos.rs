use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::bookingmodel::{Booking, ServiceType};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingDto {
    pub counselor_id: Uuid,

    pub service_type: ServiceType,

    #[serde(rename = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,

    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Body for the transition endpoints. The payment collaborator knows the
/// payer's address and may ask us to notify it; when absent no email goes out.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct TransitionBookingDto {
    #[validate(email(message = "Notify email is invalid"))]
    #[serde(rename = "notifyEmail")]
    pub notify_email: Option<String>,
}

#[derive(Serialize, Deserialize, Validate)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterBookingDto {
    pub id: String,
    pub client_id: String,
    pub counselor_id: String,
    pub service_type: String,
    #[serde(rename = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub amount: i64,
    pub notes: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterBookingDto {
    pub fn filter_booking(booking: &Booking) -> Self {
        FilterBookingDto {
            id: booking.id.to_string(),
            client_id: booking.client_id.to_string(),
            counselor_id: booking.counselor_id.to_string(),
            service_type: booking.service_type.to_str().to_string(),
            scheduled_at: booking.scheduled_at,
            status: booking.status.to_str().to_string(),
            amount: booking.amount,
            notes: booking.notes.clone(),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }

    pub fn filter_bookings(bookings: &[Booking]) -> Vec<FilterBookingDto> {
        bookings.iter().map(FilterBookingDto::filter_booking).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingData {
    pub booking: FilterBookingDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponseDto {
    pub status: String,
    pub data: BookingData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingListResponseDto {
    pub status: String,
    pub bookings: Vec<FilterBookingDto>,
    pub results: usize,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}
