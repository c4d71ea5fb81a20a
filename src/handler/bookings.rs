use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::BookingExt,
    dtos::{
        BookingData, BookingListResponseDto, BookingResponseDto, CreateBookingDto,
        FilterBookingDto, RequestQueryDto, TransitionBookingDto,
    },
    error::{ErrorMessage, HttpError},
    mail::mails::{send_booking_cancelled_email, send_booking_confirmed_email},
    middleware::JWTAuthMiddeware,
    models::bookingmodel::{Booking, BookingEvent, BookingStatus},
    service::bookings::{self, BookingError},
    AppState,
};

pub fn bookings_handler() -> Router {
    Router::new()
        .route("/", post(create_booking).get(list_my_bookings))
        .route("/:booking_id", get(get_booking))
        .route("/:booking_id/confirm", put(confirm_booking))
        .route("/:booking_id/complete", put(complete_booking))
        .route("/:booking_id/cancel", put(cancel_booking))
}

pub async fn create_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if body.counselor_id == user.user_id {
        return Err(HttpError::bad_request("Cannot book a session with yourself"));
    }

    let booking = app_state
        .db_client
        .save_booking(
            user.user_id,
            body.counselor_id,
            body.service_type,
            body.scheduled_at,
            body.amount,
            body.notes,
        )
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    tracing::info!(booking_id = %booking.id, client_id = %user.user_id, "booking created");

    Ok(Json(BookingResponseDto {
        status: "success".to_string(),
        data: BookingData {
            booking: FilterBookingDto::filter_booking(&booking),
        },
    }))
}

pub async fn get_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = fetch_booking_for(&app_state, booking_id, user.user_id).await?;

    Ok(Json(BookingResponseDto {
        status: "success".to_string(),
        data: BookingData {
            booking: FilterBookingDto::filter_booking(&booking),
        },
    }))
}

pub async fn list_my_bookings(
    Query(query_params): Query<RequestQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let bookings = app_state
        .db_client
        .get_bookings_for_user(user.user_id, page as u32, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let results = bookings.len();

    Ok(Json(BookingListResponseDto {
        status: "success".to_string(),
        bookings: FilterBookingDto::filter_bookings(&bookings),
        results,
    }))
}

/// Payment collaborator entry point: PayPal capture or a manually confirmed
/// bank transfer lands here. Safe under at-least-once delivery because the
/// gate treats a repeated confirm as a no-op success.
pub async fn confirm_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<TransitionBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    apply_transition(app_state, user, booking_id, BookingEvent::ConfirmPayment, body).await
}

pub async fn complete_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<TransitionBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    apply_transition(app_state, user, booking_id, BookingEvent::CompleteSession, body).await
}

pub async fn cancel_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<TransitionBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    apply_transition(app_state, user, booking_id, BookingEvent::Cancel, body).await
}

async fn apply_transition(
    app_state: Arc<AppState>,
    user: JWTAuthMiddeware,
    booking_id: Uuid,
    event: BookingEvent,
    body: TransitionBookingDto,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    fetch_booking_for(&app_state, booking_id, user.user_id).await?;

    let (booking, changed) = bookings::apply_event(&app_state.db_client, booking_id, event)
        .await
        .map_err(map_booking_error)?;

    if changed {
        tracing::info!(
            booking_id = %booking_id,
            to = booking.status.to_str(),
            "booking transition applied"
        );
        notify_transition(&app_state, &booking, body.notify_email.as_deref()).await;
    }

    Ok(Json(BookingResponseDto {
        status: "success".to_string(),
        data: BookingData {
            booking: FilterBookingDto::filter_booking(&booking),
        },
    }))
}

fn map_booking_error(err: BookingError) -> HttpError {
    match err {
        BookingError::NotFound => HttpError::not_found(ErrorMessage::BookingNotFound.to_string()),
        BookingError::Rejected(e) => HttpError::conflict(e.to_string()),
        BookingError::Contention => HttpError::server_error(ErrorMessage::ServerError.to_string()),
        BookingError::Storage(e) => HttpError::server_error(e.to_string()),
    }
}

/// Email collaborator boundary: a failed send is logged and swallowed, it
/// never rolls back the transition.
async fn notify_transition(app_state: &AppState, booking: &Booking, notify_email: Option<&str>) {
    let Some(email) = notify_email else {
        return;
    };

    let result = match booking.status {
        BookingStatus::Confirmed => {
            send_booking_confirmed_email(&app_state.env, email, booking).await
        }
        BookingStatus::Cancelled => {
            send_booking_cancelled_email(&app_state.env, email, booking).await
        }
        _ => return,
    };

    if let Err(e) = result {
        tracing::warn!(booking_id = %booking.id, "failed to send booking email: {}", e);
    }
}

async fn fetch_booking_for(
    app_state: &AppState,
    booking_id: Uuid,
    user_id: Uuid,
) -> Result<Booking, HttpError> {
    let booking = app_state
        .db_client
        .get_booking(booking_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or(HttpError::not_found(ErrorMessage::BookingNotFound.to_string()))?;

    if !booking.is_participant(user_id) {
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    Ok(booking)
}
