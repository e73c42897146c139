//! Booking API endpoints.

use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;

use super::{success, ApiJson, ApiQuery, ApiResult};
use crate::errors::AppError;
use crate::models::{
    AssignDriverRequest, Booking, BookingStatus, BookingStatusView, CancelBookingRequest,
    CreateBookingRequest, DriverLocation, UpdateBookingRequest, UpdateBookingStatusRequest,
};
use crate::notify::BookingEvent;
use crate::realtime::StatusMessage;
use crate::AppState;

/// Admin booking list filter.
#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    #[serde(default)]
    pub status: Option<BookingStatus>,
}

/// POST /api/bookings - Submit the public booking form.
pub async fn create_booking(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateBookingRequest>,
) -> ApiResult<Booking> {
    let new_booking = request.validate(Utc::now()).map_err(AppError::Validation)?;
    let booking = state.repo.create_booking(&new_booking).await?;

    tracing::info!(booking_id = %booking.id, "Booking received");
    reindex(&state, &booking).await;
    state.notifier.notify(BookingEvent::Received, &booking);

    success(booking)
}

/// GET /api/bookings/{id} - Get a single booking.
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    success(state.repo.require_booking(&id).await?)
}

/// GET /api/bookings/{id}/status - Status snapshot polled by clients.
pub async fn get_booking_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<BookingStatusView> {
    let booking = state.repo.require_booking(&id).await?;
    success(BookingStatusView::from(&booking))
}

/// POST /api/bookings/{id}/cancel - Customer self-service cancellation.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CancelBookingRequest>,
) -> ApiResult<Booking> {
    let booking = state.repo.require_booking(&id).await?;
    if !booking
        .email
        .eq_ignore_ascii_case(request.email.trim())
    {
        return Err(AppError::Forbidden(
            "Email does not match this booking".to_string(),
        ));
    }

    apply_status(&state, &id, BookingStatus::Cancelled, None).await
}

/// GET /api/bookings/{id}/driver-location - Last position of the assigned driver.
pub async fn get_booking_driver_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DriverLocation> {
    let booking = state.repo.require_booking(&id).await?;
    let driver_id = booking
        .driver_id
        .ok_or_else(|| AppError::NotFound(format!("No driver assigned to booking {}", id)))?;

    let location = state
        .repo
        .get_driver_location(&driver_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No location reported for driver {}", driver_id)))?;

    success(location)
}

/// GET /api/admin/bookings - List bookings.
pub async fn list_bookings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> ApiResult<Vec<Booking>> {
    success(state.repo.list_bookings(query.status).await?)
}

/// PUT /api/admin/bookings/{id}/status - Move a booking through its lifecycle.
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateBookingStatusRequest>,
) -> ApiResult<Booking> {
    apply_status(&state, &id, request.status, request.expected_version).await
}

/// PUT /api/admin/bookings/{id}/driver - Assign or unassign a driver.
pub async fn assign_driver(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<AssignDriverRequest>,
) -> ApiResult<Booking> {
    let driver_id = request
        .driver_id
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let booking = state
        .repo
        .assign_driver(&id, driver_id, request.expected_version)
        .await?;

    tracing::info!(booking_id = %booking.id, driver_id = ?booking.driver_id, "Driver assignment changed");
    reindex(&state, &booking).await;
    publish_status(&state, &booking);
    if booking.driver_id.is_some() {
        state.notifier.notify(BookingEvent::DriverAssigned, &booking);
    }

    success(booking)
}

/// PATCH /api/admin/bookings/{id} - Edit fare, flight number, notes or phone.
pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateBookingRequest>,
) -> ApiResult<Booking> {
    if let Some(fare) = request.fare {
        if !fare.is_finite() || fare < 0.0 {
            return Err(AppError::validation("Fare must be a non-negative amount"));
        }
    }

    let booking = state.repo.update_booking(&id, &request).await?;
    reindex(&state, &booking).await;

    success(booking)
}

/// Shared by admin status changes, customer cancellation and payment webhooks.
pub(crate) async fn apply_status(
    state: &AppState,
    id: &str,
    status: BookingStatus,
    expected_version: Option<i64>,
) -> ApiResult<Booking> {
    let (booking, changed) = state
        .repo
        .update_booking_status(id, status, expected_version)
        .await?;

    if changed {
        tracing::info!(booking_id = %booking.id, status = booking.status.as_str(), "Booking status changed");
        reindex(state, &booking).await;
        publish_status(state, &booking);
        if let Some(event) = BookingEvent::for_status(booking.status) {
            state.notifier.notify(event, &booking);
        }
    }

    success(booking)
}

pub(crate) fn publish_status(state: &AppState, booking: &Booking) {
    let delivered = state.hub.publish(
        &booking.id,
        StatusMessage::StatusUpdate(BookingStatusView::from(booking)),
    );
    tracing::debug!(booking_id = %booking.id, delivered, "Published status update");
}

pub(crate) async fn reindex(state: &AppState, booking: &Booking) {
    if let Err(e) = state.search.index_booking(booking).await {
        tracing::warn!("Failed to index booking {}: {}", booking.id, e);
    }
}
