//! Driver location API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiResult};
use crate::errors::AppError;
use crate::models::{DriverLocation, UpdateLocationRequest};
use crate::realtime::StatusMessage;
use crate::AppState;

/// PUT /api/admin/drivers/{id}/location - Report a driver's position.
///
/// The position is also pushed to everyone watching a booking the driver is on.
pub async fn update_driver_location(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    ApiJson(request): ApiJson<UpdateLocationRequest>,
) -> ApiResult<DriverLocation> {
    request.validate().map_err(AppError::Validation)?;

    let location = state
        .repo
        .upsert_driver_location(&driver_id, &request)
        .await?;

    for booking in state.repo.list_active_bookings_for_driver(&driver_id).await? {
        state.hub.publish(
            &booking.id,
            StatusMessage::DriverLocation(location.clone()),
        );
    }

    success(location)
}

/// GET /api/admin/drivers/locations - Every driver's last position.
pub async fn list_driver_locations(
    State(state): State<AppState>,
) -> ApiResult<Vec<DriverLocation>> {
    success(state.repo.list_driver_locations().await?)
}
