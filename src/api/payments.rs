//! Square payment endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;

use super::bookings::{apply_status, publish_status, reindex};
use super::{success, ApiResult};
use crate::db::PaymentUpdate;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, PaymentStatus};
use crate::payments::{SquareClient, WebhookEvent, SIGNATURE_HEADER};
use crate::AppState;

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    /// Whether the event changed a booking
    pub handled: bool,
}

fn square(state: &AppState) -> Result<Arc<SquareClient>, AppError> {
    state
        .square
        .clone()
        .ok_or_else(|| AppError::Unavailable("Square payments are not configured".to_string()))
}

/// POST /api/bookings/{id}/payment-link - Create a checkout link for the fare.
pub async fn create_payment_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    let square = square(&state)?;
    let booking = state.repo.require_booking(&id).await?;

    if matches!(
        booking.payment_status,
        PaymentStatus::Paid | PaymentStatus::Refunded
    ) {
        return Err(AppError::validation(format!(
            "Booking is already {}",
            booking.payment_status.as_str()
        )));
    }
    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::validation("Booking is cancelled"));
    }
    // The webhook matches on the stored order id, so an open link is reused
    // rather than replaced.
    if booking.payment_status == PaymentStatus::LinkCreated
        && booking.payment_link_url.is_some()
        && booking.payment_order_id.is_some()
    {
        return success(booking);
    }

    let link = square.create_payment_link(&booking).await?;
    let booking = state
        .repo
        .update_payment(
            &id,
            &PaymentUpdate {
                payment_status: Some(PaymentStatus::LinkCreated),
                payment_link_url: Some(link.url),
                payment_order_id: Some(link.order_id),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(booking_id = %booking.id, "Payment link created");
    success(booking)
}

/// POST /api/payments/webhook - Square payment notifications.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<WebhookAck> {
    let square = square(&state)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;
    square.verify_webhook_signature(&body, signature)?;

    let event: WebhookEvent = serde_json::from_str(&body)?;
    tracing::debug!(event_type = %event.event_type, event_id = ?event.event_id, "Square webhook received");

    let Some(payment) = event.completed_payment() else {
        return success(WebhookAck { handled: false });
    };
    let Some(order_id) = payment.order_id.as_deref() else {
        return success(WebhookAck { handled: false });
    };
    let Some(booking) = state.repo.find_booking_by_order(order_id).await? else {
        tracing::warn!(order_id = %order_id, "Completed payment for unknown order");
        return success(WebhookAck { handled: false });
    };
    if booking.payment_status == PaymentStatus::Paid {
        return success(WebhookAck { handled: false });
    }

    let booking = state
        .repo
        .update_payment(
            &booking.id,
            &PaymentUpdate {
                payment_status: Some(PaymentStatus::Paid),
                payment_id: Some(payment.id.clone()),
                ..Default::default()
            },
        )
        .await?;
    tracing::info!(booking_id = %booking.id, "Payment completed");

    if booking.status == BookingStatus::Pending {
        apply_status(&state, &booking.id, BookingStatus::Confirmed, None).await?;
    } else {
        reindex(&state, &booking).await;
        publish_status(&state, &booking);
    }

    success(WebhookAck { handled: true })
}

/// POST /api/admin/bookings/{id}/refund - Refund the full fare.
pub async fn refund_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    let square = square(&state)?;
    let booking = state.repo.require_booking(&id).await?;

    let payment_id = match (&booking.payment_status, &booking.payment_id) {
        (PaymentStatus::Paid, Some(payment_id)) => payment_id.clone(),
        _ => return Err(AppError::validation("Booking has no completed payment to refund")),
    };
    let amount = booking
        .fare_cents()
        .ok_or_else(|| AppError::validation("Booking has no fare to refund"))?;

    let refund = square.refund_payment(&payment_id, amount).await?;
    let booking = state
        .repo
        .update_payment(
            &id,
            &PaymentUpdate {
                payment_status: Some(PaymentStatus::Refunded),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(booking_id = %booking.id, refund_id = %refund.id, "Booking refunded");
    success(booking)
}
