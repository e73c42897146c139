//! Booking status WebSocket.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::errors::AppError;
use crate::models::{Booking, BookingStatusView};
use crate::realtime::{StatusHub, StatusMessage};
use crate::AppState;

/// GET /api/bookings/{id}/ws - Push status updates for one booking.
///
/// Sends the current status first, then every update published for the booking.
pub async fn booking_status_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    // Subscribe before reading the snapshot; a change landing in between is then
    // delivered after it instead of lost.
    let updates = state.hub.subscribe(&id);
    let booking = match state.repo.require_booking(&id).await {
        Ok(booking) => booking,
        Err(e) => {
            drop(updates);
            state.hub.release(&id);
            return Err(e);
        }
    };

    let hub = state.hub.clone();
    Ok(ws.on_upgrade(move |socket| forward_updates(socket, hub, booking, updates)))
}

async fn forward_updates(
    mut socket: WebSocket,
    hub: Arc<StatusHub>,
    booking: Booking,
    mut updates: broadcast::Receiver<StatusMessage>,
) {
    watch_booking(&mut socket, &booking, &mut updates).await;

    drop(updates);
    hub.release(&booking.id);
    tracing::debug!(booking_id = %booking.id, "Status socket closed");
}

async fn watch_booking(
    socket: &mut WebSocket,
    booking: &Booking,
    updates: &mut broadcast::Receiver<StatusMessage>,
) {
    let snapshot = StatusMessage::StatusUpdate(BookingStatusView::from(booking));
    if send_message(socket, &snapshot).await.is_err() {
        return;
    }
    tracing::debug!(booking_id = %booking.id, "Status socket opened");

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(message) => {
                    if send_message(socket, &message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(booking_id = %booking.id, "Status socket lagged, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Client frames carry nothing we act on.
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn send_message(socket: &mut WebSocket, message: &StatusMessage) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(text.into())).await
}
