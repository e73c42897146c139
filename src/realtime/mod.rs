//! Booking status fan-out.
//!
//! One broadcast channel per booking id, created on first subscribe. Publishing to a
//! booking nobody watches is a no-op. A channel is dropped when a publish finds no
//! receivers or when its last watcher releases it.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{BookingStatusView, DriverLocation};

/// Buffered messages per booking before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 32;

/// Message pushed to status subscribers; serialized as `{"type": "...", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusMessage {
    StatusUpdate(BookingStatusView),
    DriverLocation(DriverLocation),
}

/// Registry of per-booking broadcast channels.
#[derive(Default)]
pub struct StatusHub {
    channels: Mutex<HashMap<String, broadcast::Sender<StatusMessage>>>,
}

impl StatusHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to updates for a booking.
    pub fn subscribe(&self, booking_id: &str) -> broadcast::Receiver<StatusMessage> {
        let mut channels = self.lock();
        channels
            .entry(booking_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish to a booking's subscribers; returns how many received it.
    pub fn publish(&self, booking_id: &str, message: StatusMessage) -> usize {
        let mut channels = self.lock();
        let Some(sender) = channels.get(booking_id) else {
            return 0;
        };
        match sender.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                channels.remove(booking_id);
                0
            }
        }
    }

    /// Drop a booking's channel if nobody is listening any more.
    pub fn release(&self, booking_id: &str) {
        let mut channels = self.lock();
        if channels
            .get(booking_id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(booking_id);
        }
    }

    /// Number of bookings with a live channel.
    pub fn channel_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<StatusMessage>>> {
        // The map stays consistent even if a holder panicked, so poisoning is ignored.
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
