//! Customer SMS notifications.
//!
//! Messages go out through Twilio when it is configured and are only logged
//! otherwise. Sending never blocks or fails the request that triggered it.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::TwilioConfig;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Booking lifecycle moments a customer hears about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    Received,
    Confirmed,
    DriverAssigned,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingEvent {
    /// Event announced by a move into `status`.
    pub fn for_status(status: BookingStatus) -> Option<Self> {
        match status {
            BookingStatus::Pending => None,
            BookingStatus::Confirmed => Some(BookingEvent::Confirmed),
            BookingStatus::InProgress => Some(BookingEvent::InProgress),
            BookingStatus::Completed => Some(BookingEvent::Completed),
            BookingStatus::Cancelled => Some(BookingEvent::Cancelled),
        }
    }
}

/// SMS text for an event.
pub fn message_for(event: BookingEvent, booking: &Booking) -> String {
    let reference = short_reference(&booking.id);
    match event {
        BookingEvent::Received => format!(
            "Hi {}, we received your ride request {} for {} from {}. We'll confirm shortly.",
            booking.name, reference, booking.pickup_date_time, booking.pickup_location
        ),
        BookingEvent::Confirmed => format!(
            "Your ride {} is confirmed for {}. Pickup: {}.",
            reference, booking.pickup_date_time, booking.pickup_location
        ),
        BookingEvent::DriverAssigned => format!(
            "A driver has been assigned to your ride {}.",
            reference
        ),
        BookingEvent::InProgress => format!(
            "Your ride {} is on its way to {}.",
            reference, booking.dropoff_location
        ),
        BookingEvent::Completed => format!(
            "Thanks for riding with us, {}! Your ride {} is complete.",
            booking.name, reference
        ),
        BookingEvent::Cancelled => format!("Your ride {} has been cancelled.", reference),
    }
}

fn short_reference(id: &str) -> String {
    let head: String = id.chars().take(8).collect();
    format!("#{}", head.to_uppercase())
}

/// Twilio Messages API client.
#[derive(Clone)]
struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
}

#[derive(Deserialize)]
struct TwilioMessage {
    sid: String,
}

#[derive(Deserialize)]
struct TwilioError {
    #[serde(default)]
    message: String,
}

impl TwilioClient {
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, AppError> {
        let response = self
            .client
            .post(format!(
                "{}/Accounts/{}/Messages.json",
                TWILIO_API_BASE, self.account_sid
            ))
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Twilio request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<TwilioError>()
                .await
                .map(|e| e.message)
                .unwrap_or_default();
            return Err(AppError::Notification(format!(
                "Twilio returned {}: {}",
                status, message
            )));
        }

        let message: TwilioMessage = response
            .json()
            .await
            .map_err(|e| AppError::Notification(format!("Invalid Twilio response: {}", e)))?;
        Ok(message.sid)
    }
}

/// Fire-and-forget customer notifier.
#[derive(Clone, Default)]
pub struct Notifier {
    twilio: Option<TwilioClient>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("twilio", &self.twilio.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Notifier {
    pub fn new(config: Option<&TwilioConfig>) -> Self {
        Self {
            twilio: config.map(|c| TwilioClient {
                client: Client::new(),
                account_sid: c.account_sid.clone(),
                auth_token: c.auth_token.clone(),
                from_number: c.from_number.clone(),
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.twilio.is_some()
    }

    /// Queue an SMS for the booking's customer on a background task.
    pub fn notify(&self, event: BookingEvent, booking: &Booking) {
        let body = message_for(event, booking);
        let to = booking.phone.clone();
        let booking_id = booking.id.clone();

        let Some(twilio) = self.twilio.clone() else {
            info!(booking_id = %booking_id, ?event, "SMS (not sent, Twilio not configured): {}", body);
            return;
        };

        tokio::spawn(async move {
            match twilio.send_sms(&to, &body).await {
                Ok(sid) => debug!(booking_id = %booking_id, ?event, sid = %sid, "SMS sent"),
                Err(e) => warn!(booking_id = %booking_id, ?event, "SMS failed: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;

    fn booking() -> Booking {
        Booking {
            id: "3f2a9c1e-0000-4000-8000-000000000000".to_string(),
            name: "Maria".to_string(),
            email: "maria@example.com".to_string(),
            phone: "+15550101000".to_string(),
            pickup_location: "400 Elm Street".to_string(),
            dropoff_location: "JFK Terminal 4".to_string(),
            pickup_date_time: "2030-01-01T08:00:00Z".to_string(),
            passengers: 2,
            fare: Some(85.0),
            flight_number: None,
            notes: None,
            status: BookingStatus::Pending,
            driver_id: None,
            payment_status: PaymentStatus::Unpaid,
            payment_link_url: None,
            payment_order_id: None,
            payment_id: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            version: 1,
        }
    }

    #[test]
    fn test_messages_reference_booking() {
        let booking = booking();
        let received = message_for(BookingEvent::Received, &booking);
        assert!(received.contains("Maria"));
        assert!(received.contains("#3F2A9C1E"));
        assert!(received.contains("400 Elm Street"));

        let in_progress = message_for(BookingEvent::InProgress, &booking);
        assert!(in_progress.contains("JFK Terminal 4"));
    }

    #[test]
    fn test_status_events() {
        assert_eq!(BookingEvent::for_status(BookingStatus::Pending), None);
        assert_eq!(
            BookingEvent::for_status(BookingStatus::Cancelled),
            Some(BookingEvent::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_only_logs() {
        let notifier = Notifier::new(None);
        assert!(!notifier.is_configured());
        notifier.notify(BookingEvent::Confirmed, &booking());
    }
}
