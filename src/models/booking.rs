//! Booking model, request bodies and booking-form validation.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Lowest and highest passenger count a single car can take.
pub const MIN_PASSENGERS: i64 = 1;
pub const MAX_PASSENGERS: i64 = 10;

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in-progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "in-progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a booking may move from `self` to `next`.
    ///
    /// Re-applying the current status is not a transition; callers treat it as a no-op.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

/// Payment state of a booking as far as Square has told us.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Unpaid,
    LinkCreated,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::LinkCreated => "link-created",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "link-created" => Some(PaymentStatus::LinkCreated),
            "paid" => Some(PaymentStatus::Paid),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// A customer's scheduled ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    /// RFC 3339, UTC
    pub pickup_date_time: String,
    pub passengers: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fare: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_link_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Booking {
    /// Fare in the smallest currency unit, as Square expects it.
    pub fn fare_cents(&self) -> Option<i64> {
        self.fare.map(|fare| (fare * 100.0).round() as i64)
    }
}

/// Request body of the public booking form.
///
/// Every field defaults so that missing fields surface as validation messages
/// instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub pickup_location: String,
    #[serde(default)]
    pub dropoff_location: String,
    #[serde(default)]
    pub pickup_date_time: String,
    #[serde(default)]
    pub passengers: i64,
    #[serde(default)]
    pub fare: Option<f64>,
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A booking form that passed validation, with trimmed fields and a normalized pickup time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_date_time: String,
    pub passengers: i64,
    pub fare: Option<f64>,
    pub flight_number: Option<String>,
    pub notes: Option<String>,
}

impl CreateBookingRequest {
    /// Validate the form against `now`, collecting every applicable message.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<NewBooking, Vec<String>> {
        let mut errors = Vec::new();

        let name = required(&self.name, "Name is required", &mut errors);
        let email = required(&self.email, "Email is required", &mut errors);
        if !email.is_empty() && !looks_like_email(&email) {
            errors.push("Email is invalid".to_string());
        }
        let phone = required(&self.phone, "Phone is required", &mut errors);
        let pickup_location = required(
            &self.pickup_location,
            "Pickup location is required",
            &mut errors,
        );
        let dropoff_location = required(
            &self.dropoff_location,
            "Dropoff location is required",
            &mut errors,
        );

        let pickup = self.pickup_date_time.trim();
        let pickup_date_time = if pickup.is_empty() {
            errors.push("Pickup date and time is required".to_string());
            None
        } else {
            match parse_pickup_time(pickup) {
                Some(at) if at > now => Some(at),
                Some(_) => {
                    errors.push("Pickup date and time must be in the future".to_string());
                    None
                }
                None => {
                    errors.push("Pickup date and time is invalid".to_string());
                    None
                }
            }
        };

        if !(MIN_PASSENGERS..=MAX_PASSENGERS).contains(&self.passengers) {
            errors.push(format!(
                "Passengers must be between {} and {}",
                MIN_PASSENGERS, MAX_PASSENGERS
            ));
        }

        if let Some(fare) = self.fare {
            if !fare.is_finite() || fare < 0.0 {
                errors.push("Fare must be a non-negative amount".to_string());
            }
        }

        match pickup_date_time {
            Some(at) if errors.is_empty() => Ok(NewBooking {
                name,
                email,
                phone,
                pickup_location,
                dropoff_location,
                pickup_date_time: format_timestamp(at),
                passengers: self.passengers,
                fare: self.fare,
                flight_number: optional_trimmed(&self.flight_number),
                notes: optional_trimmed(&self.notes),
            }),
            _ => Err(errors),
        }
    }
}

/// Parse a pickup time from RFC 3339 or an HTML `datetime-local` value (taken as UTC).
pub fn parse_pickup_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Canonical timestamp format used for every stored time.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn required(value: &str, message: &str, errors: &mut Vec<String>) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(message.to_string());
    }
    trimmed.to_string()
}

fn optional_trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Admin status change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Admin driver assignment; `null` unassigns.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDriverRequest {
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Admin edit of the non-lifecycle booking details.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    #[serde(default)]
    pub fare: Option<f64>,
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Customer self-service cancellation; the email must match the booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    pub email: String,
}

/// Public status snapshot, also the polling payload of the status sync client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingStatusView {
    pub booking_id: String,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub updated_at: String,
}

impl From<&Booking> for BookingStatusView {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id.clone(),
            status: booking.status,
            driver_id: booking.driver_id.clone(),
            updated_at: booking.updated_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn valid_request() -> CreateBookingRequest {
        CreateBookingRequest {
            name: "Jane Traveler".to_string(),
            email: "jane@example.com".to_string(),
            phone: "+1 555 0100".to_string(),
            pickup_location: "12 Harbor Rd".to_string(),
            dropoff_location: "Terminal B".to_string(),
            pickup_date_time: "2026-10-20T06:30:00Z".to_string(),
            passengers: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_booking_is_normalized() {
        let mut request = valid_request();
        request.name = "  Jane Traveler ".to_string();
        request.pickup_date_time = "2026-10-20T08:30:00+02:00".to_string();
        request.flight_number = Some("  ".to_string());

        let booking = request.validate(now()).unwrap();
        assert_eq!(booking.name, "Jane Traveler");
        assert_eq!(booking.pickup_date_time, "2026-10-20T06:30:00Z");
        assert_eq!(booking.flight_number, None);
    }

    #[test]
    fn test_empty_booking_reports_every_error() {
        let errors = CreateBookingRequest::default().validate(now()).unwrap_err();

        for expected in [
            "Name is required",
            "Email is required",
            "Phone is required",
            "Pickup location is required",
            "Dropoff location is required",
            "Pickup date and time is required",
            "Passengers must be between 1 and 10",
        ] {
            assert!(errors.contains(&expected.to_string()), "missing {expected}");
        }
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn test_past_pickup_rejected() {
        let mut request = valid_request();
        request.pickup_date_time = format_timestamp(now() - Duration::hours(1));

        let errors = request.validate(now()).unwrap_err();
        assert_eq!(errors, vec!["Pickup date and time must be in the future"]);
    }

    #[test]
    fn test_pickup_at_now_rejected() {
        let mut request = valid_request();
        request.pickup_date_time = format_timestamp(now());
        assert!(request.validate(now()).is_err());
    }

    #[test]
    fn test_passenger_bounds() {
        for (passengers, ok) in [(0, false), (1, true), (10, true), (11, false), (-3, false)] {
            let mut request = valid_request();
            request.passengers = passengers;
            assert_eq!(request.validate(now()).is_ok(), ok, "passengers = {passengers}");
        }
    }

    #[test]
    fn test_datetime_local_input_accepted() {
        let mut request = valid_request();
        request.pickup_date_time = "2026-10-19T05:15".to_string();

        let booking = request.validate(now()).unwrap();
        assert_eq!(booking.pickup_date_time, "2026-10-19T05:15:00Z");
    }

    #[test]
    fn test_garbage_date_and_bad_email_both_reported() {
        let mut request = valid_request();
        request.pickup_date_time = "next tuesday".to_string();
        request.email = "jane.example.com".to_string();

        let errors = request.validate(now()).unwrap_err();
        assert!(errors.contains(&"Pickup date and time is invalid".to_string()));
        assert!(errors.contains(&"Email is invalid".to_string()));
    }

    #[test]
    fn test_status_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&BookingStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_fare_cents_rounds() {
        let booking = Booking {
            id: "b1".to_string(),
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            pickup_location: String::new(),
            dropoff_location: String::new(),
            pickup_date_time: String::new(),
            passengers: 1,
            fare: Some(19.99),
            flight_number: None,
            notes: None,
            status: BookingStatus::Pending,
            driver_id: None,
            payment_status: PaymentStatus::Unpaid,
            payment_link_url: None,
            payment_order_id: None,
            payment_id: None,
            created_at: String::new(),
            updated_at: String::new(),
            version: 1,
        };
        assert_eq!(booking.fare_cents(), Some(1999));
    }
}
