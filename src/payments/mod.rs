//! Square payments: payment links, refunds and webhook handling.

mod square;

pub use square::*;

use serde::Deserialize;

/// Envelope of a Square webhook notification.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub object: Option<WebhookObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
    #[serde(default)]
    pub payment: Option<WebhookPayment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayment {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub status: String,
}

impl WebhookEvent {
    /// The payment this event reports as completed, if any.
    pub fn completed_payment(&self) -> Option<&WebhookPayment> {
        if !matches!(self.event_type.as_str(), "payment.created" | "payment.updated") {
            return None;
        }
        self.data
            .as_ref()?
            .object
            .as_ref()?
            .payment
            .as_ref()
            .filter(|payment| payment.status == "COMPLETED")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str, status: &str) -> WebhookEvent {
        serde_json::from_value(serde_json::json!({
            "merchant_id": "M1",
            "type": event_type,
            "event_id": "e1",
            "data": {
                "type": "payment",
                "id": "p1",
                "object": {
                    "payment": { "id": "p1", "order_id": "o1", "status": status }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_completed_payment_events() {
        let completed = event("payment.updated", "COMPLETED");
        let payment = completed.completed_payment().unwrap();
        assert_eq!(payment.id, "p1");
        assert_eq!(payment.order_id.as_deref(), Some("o1"));

        assert!(event("payment.created", "COMPLETED").completed_payment().is_some());
        assert!(event("payment.updated", "APPROVED").completed_payment().is_none());
        assert!(event("refund.updated", "COMPLETED").completed_payment().is_none());
    }

    #[test]
    fn test_event_without_payment_object() {
        let event: WebhookEvent =
            serde_json::from_str(r#"{"type": "payment.updated", "data": {}}"#).unwrap();
        assert!(event.completed_payment().is_none());
    }
}
