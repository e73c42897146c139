//! Square REST API v2 client.

use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, error, instrument};

use crate::auth::constant_time_compare;
use crate::config::SquareConfig;
use crate::errors::AppError;
use crate::models::Booking;

/// API version pinned on every request.
const SQUARE_VERSION: &str = "2024-07-17";

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-square-hmacsha256-signature";

const CURRENCY: &str = "USD";

/// A hosted checkout link for one booking.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
    pub order_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: String,
}

#[derive(Serialize)]
struct Money {
    amount: i64,
    currency: &'static str,
}

#[derive(Deserialize)]
struct SquareErrorBody {
    #[serde(default)]
    errors: Vec<SquareApiError>,
}

#[derive(Deserialize)]
struct SquareApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    detail: Option<String>,
}

/// Square API client.
#[derive(Clone)]
pub struct SquareClient {
    client: Client,
    access_token: SecretString,
    location_id: String,
    base_url: String,
    webhook_signature_key: Option<SecretString>,
    webhook_url: Option<String>,
}

impl std::fmt::Debug for SquareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SquareClient")
            .field("access_token", &"[REDACTED]")
            .field("location_id", &self.location_id)
            .field("base_url", &self.base_url)
            .field("webhook_url", &self.webhook_url)
            .finish_non_exhaustive()
    }
}

impl SquareClient {
    #[must_use]
    pub fn new(config: &SquareConfig) -> Self {
        Self {
            client: Client::new(),
            access_token: config.access_token.clone(),
            location_id: config.location_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            webhook_signature_key: config.webhook_signature_key.clone(),
            webhook_url: config.webhook_url.clone(),
        }
    }

    /// Create a quick-pay link for the booking's fare.
    #[instrument(skip(self, booking), fields(booking_id = %booking.id))]
    pub async fn create_payment_link(&self, booking: &Booking) -> Result<PaymentLink, AppError> {
        #[derive(Serialize)]
        struct QuickPay<'a> {
            name: String,
            price_money: Money,
            location_id: &'a str,
        }

        #[derive(Serialize)]
        struct CreatePaymentLink<'a> {
            idempotency_key: String,
            quick_pay: QuickPay<'a>,
            payment_note: String,
        }

        #[derive(Deserialize)]
        struct CreatePaymentLinkResponse {
            payment_link: PaymentLink,
        }

        let amount = booking
            .fare_cents()
            .filter(|cents| *cents > 0)
            .ok_or_else(|| AppError::validation("Booking has no fare to charge"))?;

        let request = CreatePaymentLink {
            idempotency_key: uuid::Uuid::new_v4().to_string(),
            quick_pay: QuickPay {
                name: format!(
                    "Ride {} to {}",
                    booking.pickup_location, booking.dropoff_location
                ),
                price_money: Money {
                    amount,
                    currency: CURRENCY,
                },
                location_id: &self.location_id,
            },
            payment_note: format!("Booking {}", booking.id),
        };

        let response: CreatePaymentLinkResponse = self
            .post("/v2/online-checkout/payment-links", &request)
            .await?;

        debug!(link_id = %response.payment_link.id, "Payment link created");
        Ok(response.payment_link)
    }

    /// Refund `amount_cents` of a completed payment.
    #[instrument(skip(self))]
    pub async fn refund_payment(
        &self,
        payment_id: &str,
        amount_cents: i64,
    ) -> Result<Refund, AppError> {
        #[derive(Serialize)]
        struct RefundPayment<'a> {
            idempotency_key: String,
            payment_id: &'a str,
            amount_money: Money,
            reason: &'static str,
        }

        #[derive(Deserialize)]
        struct RefundPaymentResponse {
            refund: Refund,
        }

        let request = RefundPayment {
            idempotency_key: uuid::Uuid::new_v4().to_string(),
            payment_id,
            amount_money: Money {
                amount: amount_cents,
                currency: CURRENCY,
            },
            reason: "Booking refund",
        };

        let response: RefundPaymentResponse = self.post("/v2/refunds", &request).await?;

        debug!(refund_id = %response.refund.id, status = %response.refund.status, "Refund requested");
        Ok(response.refund)
    }

    /// Verify a webhook notification.
    ///
    /// Square signs the notification URL followed by the raw body with the
    /// subscription's signature key (HMAC-SHA256, base64).
    pub fn verify_webhook_signature(&self, body: &str, signature: &str) -> Result<(), AppError> {
        let (Some(key), Some(url)) = (&self.webhook_signature_key, &self.webhook_url) else {
            return Err(AppError::Unavailable(
                "Square webhook verification is not configured".to_string(),
            ));
        };

        let expected = sign_webhook(key.expose_secret(), url, body)?;
        if !constant_time_compare(&expected, signature.trim()) {
            return Err(AppError::Unauthorized(
                "Invalid webhook signature".to_string(),
            ));
        }

        debug!("Square webhook signature verified");
        Ok(())
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, AppError>
    where
        B: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(self.access_token.expose_secret())
            .header("Square-Version", SQUARE_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Square request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body: SquareErrorBody = response
                .json()
                .await
                .unwrap_or(SquareErrorBody { errors: Vec::new() });
            let detail = body
                .errors
                .into_iter()
                .map(|e| match e.detail {
                    Some(detail) => format!("{}: {}", e.code, detail),
                    None => e.code,
                })
                .collect::<Vec<_>>()
                .join("; ");
            error!(status = %status, detail = %detail, "Square API error");
            return Err(AppError::Payment(format!(
                "Square returned {}: {}",
                status, detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("Invalid Square response: {}", e)))
    }
}

/// Signature Square sends for `body` delivered to `url`.
pub fn sign_webhook(key: &str, url: &str, body: &str) -> Result<String, AppError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook signature key: {}", e)))?;
    mac.update(url.as_bytes());
    mac.update(body.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}
