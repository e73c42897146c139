//! Configuration module for the car-service backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! Square and Twilio are optional; each is enabled only when its credentials are present.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::errors::AppError;

/// Square API base URLs.
const SQUARE_SANDBOX_URL: &str = "https://connect.squareupsandbox.com";
const SQUARE_PRODUCTION_URL: &str = "https://connect.squareup.com";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for the admin API (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Lifetime of an issued session
    pub session_ttl: Duration,
    /// Square payments, when configured
    pub square: Option<SquareConfig>,
    /// Twilio SMS, when configured
    pub twilio: Option<TwilioConfig>,
}

/// Square credentials and webhook settings.
#[derive(Debug, Clone)]
pub struct SquareConfig {
    pub access_token: SecretString,
    pub location_id: String,
    pub base_url: String,
    /// Key used to verify `x-square-hmacsha256-signature`
    pub webhook_signature_key: Option<SecretString>,
    /// Public URL Square posts webhooks to; part of the signed payload
    pub webhook_url: Option<String>,
}

/// Twilio credentials.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = non_empty_var("CARSVC_API_PSK");

        let db_path = env::var("CARSVC_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let index_path = env::var("CARSVC_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("CARSVC_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid CARSVC_BIND_ADDR: {}", e)))?;

        let log_level = env::var("CARSVC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let session_ttl_secs: u64 = match non_empty_var("CARSVC_SESSION_TTL_SECS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!("Invalid CARSVC_SESSION_TTL_SECS: {}", e))
            })?,
            None => 86_400,
        };

        Ok(Self {
            api_psk,
            db_path,
            index_path,
            bind_addr,
            log_level,
            session_ttl: Duration::from_secs(session_ttl_secs),
            square: SquareConfig::from_env()?,
            twilio: TwilioConfig::from_env(),
        })
    }
}

impl SquareConfig {
    fn from_env() -> Result<Option<Self>, AppError> {
        let (Some(token), Some(location_id)) = (
            non_empty_var("SQUARE_ACCESS_TOKEN"),
            non_empty_var("SQUARE_LOCATION_ID"),
        ) else {
            return Ok(None);
        };

        let base_url = match non_empty_var("SQUARE_ENVIRONMENT").as_deref() {
            None | Some("sandbox") => SQUARE_SANDBOX_URL.to_string(),
            Some("production") => SQUARE_PRODUCTION_URL.to_string(),
            Some(other) => {
                return Err(AppError::Config(format!(
                    "Invalid SQUARE_ENVIRONMENT: {} (expected sandbox or production)",
                    other
                )))
            }
        };

        Ok(Some(Self {
            access_token: SecretString::from(token),
            location_id,
            base_url,
            webhook_signature_key: non_empty_var("SQUARE_WEBHOOK_SIGNATURE_KEY")
                .map(SecretString::from),
            webhook_url: non_empty_var("SQUARE_WEBHOOK_URL"),
        }))
    }
}

impl TwilioConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            account_sid: non_empty_var("TWILIO_ACCOUNT_SID")?,
            auth_token: SecretString::from(non_empty_var("TWILIO_AUTH_TOKEN")?),
            from_number: non_empty_var("TWILIO_FROM_NUMBER")?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
