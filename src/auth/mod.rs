//! Admin API authentication.
//!
//! A request is let through either with the pre-shared key (`x-api-key` or
//! `Authorization: Bearer <psk>`) or with a bearer session token whose role grants
//! the route's access level. PSK comparison is constant-time.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::models::{Access, Session};
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Who a request was authorized as; stored in request extensions.
#[derive(Debug, Clone)]
pub enum Principal {
    /// Holder of the pre-shared key
    ApiKey,
    /// No key configured; the admin API is open
    Open,
    Session(Session),
}

impl Principal {
    /// Name recorded as the author of admin edits.
    pub fn actor(&self) -> Option<String> {
        match self {
            Principal::Session(session) => Some(session.email.clone()),
            Principal::ApiKey | Principal::Open => None,
        }
    }
}

pub async fn require_read(state: State<AppState>, request: Request, next: Next) -> Response {
    require_access(state, Access::Read, request, next).await
}

pub async fn require_edit(state: State<AppState>, request: Request, next: Next) -> Response {
    require_access(state, Access::Edit, request, next).await
}

pub async fn require_admin(state: State<AppState>, request: Request, next: Next) -> Response {
    require_access(state, Access::Admin, request, next).await
}

async fn require_access(
    State(state): State<AppState>,
    access: Access,
    mut request: Request,
    next: Next,
) -> Response {
    match authorize(&state, request.headers(), access).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Resolve the caller of an admin request and check it against `access`.
pub async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    access: Access,
) -> Result<Principal, AppError> {
    let expected_psk = state.config.api_psk.as_deref();

    if let Some(provided) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return match expected_psk {
            None => Ok(Principal::Open),
            Some(expected) if constant_time_compare(provided, expected) => Ok(Principal::ApiKey),
            Some(_) => Err(AppError::Unauthorized("Invalid API key".to_string())),
        };
    }

    if let Some(token) = bearer_token(headers) {
        if let Some(expected) = expected_psk {
            if constant_time_compare(token, expected) {
                return Ok(Principal::ApiKey);
            }
        }

        let session = state
            .repo
            .get_active_session(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        if !session.role.permits(access) {
            tracing::debug!(
                user_id = %session.user_id,
                role = session.role.as_str(),
                "Session lacks {:?} access",
                access
            );
            return Err(AppError::Forbidden(format!(
                "Role {} does not have {} access",
                session.role.as_str(),
                access_name(access)
            )));
        }
        return Ok(Principal::Session(session));
    }

    match expected_psk {
        None => Ok(Principal::Open),
        Some(_) => Err(AppError::Unauthorized(
            "Missing API key or session token".to_string(),
        )),
    }
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn access_name(access: Access) -> &'static str {
    match access {
        Access::Read => "read",
        Access::Edit => "edit",
        Access::Admin => "admin",
    }
}

/// Perform constant-time string comparison.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    a_bytes.ct_eq(b_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "not-empty"));
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
