//! User and session API endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;

use super::{success, ApiJson, ApiResult};
use crate::auth::bearer_token;
use crate::errors::AppError;
use crate::models::{CreateSessionRequest, CreateUserRequest, Session, UpdateRoleRequest, User};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRevoked {
    pub revoked: bool,
}

/// GET /api/admin/users - List users.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    success(state.repo.list_users().await?)
}

/// POST /api/admin/users - Create a user.
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> ApiResult<User> {
    let email = request.email.trim();
    if !email.is_empty() && !email.contains('@') {
        return Err(AppError::validation("Email is invalid"));
    }

    let user = state.repo.create_user(&request).await?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created");
    success(user)
}

/// PUT /api/admin/users/{id}/role - Change a user's role.
pub async fn update_user_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateRoleRequest>,
) -> ApiResult<User> {
    let user = state.repo.update_user_role(&id, request.role).await?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User role changed");
    success(user)
}

/// POST /api/admin/sessions - Issue a session token for a user.
pub async fn create_session(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateSessionRequest>,
) -> ApiResult<Session> {
    let session = state
        .repo
        .create_session(&request.user_id, state.config.session_ttl)
        .await?;

    tracing::info!(user_id = %session.user_id, expires_at = %session.expires_at, "Session issued");
    success(session)
}

/// GET /api/session - Validate the caller's bearer session.
pub async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Session> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing session token".to_string()))?;

    match state.repo.get_active_session(token).await? {
        Some(session) => success(session),
        None => Err(AppError::Unauthorized(
            "Invalid or expired session".to_string(),
        )),
    }
}

/// DELETE /api/session - Revoke the caller's bearer session.
pub async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SessionRevoked> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing session token".to_string()))?;

    let revoked = state.repo.delete_session(token).await?;
    success(SessionRevoked { revoked })
}
