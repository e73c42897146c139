//! QA comment API endpoints.

use axum::{
    extract::{Path, State},
    Extension,
};

use super::{success, ApiJson, ApiQuery, ApiResult};
use crate::auth::Principal;
use crate::errors::AppError;
use crate::models::{CommentQuery, CommentRecord, CreateCommentRequest, UpdateCommentRequest};
use crate::AppState;

/// GET /api/admin/comments - List comments, filtered by page and status.
pub async fn list_comments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CommentQuery>,
) -> ApiResult<Vec<CommentRecord>> {
    success(state.repo.list_comments(&query).await?)
}

/// GET /api/admin/comments/{id} - Get a single comment.
pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CommentRecord> {
    match state.repo.get_comment(&id).await? {
        Some(comment) => success(comment),
        None => Err(AppError::NotFound(format!("Comment {} not found", id))),
    }
}

/// POST /api/admin/comments - Annotate a page element.
///
/// Session callers are recorded as the author; `createdBy` only counts for API-key calls.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(mut request): ApiJson<CreateCommentRequest>,
) -> ApiResult<CommentRecord> {
    if let Some(actor) = principal.actor() {
        request.created_by = actor;
    }

    let mut errors = Vec::new();
    if request.page_url.trim().is_empty() {
        errors.push("Page URL is required".to_string());
    }
    if request.element_selector.trim().is_empty() {
        errors.push("Element selector is required".to_string());
    }
    if request.comment.trim().is_empty() {
        errors.push("Comment is required".to_string());
    }
    if request.created_by.trim().is_empty() {
        errors.push("Author is required".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    success(state.repo.create_comment(&request).await?)
}

/// PATCH /api/admin/comments/{id} - Edit text or move status.
pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateCommentRequest>,
) -> ApiResult<CommentRecord> {
    if matches!(&request.comment, Some(comment) if comment.trim().is_empty()) {
        return Err(AppError::validation("Comment cannot be empty"));
    }

    success(state.repo.update_comment(&id, &request).await?)
}

/// DELETE /api/admin/comments/{id} - Delete a comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_comment(&id).await?;
    success(())
}
