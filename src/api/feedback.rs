//! Feedback API endpoints.

use axum::extract::{Path, State};
use serde::Serialize;

use super::{success, ApiJson, ApiResult};
use crate::errors::AppError;
use crate::models::{
    ApproveFeedbackRequest, CreateFeedbackRequest, Feedback, FeedbackSummary, PublicReview,
};
use crate::AppState;

/// Approved reviews with their summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFeedback {
    pub summary: FeedbackSummary,
    pub reviews: Vec<PublicReview>,
}

/// POST /api/feedback - Submit a review.
pub async fn submit_feedback(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateFeedbackRequest>,
) -> ApiResult<Feedback> {
    request.validate().map_err(AppError::Validation)?;

    if let Some(booking_id) = request.booking_id.as_deref() {
        state.repo.require_booking(booking_id).await?;
    }

    let feedback = state.repo.create_feedback(&request).await?;
    tracing::info!(feedback_id = %feedback.id, rating = feedback.rating, "Feedback submitted");
    success(feedback)
}

/// GET /api/feedback - Approved reviews only.
pub async fn list_public_feedback(State(state): State<AppState>) -> ApiResult<PublicFeedback> {
    let reviews = state.repo.list_feedback(true).await?;
    success(PublicFeedback {
        summary: FeedbackSummary::from_feedback(&reviews),
        reviews: reviews.into_iter().map(PublicReview::from).collect(),
    })
}

/// GET /api/admin/feedback - Every review, approved or not.
pub async fn list_all_feedback(State(state): State<AppState>) -> ApiResult<Vec<Feedback>> {
    success(state.repo.list_feedback(false).await?)
}

/// PUT /api/admin/feedback/{id}/approval - Approve or hide a review.
pub async fn set_feedback_approval(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ApproveFeedbackRequest>,
) -> ApiResult<Feedback> {
    success(
        state
            .repo
            .set_feedback_approval(&id, request.approved)
            .await?,
    )
}

/// DELETE /api/admin/feedback/{id} - Delete a review.
pub async fn delete_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_feedback(&id).await?;
    success(())
}
