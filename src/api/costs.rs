//! Cost tracking API endpoints.

use axum::extract::{Path, State};

use super::{success, ApiJson, ApiQuery, ApiResult};
use crate::errors::AppError;
use crate::models::{aggregate_costs, CostRange, CostRecord, CostSummary, CreateCostRequest};
use crate::AppState;

/// GET /api/admin/costs - List costs in an optional `incurredAt` range.
pub async fn list_costs(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<CostRange>,
) -> ApiResult<Vec<CostRecord>> {
    success(state.repo.list_costs(&range).await?)
}

/// GET /api/admin/costs/summary - Totals over the same range.
pub async fn cost_summary(
    State(state): State<AppState>,
    ApiQuery(range): ApiQuery<CostRange>,
) -> ApiResult<CostSummary> {
    let records = state.repo.list_costs(&range).await?;
    success(aggregate_costs(&records))
}

/// POST /api/admin/costs - Record a cost.
pub async fn create_cost(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateCostRequest>,
) -> ApiResult<CostRecord> {
    let mut errors = Vec::new();
    if request.category.trim().is_empty() {
        errors.push("Category is required".to_string());
    }
    if request.provider.trim().is_empty() {
        errors.push("Provider is required".to_string());
    }
    if !request.amount.is_finite() {
        errors.push("Amount must be a number".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    success(state.repo.create_cost(&request).await?)
}

/// DELETE /api/admin/costs/{id} - Delete a cost record.
pub async fn delete_cost(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.repo.delete_cost(&id).await?;
    success(())
}
