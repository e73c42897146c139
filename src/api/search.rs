//! Booking search API endpoint.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::{success, ApiQuery, ApiResult};
use crate::errors::AppError;
use crate::models::Booking;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    #[serde(default)]
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub booking: Booking,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// Deepest page offset served; the collector holds `limit + offset` hits.
const MAX_SEARCH_OFFSET: usize = 10_000;

/// GET /api/admin/bookings/search - Find bookings by name, email, phone, address or flight.
pub async fn search_bookings(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> ApiResult<SearchResponse> {
    if params.offset > MAX_SEARCH_OFFSET {
        return Err(AppError::validation(format!(
            "Offset must be at most {}",
            MAX_SEARCH_OFFSET
        )));
    }
    let limit = params.limit.min(MAX_SEARCH_LIMIT);
    let hits = state.search.search(&params.q, limit, params.offset)?;

    // Hits whose booking has since vanished are skipped.
    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        if let Some(booking) = state.repo.get_booking(&hit.booking_id).await? {
            results.push(SearchResultItem {
                booking,
                score: hit.score,
            });
        }
    }

    let total = results.len();
    success(SearchResponse {
        results,
        total,
        limit,
        offset: params.offset,
    })
}
