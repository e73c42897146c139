//! CMS API endpoints.

use axum::{extract::State, Extension};
use serde_json::Value;

use super::{success, ApiJson, ApiQuery, ApiResult};
use crate::auth::Principal;
use crate::models::{
    lookup_cms_field, CmsConfiguration, CmsFieldQuery, CmsFieldValue, ReplaceCmsRequest,
    UpdateCmsFieldRequest,
};
use crate::AppState;

/// GET /api/cms - The whole CMS document.
pub async fn get_cms(State(state): State<AppState>) -> ApiResult<CmsConfiguration> {
    success(state.repo.get_cms().await?)
}

/// GET /api/cms/field - One field, or the caller's default.
pub async fn get_cms_field(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CmsFieldQuery>,
) -> ApiResult<CmsFieldValue> {
    let cms = state.repo.get_cms().await?;

    let field = match lookup_cms_field(&cms.data, &query.path) {
        Some(value) => CmsFieldValue {
            path: query.path,
            value: value.clone(),
            is_default: false,
        },
        None => CmsFieldValue {
            path: query.path,
            value: query.default.map(Value::String).unwrap_or(Value::Null),
            is_default: true,
        },
    };

    success(field)
}

/// PUT /api/admin/cms - Replace the document.
pub async fn replace_cms(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(request): ApiJson<ReplaceCmsRequest>,
) -> ApiResult<CmsConfiguration> {
    let updated_by = principal.actor().or(request.updated_by);
    let cms = state
        .repo
        .replace_cms(&request.data, updated_by.as_deref(), request.expected_version)
        .await?;

    tracing::info!(version = cms.version, updated_by = ?cms.updated_by, "CMS replaced");
    success(cms)
}

/// PATCH /api/admin/cms/field - Set one field.
pub async fn update_cms_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(request): ApiJson<UpdateCmsFieldRequest>,
) -> ApiResult<CmsConfiguration> {
    let updated_by = principal.actor().or(request.updated_by);
    let cms = state
        .repo
        .update_cms_field(
            &request.path,
            request.value,
            updated_by.as_deref(),
            request.expected_version,
        )
        .await?;

    tracing::info!(path = %request.path, version = cms.version, "CMS field updated");
    success(cms)
}
