//! Advertiser catalog routes: grid listing, id resolution, and rule/weight writes.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::{ApiResponse, AppError};
use crate::middleware::validation::{ApiQuery, ValidatedJson};
use crate::models::advertiser::AdvertiserId;
use crate::models::bulk::{
    BulkCount, BulkRuleRequest, BulkWeightRequest, SetRuleRequest, SetWeightRequest, WeightUpdated,
};
use crate::models::filter::{AdvertiserFilters, SortParams};
use crate::models::matrix::AdvertiserPage;
use crate::models::pagination::Pagination;
use crate::models::rule::SiteAdvertiserRule;
use crate::models::site::SiteId;
use crate::services::{bulk as bulk_service, catalog};
use crate::AppState;

/// GET /api/v1/advertisers -- filtered, sorted page of the rule matrix.
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<AdvertiserFilters>,
    ApiQuery(sort): ApiQuery<SortParams>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> Result<Json<ApiResponse<AdvertiserPage>>, AppError> {
    let page = catalog::query(&state.db, &filters, &sort, &pagination).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/v1/advertisers/ids -- every id matching the filters, ignoring paging.
pub async fn ids(
    State(state): State<AppState>,
    ApiQuery(filters): ApiQuery<AdvertiserFilters>,
) -> Result<Json<ApiResponse<Vec<AdvertiserId>>>, AppError> {
    let ids = catalog::resolve_ids(&state.db, &filters).await?;
    Ok(ApiResponse::success(ids))
}

/// GET /api/v1/advertisers/categories -- distinct categories for the filter bar.
pub async fn categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let categories = catalog::distinct_categories(&state.db).await?;
    Ok(ApiResponse::success(categories))
}

/// POST /api/v1/advertisers/bulk-rules -- set one site rule for many advertisers.
pub async fn bulk_rules(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<BulkRuleRequest>,
) -> Result<Json<ApiResponse<BulkCount>>, AppError> {
    let result = bulk_service::bulk_set_rule(&state.db, &body).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/advertisers/bulk-weight -- set or clear the weight of many advertisers.
pub async fn bulk_weight(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<BulkWeightRequest>,
) -> Result<Json<ApiResponse<BulkCount>>, AppError> {
    let result = bulk_service::bulk_set_weight(&state.db, &body).await?;
    Ok(ApiResponse::success(result))
}

/// PATCH /api/v1/advertisers/{id}/rules/{site_id} -- set a single matrix cell.
pub async fn update_rule(
    State(state): State<AppState>,
    Path((id, site_id)): Path<(AdvertiserId, SiteId)>,
    ValidatedJson(body): ValidatedJson<SetRuleRequest>,
) -> Result<Json<ApiResponse<SiteAdvertiserRule>>, AppError> {
    let rule =
        bulk_service::set_rule(&state.db, id, site_id, body.rule, body.reason.as_deref()).await?;
    Ok(ApiResponse::success(rule))
}

/// PATCH /api/v1/advertisers/{id}/weight -- set or clear one advertiser's weight.
pub async fn update_weight(
    State(state): State<AppState>,
    Path(id): Path<AdvertiserId>,
    ValidatedJson(body): ValidatedJson<SetWeightRequest>,
) -> Result<Json<ApiResponse<WeightUpdated>>, AppError> {
    let updated = bulk_service::set_weight(&state.db, id, body.weight).await?;
    Ok(ApiResponse::success(updated))
}
