//! Site routes: the active matrix columns.

use axum::{extract::State, Json};

use crate::errors::{ApiResponse, AppError};
use crate::models::site::Site;
use crate::services::site as site_service;
use crate::AppState;

/// GET /api/v1/sites -- active sites ordered by name.
pub async fn list(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Site>>>, AppError> {
    let sites = site_service::list_active(&state.db).await?;
    Ok(ApiResponse::success(sites))
}
