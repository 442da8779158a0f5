//! Matrix state routes.

use axum::{extract::State, Json};

use crate::errors::{ApiResponse, AppError};
use crate::middleware::validation::ValidatedJson;
use crate::models::matrix::{MatrixSnapshot, SnapshotRequest};
use crate::services::catalog;
use crate::AppState;

/// POST /api/v1/matrix/snapshot -- stored weights and active-site rules for an id set.
pub async fn snapshot(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<SnapshotRequest>,
) -> Result<Json<ApiResponse<MatrixSnapshot>>, AppError> {
    let snapshot = catalog::snapshot(&state.db, &body.ids).await?;
    Ok(ApiResponse::success(snapshot))
}
