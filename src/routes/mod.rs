//! Route definitions for the adrules API.

pub mod advertisers;
pub mod dashboard;
pub mod health;
pub mod matrix;
pub mod sites;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::AppState;

/// Versioned API routes, mounted under `/api/v1`.
pub fn api_router() -> Router<AppState> {
    let advertiser_routes = Router::new()
        .route("/advertisers", get(advertisers::list))
        .route("/advertisers/ids", get(advertisers::ids))
        .route("/advertisers/categories", get(advertisers::categories))
        .route("/advertisers/bulk-rules", post(advertisers::bulk_rules))
        .route("/advertisers/bulk-weight", post(advertisers::bulk_weight))
        .route(
            "/advertisers/{id}/rules/{site_id}",
            patch(advertisers::update_rule),
        )
        .route("/advertisers/{id}/weight", patch(advertisers::update_weight));

    Router::new()
        .merge(advertiser_routes)
        .route("/sites", get(sites::list))
        .route("/matrix/snapshot", post(matrix::snapshot))
        .route("/dashboard/stats", get(dashboard::stats))
}

/// Liveness and readiness probes, mounted at the root.
pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
}

/// Full application router with state attached; layers are added by the caller.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_router())
        .merge(health_router())
        .with_state(state)
}
