//! Dashboard statistics aggregation queries.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::advertiser::Network;

/// Aggregated counts for the overview page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub active_advertisers: i64,
    /// Rule rows explicitly stored as `default`. Absent rows are not counted.
    pub pending_rules: i64,
    pub unassigned_weights: i64,
    pub active_sites: i64,
    pub advertisers_by_network: Vec<NetworkCount>,
}

/// Active advertiser count for one network.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NetworkCount {
    pub network: Network,
    pub count: i64,
}

/// Fetch all dashboard statistics in parallel queries.
pub async fn get_stats(pool: &PgPool) -> Result<DashboardStats, AppError> {
    let (
        active_advertisers,
        pending_rules,
        unassigned_weights,
        active_sites,
        advertisers_by_network,
    ) = tokio::try_join!(
        count(pool, "SELECT COUNT(*) FROM advertisers WHERE is_active"),
        count(pool, "SELECT COUNT(*) FROM site_advertiser_rules WHERE rule = 'default'"),
        count(
            pool,
            "SELECT COUNT(*) FROM advertisers WHERE is_active AND default_weight IS NULL"
        ),
        count(pool, "SELECT COUNT(*) FROM sites WHERE is_active"),
        fetch_by_network(pool),
    )?;

    Ok(DashboardStats {
        active_advertisers,
        pending_rules,
        unassigned_weights,
        active_sites,
        advertisers_by_network,
    })
}

async fn count(pool: &PgPool, sql: &'static str) -> Result<i64, AppError> {
    let n = sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await?;
    Ok(n)
}

/// Active advertisers grouped by network, in network order.
async fn fetch_by_network(pool: &PgPool) -> Result<Vec<NetworkCount>, AppError> {
    let rows = sqlx::query_as::<_, NetworkCount>(
        "SELECT network, COUNT(*) AS count FROM advertisers \
         WHERE is_active GROUP BY network ORDER BY network",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
