//! Site lookups: the matrix columns.

use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::site::{Site, SiteId};

/// Active sites ordered by name.
pub async fn list_active(pool: &PgPool) -> Result<Vec<Site>, AppError> {
    let sites = sqlx::query_as::<_, Site>(
        "SELECT id, name, domain, wordpress_url, is_active, created_at, updated_at \
         FROM sites WHERE is_active ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(sites)
}

/// Whether a site with this id exists, active or not.
pub async fn exists(pool: &PgPool, id: SiteId) -> Result<bool, AppError> {
    let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM sites WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(found)
}
