//! Rule store: per-(site, advertiser) rule rows and the advertiser weight column.
//!
//! Every write is a single statement keyed on the unique pair (or id), so
//! concurrent writers resolve last-write-wins without explicit locking.

use std::collections::{BTreeMap, HashMap};

use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::advertiser::{AdvertiserId, Weight};
use crate::models::rule::{RuleValue, SiteAdvertiserRule};
use crate::models::site::SiteId;

const RULE_COLUMNS: &str = "id, site_id, advertiser_id, rule, reason, created_at, updated_at";

/// Stored rules on active sites for the given advertisers, keyed by advertiser then site.
pub async fn active_rules_for(
    pool: &PgPool,
    advertiser_ids: &[AdvertiserId],
) -> Result<HashMap<AdvertiserId, BTreeMap<SiteId, RuleValue>>, AppError> {
    if advertiser_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (AdvertiserId, SiteId, RuleValue)>(
        "SELECT r.advertiser_id, r.site_id, r.rule \
         FROM site_advertiser_rules r JOIN sites s ON s.id = r.site_id \
         WHERE s.is_active AND r.advertiser_id = ANY($1)",
    )
    .bind(advertiser_ids)
    .fetch_all(pool)
    .await?;

    let mut by_advertiser: HashMap<AdvertiserId, BTreeMap<SiteId, RuleValue>> = HashMap::new();
    for (advertiser_id, site_id, rule) in rows {
        by_advertiser
            .entry(advertiser_id)
            .or_default()
            .insert(site_id, rule);
    }
    Ok(by_advertiser)
}

/// Upsert `rule` (and `reason`) for every advertiser on one site in a single statement.
///
/// Returns the number of rows inserted or updated.
pub async fn upsert_rules(
    pool: &PgPool,
    site_id: SiteId,
    advertiser_ids: &[AdvertiserId],
    rule: RuleValue,
    reason: Option<&str>,
) -> Result<u64, AppError> {
    if advertiser_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "INSERT INTO site_advertiser_rules (site_id, advertiser_id, rule, reason) \
         SELECT $1, t.id, $3, $4 FROM UNNEST($2::BIGINT[]) AS t(id) \
         ON CONFLICT (site_id, advertiser_id) DO UPDATE \
         SET rule = EXCLUDED.rule, reason = EXCLUDED.reason, updated_at = NOW()",
    )
    .bind(site_id)
    .bind(advertiser_ids)
    .bind(rule)
    .bind(reason)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Upsert one cell and return the stored row.
pub async fn upsert_rule(
    pool: &PgPool,
    site_id: SiteId,
    advertiser_id: AdvertiserId,
    rule: RuleValue,
    reason: Option<&str>,
) -> Result<SiteAdvertiserRule, AppError> {
    let row = sqlx::query_as::<_, SiteAdvertiserRule>(&format!(
        "INSERT INTO site_advertiser_rules (site_id, advertiser_id, rule, reason) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (site_id, advertiser_id) DO UPDATE \
         SET rule = EXCLUDED.rule, reason = EXCLUDED.reason, updated_at = NOW() \
         RETURNING {RULE_COLUMNS}"
    ))
    .bind(site_id)
    .bind(advertiser_id)
    .bind(rule)
    .bind(reason)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Set (or clear, with `None`) the default weight of every listed advertiser.
pub async fn set_weights(
    pool: &PgPool,
    advertiser_ids: &[AdvertiserId],
    weight: Option<Weight>,
) -> Result<u64, AppError> {
    if advertiser_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "UPDATE advertisers SET default_weight = $2, updated_at = NOW() WHERE id = ANY($1)",
    )
    .bind(advertiser_ids)
    .bind(weight)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Set one advertiser's weight; `None` when the advertiser does not exist.
pub async fn set_weight(
    pool: &PgPool,
    advertiser_id: AdvertiserId,
    weight: Option<Weight>,
) -> Result<Option<Option<Weight>>, AppError> {
    let stored = sqlx::query_scalar::<_, Option<Weight>>(
        "UPDATE advertisers SET default_weight = $2, updated_at = NOW() \
         WHERE id = $1 RETURNING default_weight",
    )
    .bind(advertiser_id)
    .bind(weight)
    .fetch_optional(pool)
    .await?;

    Ok(stored)
}

/// The subset of `ids` that exist, ascending.
pub async fn existing_advertiser_ids(
    pool: &PgPool,
    ids: &[AdvertiserId],
) -> Result<Vec<AdvertiserId>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let found = sqlx::query_scalar::<_, AdvertiserId>(
        "SELECT id FROM advertisers WHERE id = ANY($1) ORDER BY id",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(found)
}

pub async fn advertiser_exists(pool: &PgPool, id: AdvertiserId) -> Result<bool, AppError> {
    let found =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM advertisers WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok(found)
}
