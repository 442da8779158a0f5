//! Bulk endpoint layer: apply one rule or weight to an id list or a filter's matches.
//!
//! Everything that can be rejected is checked before the first write, so a
//! validation failure never leaves a partial update behind.

use std::collections::BTreeSet;

use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::advertiser::{AdvertiserId, Weight};
use crate::models::bulk::{BulkCount, BulkRuleRequest, BulkWeightRequest, Target, WeightUpdated};
use crate::models::filter::AdvertiserFilters;
use crate::models::rule::{RuleValue, SiteAdvertiserRule};
use crate::models::site::SiteId;
use crate::services::{catalog, rule_store, site as site_service};

/// Distinct ids in ascending order.
fn dedup_ids(ids: &[AdvertiserId]) -> Vec<AdvertiserId> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Turn a bulk target into the concrete id list to write.
///
/// Explicit ids must all exist; a filter resolves through the catalog predicate.
async fn resolve_target(pool: &PgPool, target: Target<'_>) -> Result<Vec<AdvertiserId>, AppError> {
    match target {
        Target::Ids(ids) => {
            let wanted = dedup_ids(ids);
            let found = rule_store::existing_advertiser_ids(pool, &wanted).await?;
            if found.len() != wanted.len() {
                let found: BTreeSet<_> = found.into_iter().collect();
                let missing: Vec<String> = wanted
                    .iter()
                    .filter(|id| !found.contains(id))
                    .map(ToString::to_string)
                    .collect();
                return Err(AppError::Validation(format!(
                    "Unknown advertiser ids: {}",
                    missing.join(", ")
                )));
            }
            Ok(wanted)
        }
        Target::Filter(filter) => {
            catalog::resolve_ids(pool, &AdvertiserFilters::from(filter)).await
        }
    }
}

async fn require_site(pool: &PgPool, site_id: SiteId) -> Result<(), AppError> {
    if site_service::exists(pool, site_id).await? {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Unknown site id {site_id}")))
    }
}

/// Set one rule on one site for every targeted advertiser.
pub async fn bulk_set_rule(pool: &PgPool, req: &BulkRuleRequest) -> Result<BulkCount, AppError> {
    let target = req.target()?;
    require_site(pool, req.site_id).await?;
    let ids = resolve_target(pool, target).await?;

    let written =
        rule_store::upsert_rules(pool, req.site_id, &ids, req.rule, req.reason.as_deref()).await?;

    tracing::info!(
        site_id = req.site_id,
        rule = %req.rule,
        count = ids.len(),
        written,
        by_filter = req.filter.is_some(),
        "Bulk rule applied"
    );

    Ok(BulkCount::new(ids.len()))
}

/// Set (or clear) the default weight of every targeted advertiser.
pub async fn bulk_set_weight(
    pool: &PgPool,
    req: &BulkWeightRequest,
) -> Result<BulkCount, AppError> {
    let target = req.target()?;
    let ids = resolve_target(pool, target).await?;

    let written = rule_store::set_weights(pool, &ids, req.weight).await?;

    tracing::info!(
        weight = ?req.weight.map(Weight::value),
        count = ids.len(),
        written,
        by_filter = req.filter.is_some(),
        "Bulk weight applied"
    );

    Ok(BulkCount::new(ids.len()))
}

/// Single-cell rule write.
pub async fn set_rule(
    pool: &PgPool,
    advertiser_id: AdvertiserId,
    site_id: SiteId,
    rule: RuleValue,
    reason: Option<&str>,
) -> Result<SiteAdvertiserRule, AppError> {
    let (advertiser_found, site_found) = tokio::try_join!(
        rule_store::advertiser_exists(pool, advertiser_id),
        site_service::exists(pool, site_id),
    )?;
    if !advertiser_found {
        return Err(AppError::NotFound(format!("Advertiser {advertiser_id} not found")));
    }
    if !site_found {
        return Err(AppError::NotFound(format!("Site {site_id} not found")));
    }

    let row = rule_store::upsert_rule(pool, site_id, advertiser_id, rule, reason).await?;
    tracing::info!(advertiser_id, site_id, rule = %rule, "Rule updated");
    Ok(row)
}

/// Single-advertiser weight write.
pub async fn set_weight(
    pool: &PgPool,
    advertiser_id: AdvertiserId,
    weight: Option<Weight>,
) -> Result<WeightUpdated, AppError> {
    let stored = rule_store::set_weight(pool, advertiser_id, weight)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Advertiser {advertiser_id} not found")))?;

    tracing::info!(advertiser_id, weight = ?stored.map(Weight::value), "Weight updated");
    Ok(WeightUpdated {
        advertiser_id,
        weight: stored,
    })
}
