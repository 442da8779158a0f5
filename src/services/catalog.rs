//! Catalog query service: filtered grid pages and filter-to-id resolution.
//!
//! `query` and `resolve_ids` share one predicate builder, so a "select all
//! matching" resolution covers exactly the rows the grid would page through.

use std::collections::BTreeMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::models::advertiser::{
    Advertiser, AdvertiserId, AdvertiserRow, Weight, ADVERTISER_COLUMNS,
};
use crate::models::filter::{AdvertiserFilters, SortParams, WeightFilter};
use crate::models::matrix::{AdvertiserPage, MatrixRow, MatrixSnapshot};
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::rule::RuleValue;
use crate::services::{rule_store, site as site_service};

/// Escape LIKE wildcards so the search term matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Append the WHERE clause for `filters` to a query selecting `FROM advertisers a`.
pub(crate) fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &AdvertiserFilters) {
    qb.push(" WHERE TRUE");

    if let Some(search) = &filters.search {
        qb.push(" AND a.name ILIKE ")
            .push_bind(like_pattern(search))
            .push(" ESCAPE '\\'");
    }
    if let Some(network) = filters.network {
        qb.push(" AND a.network = ").push_bind(network);
    }
    if let Some(category) = &filters.category {
        qb.push(" AND a.category = ").push_bind(category.clone());
    }
    match filters.weight {
        Some(WeightFilter::Unassigned) => {
            qb.push(" AND a.default_weight IS NULL");
        }
        Some(WeightFilter::Exact(weight)) => {
            qb.push(" AND a.default_weight = ").push_bind(weight.value());
        }
        None => {}
    }
    if let Some(min) = filters.epc_min {
        qb.push(" AND a.epc >= ").push_bind(min);
    }
    if let Some(max) = filters.epc_max {
        qb.push(" AND a.epc <= ").push_bind(max);
    }
    if let Some(active) = filters.active {
        qb.push(" AND a.is_active = ").push_bind(active);
    }

    match (filters.rule, filters.rule_site) {
        (Some(rule), Some(site_id)) => {
            qb.push(
                " AND EXISTS (SELECT 1 FROM site_advertiser_rules r \
                 WHERE r.advertiser_id = a.id AND r.site_id = ",
            )
            .push_bind(site_id)
            .push(" AND r.rule = ")
            .push_bind(rule)
            .push(")");
        }
        // Pending: nothing decided on any active site. Rows marked 'default'
        // and missing rows both count as undecided.
        (Some(RuleValue::Default), None) => {
            qb.push(
                " AND NOT EXISTS (SELECT 1 FROM site_advertiser_rules r \
                 JOIN sites s ON s.id = r.site_id \
                 WHERE r.advertiser_id = a.id AND s.is_active \
                 AND r.rule IN ('allowed', 'denied'))",
            );
        }
        _ => {}
    }
}

fn page_query<'a>(
    filters: &AdvertiserFilters,
    sort: &SortParams,
    pagination: &Pagination,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {ADVERTISER_COLUMNS} FROM advertisers a"));
    push_filters(&mut qb, filters);
    qb.push(format!(
        " ORDER BY a.{} {}, a.id ASC",
        sort.key().column(),
        sort.direction().as_sql()
    ));
    qb.push(" LIMIT ")
        .push_bind(pagination.limit())
        .push(" OFFSET ")
        .push_bind(pagination.offset());
    qb
}

fn resolve_query<'a>(filters: &AdvertiserFilters) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT a.id FROM advertisers a");
    push_filters(&mut qb, filters);
    qb.push(" ORDER BY a.id ASC");
    qb
}

/// List one page of advertisers with their active-site rules.
pub async fn query(
    pool: &PgPool,
    filters: &AdvertiserFilters,
    sort: &SortParams,
    pagination: &Pagination,
) -> Result<AdvertiserPage, AppError> {
    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM advertisers a");
    push_filters(&mut count_qb, filters);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut data_qb = page_query(filters, sort, pagination);
    let advertisers: Vec<Advertiser> = data_qb.build_query_as().fetch_all(pool).await?;

    let ids: Vec<AdvertiserId> = advertisers.iter().map(|a| a.id).collect();
    let (sites, mut rules) = tokio::try_join!(
        site_service::list_active(pool),
        rule_store::active_rules_for(pool, &ids),
    )?;

    let items: Vec<AdvertiserRow> = advertisers
        .into_iter()
        .map(|advertiser| AdvertiserRow {
            rules: rules.remove(&advertiser.id).unwrap_or_default(),
            advertiser,
        })
        .collect();
    let duplicate_names = duplicate_names(&items);

    tracing::debug!(total, returned = items.len(), "Advertiser page queried");

    Ok(AdvertiserPage {
        page: PagedResult::new(items, total, pagination),
        sites,
        duplicate_names,
    })
}

/// Every advertiser id matching `filters`, ascending, ignoring pagination.
pub async fn resolve_ids(
    pool: &PgPool,
    filters: &AdvertiserFilters,
) -> Result<Vec<AdvertiserId>, AppError> {
    let mut qb = resolve_query(filters);
    let ids: Vec<AdvertiserId> = qb.build_query_scalar().fetch_all(pool).await?;
    Ok(ids)
}

/// Sorted non-empty categories for the filter dropdown.
pub async fn distinct_categories(pool: &PgPool) -> Result<Vec<String>, AppError> {
    let categories = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT category FROM advertisers \
         WHERE category IS NOT NULL AND category <> '' ORDER BY category",
    )
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

/// Current weights and active-site rules for an explicit id set.
///
/// Unknown ids are omitted from the result.
pub async fn snapshot(pool: &PgPool, ids: &[AdvertiserId]) -> Result<MatrixSnapshot, AppError> {
    let weights = async {
        sqlx::query_as::<_, (AdvertiserId, Option<Weight>)>(
            "SELECT id, default_weight FROM advertisers WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(AppError::from)
    };

    let (weights, sites, mut rules) = tokio::try_join!(
        weights,
        site_service::list_active(pool),
        rule_store::active_rules_for(pool, ids),
    )?;

    let rows = weights
        .into_iter()
        .map(|(advertiser_id, weight)| MatrixRow {
            advertiser_id,
            weight,
            rules: rules.remove(&advertiser_id).unwrap_or_default(),
        })
        .collect();

    Ok(MatrixSnapshot {
        sites: sites.iter().map(|s| s.id).collect(),
        rows,
    })
}

/// Lowercased names that occur more than once among `rows`, sorted.
///
/// Cross-network name collisions are surfaced to the operator; nothing enforces them.
pub fn duplicate_names(rows: &[AdvertiserRow]) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.advertiser.name.to_lowercase()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, _)| name)
        .collect()
}
