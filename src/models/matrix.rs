//! Wire shapes for loading matrix state: grid pages and id snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::advertiser::{AdvertiserId, AdvertiserRow, Weight};
use crate::models::pagination::PagedResult;
use crate::models::rule::RuleValue;
use crate::models::site::{Site, SiteId};

/// One page of the interactive grid with everything needed to render it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertiserPage {
    // Nested rather than flattened: flattened content is buffered, and the
    // integer site keys in each row's rule map do not survive that on decode.
    pub page: PagedResult<AdvertiserRow>,
    /// Active sites, ordered by name: the matrix columns.
    pub sites: Vec<Site>,
    /// Lowercased names occurring more than once on this page.
    pub duplicate_names: Vec<String>,
}

/// POST /api/v1/matrix/snapshot body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SnapshotRequest {
    #[validate(length(max = 5000))]
    pub ids: Vec<AdvertiserId>,
}

/// Current weight and active-site rules for one advertiser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub advertiser_id: AdvertiserId,
    pub weight: Option<Weight>,
    pub rules: BTreeMap<SiteId, RuleValue>,
}

/// Stored matrix state for a set of advertisers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixSnapshot {
    pub sites: Vec<SiteId>,
    pub rows: Vec<MatrixRow>,
}

impl From<&AdvertiserPage> for MatrixSnapshot {
    fn from(page: &AdvertiserPage) -> Self {
        Self {
            sites: page.sites.iter().map(|s| s.id).collect(),
            rows: page
                .page
                .items
                .iter()
                .map(|row| MatrixRow {
                    advertiser_id: row.advertiser.id,
                    weight: row.advertiser.default_weight,
                    rules: row.rules.clone(),
                })
                .collect(),
        }
    }
}
