//! Request and response bodies for rule/weight writes, bulk and single-cell.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::AppError;
use crate::models::advertiser::{AdvertiserId, Weight};
use crate::models::filter::BulkFilter;
use crate::models::rule::RuleValue;
use crate::models::site::SiteId;

/// Where a bulk write gets its advertiser ids from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    Ids(&'a [AdvertiserId]),
    Filter(&'a BulkFilter),
}

/// Exactly one of `ids` / `filter` must be supplied.
fn select_target<'a>(
    ids: &'a Option<Vec<AdvertiserId>>,
    filter: &'a Option<BulkFilter>,
) -> Result<Target<'a>, AppError> {
    match (ids, filter) {
        (Some(ids), None) => Ok(Target::Ids(ids)),
        (None, Some(filter)) => Ok(Target::Filter(filter)),
        (Some(_), Some(_)) => Err(AppError::Validation(
            "Supply either ids or filter, not both".to_string(),
        )),
        (None, None) => Err(AppError::Validation(
            "One of ids or filter is required".to_string(),
        )),
    }
}

/// POST /api/v1/advertisers/bulk-rules body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BulkRuleRequest {
    #[serde(default, alias = "advertiser_ids", skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<AdvertiserId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<BulkFilter>,
    #[serde(alias = "siteId")]
    pub site_id: SiteId,
    pub rule: RuleValue,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub reason: Option<String>,
}

impl BulkRuleRequest {
    pub fn target(&self) -> Result<Target<'_>, AppError> {
        select_target(&self.ids, &self.filter)
    }
}

/// POST /api/v1/advertisers/bulk-weight body. A missing weight clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BulkWeightRequest {
    #[serde(default, alias = "advertiser_ids", skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<AdvertiserId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<BulkFilter>,
    #[serde(default, alias = "default_weight")]
    pub weight: Option<Weight>,
}

impl BulkWeightRequest {
    pub fn target(&self) -> Result<Target<'_>, AppError> {
        select_target(&self.ids, &self.filter)
    }
}

/// Bulk write outcome: the number of targets processed, not rows changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCount {
    pub success: bool,
    pub count: usize,
}

impl BulkCount {
    pub fn new(count: usize) -> Self {
        Self {
            success: true,
            count,
        }
    }
}

/// PATCH /api/v1/advertisers/{id}/rules/{site_id} body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetRuleRequest {
    pub rule: RuleValue,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub reason: Option<String>,
}

/// PATCH /api/v1/advertisers/{id}/weight body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetWeightRequest {
    #[serde(default, alias = "default_weight")]
    pub weight: Option<Weight>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightUpdated {
    pub advertiser_id: AdvertiserId,
    pub weight: Option<Weight>,
}
