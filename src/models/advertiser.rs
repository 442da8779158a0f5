//! Advertiser catalog model: networks, weights, and grid rows.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::rule::RuleValue;

pub type AdvertiserId = i64;

// -- Enums matching PostgreSQL --

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "ad_network", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Flexoffers,
    Awin,
    Cj,
    Impact,
}

impl Network {
    pub const ALL: [Network; 4] = [Self::Flexoffers, Self::Awin, Self::Cj, Self::Impact];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flexoffers => "flexoffers",
            Self::Awin => "awin",
            Self::Cj => "cj",
            Self::Impact => "impact",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown network '{s}'"))
    }
}

// -- Weight --

/// Rejected weight value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("weight must be one of 2, 4, 6, 8, 10 (got {0})")]
pub struct InvalidWeight(pub i32);

/// Relative selection frequency of an advertiser's ads.
///
/// Only the even values 2 through 10 are representable; "unassigned" is
/// modelled as `Option<Weight>::None` by callers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(try_from = "i32", into = "i32")]
#[sqlx(transparent)]
pub struct Weight(i32);

impl Weight {
    pub const ALLOWED: [i32; 5] = [2, 4, 6, 8, 10];

    pub fn new(value: i32) -> Result<Self, InvalidWeight> {
        if Self::ALLOWED.contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidWeight(value))
        }
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Weight {
    type Error = InvalidWeight;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Weight> for i32 {
    fn from(weight: Weight) -> Self {
        weight.0
    }
}

impl FromStr for Weight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i32 = s
            .trim()
            .parse()
            .map_err(|_| format!("weight must be an integer (got '{s}')"))?;
        Self::new(value).map_err(|e| e.to_string())
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Advertiser --

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Advertiser {
    pub id: AdvertiserId,
    pub network: Network,
    pub network_advertiser_id: String,
    pub name: String,
    pub website_url: Option<String>,
    pub category: Option<String>,
    pub total_clicks: i64,
    pub total_revenue: f64,
    pub epc: f64,
    pub commission_rate: Option<f64>,
    pub default_weight: Option<Weight>,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list for `SELECT`s that decode into [`Advertiser`] (table alias `a`).
pub const ADVERTISER_COLUMNS: &str = "a.id, a.network, a.network_advertiser_id, a.name, \
     a.website_url, a.category, a.total_clicks, a.total_revenue, a.epc, a.commission_rate, \
     a.default_weight, a.is_active, a.last_synced_at, a.created_at, a.updated_at";

/// One grid row: the advertiser plus its stored rules on active sites, keyed by site id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertiserRow {
    #[serde(flatten)]
    pub advertiser: Advertiser,
    #[serde(with = "site_keyed")]
    pub rules: BTreeMap<i64, RuleValue>,
}

/// Site-id keyed maps inside a flattened row. Flattening buffers the row, and
/// buffered JSON object keys only come back as strings, so keys are parsed here.
mod site_keyed {
    use std::collections::BTreeMap;

    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use crate::models::rule::RuleValue;

    pub fn serialize<S: Serializer>(
        rules: &BTreeMap<i64, RuleValue>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        rules.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<i64, RuleValue>, D::Error> {
        BTreeMap::<String, RuleValue>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, rule)| {
                key.parse()
                    .map(|site_id| (site_id, rule))
                    .map_err(|_| de::Error::custom(format!("invalid site id key: {key}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_serialization() {
        let json = serde_json::to_string(&Network::Flexoffers).unwrap();
        assert_eq!(json, "\"flexoffers\"");
        let parsed: Network = serde_json::from_str("\"cj\"").unwrap();
        assert_eq!(parsed, Network::Cj);
    }

    #[test]
    fn network_from_str_is_case_insensitive() {
        assert_eq!("AWIN".parse::<Network>().unwrap(), Network::Awin);
        assert!("shareasale".parse::<Network>().is_err());
    }

    #[test]
    fn weight_accepts_only_even_steps() {
        for value in Weight::ALLOWED {
            assert_eq!(Weight::new(value).unwrap().value(), value);
        }
        for value in [0, 1, 3, 5, 12, -2] {
            assert_eq!(Weight::new(value), Err(InvalidWeight(value)));
        }
    }

    #[test]
    fn weight_deserialization_validates() {
        let w: Weight = serde_json::from_str("8").unwrap();
        assert_eq!(w.value(), 8);
        assert!(serde_json::from_str::<Weight>("7").is_err());

        let cleared: Option<Weight> = serde_json::from_str("null").unwrap();
        assert!(cleared.is_none());
    }

    #[test]
    fn advertiser_row_round_trips_site_keys() {
        let json = r#"{
            "id": 7, "network": "awin", "network_advertiser_id": "1001",
            "name": "Trailhead Outfitters", "website_url": null, "category": "Outdoor",
            "total_clicks": 10, "total_revenue": 4.2, "epc": 0.42, "commission_rate": null,
            "default_weight": 8, "is_active": true, "last_synced_at": null,
            "created_at": "2025-06-01T00:00:00Z", "updated_at": "2025-06-01T00:00:00Z",
            "rules": {"3": "allowed", "12": "denied"}
        }"#;
        let row: AdvertiserRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.advertiser.id, 7);
        assert_eq!(row.rules.get(&3), Some(&RuleValue::Allowed));
        assert_eq!(row.rules.get(&12), Some(&RuleValue::Denied));

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["rules"]["12"], "denied");
        assert_eq!(value["name"], "Trailhead Outfitters");
    }

    #[test]
    fn weight_from_str() {
        assert_eq!("4".parse::<Weight>().unwrap().value(), 4);
        assert!("four".parse::<Weight>().is_err());
        assert!("9".parse::<Weight>().is_err());
    }
}
