//! Catalog filter, sort, and bulk filter descriptors.
//!
//! Query strings from the grid send empty values for unset controls, so every
//! optional field treats an empty string as absent.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::models::advertiser::{Network, Weight};
use crate::models::rule::RuleValue;
use crate::models::site::SiteId;

/// Weight filter: `unassigned` matches a null weight, an integer matches exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFilter {
    Unassigned,
    Exact(Weight),
}

impl FromStr for WeightFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "unassigned" {
            Ok(Self::Unassigned)
        } else {
            s.parse().map(Self::Exact)
        }
    }
}

impl Serialize for WeightFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unassigned => serializer.serialize_str("unassigned"),
            Self::Exact(weight) => serializer.serialize_i32(weight.value()),
        }
    }
}

/// Full interactive filter set for the advertiser grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvertiserFilters {
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub weight: Option<WeightFilter>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleValue>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub rule_site: Option<SiteId>,
    #[serde(
        default,
        deserialize_with = "flag::deserialize",
        serialize_with = "flag::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub epc_min: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub epc_max: Option<f64>,
}

/// Reduced filter descriptor accepted by the bulk endpoints.
///
/// Weight, rule, and EPC filters are deliberately not part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkFilter {
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub network: Option<Network>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "flag::deserialize",
        serialize_with = "flag::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub active: Option<bool>,
}

impl From<&BulkFilter> for AdvertiserFilters {
    fn from(filter: &BulkFilter) -> Self {
        Self {
            search: filter.search.clone(),
            network: filter.network,
            category: filter.category.clone(),
            active: filter.active,
            ..Default::default()
        }
    }
}

/// Sortable advertiser columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Network,
    Epc,
    CommissionRate,
    DefaultWeight,
    LastSyncedAt,
}

impl SortKey {
    /// Parse a requested sort key; anything outside the allow-list sorts by name.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            Some("network") => Self::Network,
            Some("epc") => Self::Epc,
            Some("commission_rate") => Self::CommissionRate,
            Some("default_weight") => Self::DefaultWeight,
            Some("last_synced_at") => Self::LastSyncedAt,
            _ => Self::Name,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Network => "network",
            Self::Epc => "epc",
            Self::CommissionRate => "commission_rate",
            Self::DefaultWeight => "default_weight",
            Self::LastSyncedAt => "last_synced_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw `sort`/`dir` query parameters. Kept as strings so unknown values downgrade silently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl SortParams {
    pub fn key(&self) -> SortKey {
        SortKey::parse_or_default(self.sort.as_deref())
    }

    pub fn direction(&self) -> SortDirection {
        match self.dir.as_deref() {
            Some("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

/// Deserialize an optional value from its string form, treating `""` as unset.
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

/// `"0"` / `"1"` active flag as sent by the grid's filter bar.
pub mod flag {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some("1") | Some("true") => Ok(Some(true)),
            Some("0") | Some("false") => Ok(Some(false)),
            Some(other) => Err(de::Error::custom(format!(
                "active must be \"0\" or \"1\" (got '{other}')"
            ))),
        }
    }

    pub fn serialize<S>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(true) => serializer.serialize_str("1"),
            Some(false) => serializer.serialize_str("0"),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    fn parse(query: &str) -> AdvertiserFilters {
        let uri: Uri = format!("/advertisers?{query}").parse().unwrap();
        Query::<AdvertiserFilters>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn empty_parameters_are_unset() {
        let filters = parse("search=&network=&weight=&rule=&rule_site=&active=&epc_min=");
        assert_eq!(filters, AdvertiserFilters::default());
    }

    #[test]
    fn parses_full_filter_bar() {
        let filters = parse(
            "search=shoe&network=awin&category=Apparel&weight=4&rule=denied&rule_site=7&active=1&epc_min=0.5&epc_max=2",
        );
        assert_eq!(filters.search.as_deref(), Some("shoe"));
        assert_eq!(filters.network, Some(Network::Awin));
        assert_eq!(filters.category.as_deref(), Some("Apparel"));
        assert_eq!(filters.weight, Some(WeightFilter::Exact(Weight::new(4).unwrap())));
        assert_eq!(filters.rule, Some(RuleValue::Denied));
        assert_eq!(filters.rule_site, Some(7));
        assert_eq!(filters.active, Some(true));
        assert_eq!(filters.epc_min, Some(0.5));
        assert_eq!(filters.epc_max, Some(2.0));
    }

    #[test]
    fn weight_filter_unassigned() {
        assert_eq!(parse("weight=unassigned").weight, Some(WeightFilter::Unassigned));
    }

    #[test]
    fn invalid_weight_filter_is_rejected() {
        let uri: Uri = "/advertisers?weight=5".parse().unwrap();
        assert!(Query::<AdvertiserFilters>::try_from_uri(&uri).is_err());
    }

    #[test]
    fn active_flag_zero_means_inactive() {
        assert_eq!(parse("active=0").active, Some(false));
    }

    #[test]
    fn bulk_filter_from_json_and_widening() {
        let filter: BulkFilter =
            serde_json::from_str(r#"{"search":"shoe","network":"cj","active":"0"}"#).unwrap();
        let full = AdvertiserFilters::from(&filter);
        assert_eq!(full.search.as_deref(), Some("shoe"));
        assert_eq!(full.network, Some(Network::Cj));
        assert_eq!(full.active, Some(false));
        assert!(full.weight.is_none());
        assert!(full.rule.is_none());
        assert!(full.epc_min.is_none());
    }

    #[test]
    fn bulk_filter_serializes_active_as_flag() {
        let filter = BulkFilter {
            active: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["active"], "1");
        assert!(json.get("search").is_none());
    }

    #[test]
    fn sort_params_fall_back_to_name_ascending() {
        let params = SortParams {
            sort: Some("id; DROP TABLE advertisers".to_string()),
            dir: Some("sideways".to_string()),
        };
        assert_eq!(params.key(), SortKey::Name);
        assert_eq!(params.direction(), SortDirection::Asc);

        let params = SortParams {
            sort: Some("epc".to_string()),
            dir: Some("desc".to_string()),
        };
        assert_eq!(params.key().column(), "epc");
        assert_eq!(params.direction().as_sql(), "DESC");
    }
}
