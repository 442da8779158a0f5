//! Per-site advertiser permission rules.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "rule_value", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RuleValue {
    Allowed,
    Denied,
    /// Explicitly pending: a row exists but no decision was made.
    Default,
}

impl RuleValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::Default => "default",
        }
    }

    /// Whether this value is an operator decision (`allowed` or `denied`).
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Default)
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allowed" => Ok(Self::Allowed),
            "denied" => Ok(Self::Denied),
            "default" => Ok(Self::Default),
            other => Err(format!(
                "rule must be one of allowed, denied, default (got '{other}')"
            )),
        }
    }
}

/// Stored rule row; unique per (site_id, advertiser_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SiteAdvertiserRule {
    pub id: i64,
    pub site_id: i64,
    pub advertiser_id: i64,
    pub rule: RuleValue,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
