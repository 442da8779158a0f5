//! Publisher sites: the columns of the rule matrix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type SiteId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub domain: String,
    pub wordpress_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
