//! Pagination primitives shared by the catalog list endpoints.

use serde::{Deserialize, Serialize};

/// Pagination query parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(
        default,
        deserialize_with = "crate::models::filter::empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<i64>,
    #[serde(
        default,
        deserialize_with = "crate::models::filter::empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub per_page: Option<i64>,
}

impl Pagination {
    /// Page sizes the grid offers; anything else falls back to the default.
    const ALLOWED_PER_PAGE: [i64; 3] = [25, 50, 100];

    /// Default items per page.
    const DEFAULT_PER_PAGE: i64 = 25;

    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
            .filter(|n| Self::ALLOWED_PER_PAGE.contains(n))
            .unwrap_or(Self::DEFAULT_PER_PAGE)
    }

    /// Rows to skip. Saturates for absurd page numbers, which then read an empty page.
    pub fn offset(&self) -> i64 {
        (self.current_page() - 1).saturating_mul(self.limit())
    }

    pub fn current_page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Paged result envelope returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: &Pagination) -> Self {
        let per_page = pagination.limit();
        let total_pages = (total + per_page - 1) / per_page;
        Self {
            items,
            total,
            page: pagination.current_page(),
            per_page,
            total_pages,
        }
    }
}
