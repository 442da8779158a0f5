//! Transport between the matrix editor and the adrules API.
//!
//! [`MatrixApi`] is the seam the session and commit engine talk to;
//! [`HttpMatrixApi`] implements it over the JSON envelope with [`reqwest`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::ApiResponse;
use crate::matrix::error::ClientError;
use crate::models::advertiser::AdvertiserId;
use crate::models::bulk::{BulkCount, BulkRuleRequest, BulkWeightRequest};
use crate::models::filter::{AdvertiserFilters, SortParams};
use crate::models::matrix::{AdvertiserPage, MatrixSnapshot, SnapshotRequest};
use crate::models::pagination::Pagination;

/// Server operations the matrix editor depends on.
#[async_trait]
pub trait MatrixApi: Send + Sync {
    async fn query(
        &self,
        filters: &AdvertiserFilters,
        sort: &SortParams,
        pagination: &Pagination,
    ) -> Result<AdvertiserPage, ClientError>;

    /// Every id matching `filters`, ignoring pagination.
    async fn resolve_ids(&self, filters: &AdvertiserFilters)
        -> Result<Vec<AdvertiserId>, ClientError>;

    async fn snapshot(&self, ids: &[AdvertiserId]) -> Result<MatrixSnapshot, ClientError>;

    async fn bulk_set_weight(&self, req: &BulkWeightRequest) -> Result<BulkCount, ClientError>;

    async fn bulk_set_rules(&self, req: &BulkRuleRequest) -> Result<BulkCount, ClientError>;
}

/// HTTP client for one adrules server.
#[derive(Debug, Clone)]
pub struct HttpMatrixApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMatrixApi {
    /// * `base_url` - API root including the version prefix, e.g. `http://host:3000/api/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] and its connection pool.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::parse_envelope(response).await
    }

    /// Unwrap `{data, error}`. An error envelope wins over the HTTP status;
    /// a non-2xx response without one is reported with its raw body.
    async fn parse_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(ApiResponse {
                error: Some(error), ..
            }) => Err(ClientError::Api {
                code: error.code,
                message: error.message,
            }),
            Ok(ApiResponse {
                data: Some(data), ..
            }) if status.is_success() => Ok(data),
            Err(e) if status.is_success() => Err(ClientError::Decode(e)),
            _ => Err(ClientError::Status {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

#[async_trait]
impl MatrixApi for HttpMatrixApi {
    async fn query(
        &self,
        filters: &AdvertiserFilters,
        sort: &SortParams,
        pagination: &Pagination,
    ) -> Result<AdvertiserPage, ClientError> {
        let response = self
            .client
            .get(self.url("/advertisers"))
            .query(filters)
            .query(sort)
            .query(pagination)
            .send()
            .await?;
        Self::parse_envelope(response).await
    }

    async fn resolve_ids(
        &self,
        filters: &AdvertiserFilters,
    ) -> Result<Vec<AdvertiserId>, ClientError> {
        let response = self
            .client
            .get(self.url("/advertisers/ids"))
            .query(filters)
            .send()
            .await?;
        Self::parse_envelope(response).await
    }

    async fn snapshot(&self, ids: &[AdvertiserId]) -> Result<MatrixSnapshot, ClientError> {
        let body = SnapshotRequest { ids: ids.to_vec() };
        self.post("/matrix/snapshot", &body).await
    }

    async fn bulk_set_weight(&self, req: &BulkWeightRequest) -> Result<BulkCount, ClientError> {
        self.post("/advertisers/bulk-weight", req).await
    }

    async fn bulk_set_rules(&self, req: &BulkRuleRequest) -> Result<BulkCount, ClientError> {
        self.post("/advertisers/bulk-rules", req).await
    }
}
