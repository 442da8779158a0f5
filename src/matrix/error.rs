//! Client-side error types for the matrix editor.

use crate::models::advertiser::AdvertiserId;
use crate::models::site::SiteId;

/// Local validation failure: the edit addresses a row or column that is not loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatrixError {
    #[error("advertiser {0} is not loaded in the matrix")]
    UnknownAdvertiser(AdvertiserId),

    #[error("site {0} is not an active matrix column")]
    UnknownSite(SiteId),
}

/// A commit where at least one batch request failed.
///
/// Batches that succeeded stay applied on the server; the pending edits are
/// kept locally so the same commit can simply be retried.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("{failed} of {total} batch requests failed: {}", messages.join("; "))]
    PartialBatchFailure {
        failed: usize,
        total: usize,
        messages: Vec<String>,
    },
}

/// Errors from the matrix client and its transport.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response whose body was not an API error envelope.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server answered with an error envelope.
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

impl ClientError {
    /// Whether the server rejected the request as invalid input.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Api { code, .. } => code == "VALIDATION_ERROR",
            Self::Matrix(_) => true,
            _ => false,
        }
    }
}
