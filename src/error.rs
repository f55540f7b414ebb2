//! Handler failures
//!
//! Handlers return `Result<Response, ApiError>`; the router is the only place an
//! `ApiError` becomes a response.

use hyper::StatusCode;
use serde_json::{json, Value};

use crate::store::StoreError;
use crate::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Asset key required")]
    AssetKeyRequired,
    #[error("Asset not found")]
    AssetNotFound,
    #[error("Failed to fetch asset: {0}")]
    AssetFetch(#[source] StoreError),
    #[error("Failed to fetch feature flags: {0}")]
    FeatureFlags(#[source] StoreError),
    #[error("Failed to store metric: {0}")]
    StoreMetric(String),
    #[error("Failed to fetch analytics: {0}")]
    FetchAnalytics(#[source] StoreError),
    #[error("Failed to fetch configuration: {0}")]
    Configuration(#[source] StoreError),
    #[error("GitHub API Error: {0}")]
    GithubStatus(u16),
    #[error("Payload Too Large")]
    PayloadTooLarge,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AssetKeyRequired => StatusCode::BAD_REQUEST,
            Self::AssetNotFound => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::GithubStatus(code) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::AssetFetch(_)
            | Self::FeatureFlags(_)
            | Self::StoreMetric(_)
            | Self::FetchAnalytics(_)
            | Self::Configuration(_)
            | Self::Upstream(_)
            | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Public JSON body; internal detail stays in the logs except for the catch-all
    pub fn body(&self) -> Value {
        match self {
            Self::AssetKeyRequired => json!({ "error": "Asset key required" }),
            Self::AssetNotFound => json!({ "error": "Asset not found" }),
            Self::AssetFetch(_) => json!({ "error": "Failed to fetch asset" }),
            Self::FeatureFlags(_) => json!({ "error": "Failed to fetch feature flags" }),
            Self::StoreMetric(_) => json!({ "error": "Failed to store metric" }),
            Self::FetchAnalytics(_) => json!({ "error": "Failed to fetch analytics" }),
            Self::Configuration(_) => json!({ "error": "Failed to fetch configuration" }),
            Self::GithubStatus(code) => json!({ "error": "GitHub API Error", "status": code }),
            Self::PayloadTooLarge => json!({ "error": "Payload Too Large" }),
            Self::Upstream(_) | Self::Store(_) => json!({
                "error": "Internal Server Error",
                "message": self.to_string(),
            }),
        }
    }

    /// Whether this failure should be logged at error level
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::AssetFetch(_)
                | Self::FeatureFlags(_)
                | Self::StoreMetric(_)
                | Self::FetchAnalytics(_)
                | Self::Configuration(_)
                | Self::Upstream(_)
                | Self::Store(_)
        )
    }
}
