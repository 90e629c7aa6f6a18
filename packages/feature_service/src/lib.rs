#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature service access for the resolver.
//!
//! The resolver only ever talks to a [`FeatureServiceClient`]: "run this
//! spatial query at this offset and hand back the page". [`arcgis`]
//! implements that over HTTP with transient-failure retry ([`retry`]), and
//! [`pagination`] drives any client page by page until the service stops
//! signalling more data.

pub mod arcgis;
pub mod pagination;
pub mod progress;
pub mod retry;

use async_trait::async_trait;
use locator_feature_service_models::{FeatureServiceResponse, SpatialQuery};

pub use pagination::{DEFAULT_MAX_RECORDS, FetchOutcome, PageDelay, PaginatedFeatureFetcher};

/// Errors that can occur while querying a feature service.
#[derive(Debug, thiserror::Error)]
pub enum FeatureServiceError {
    /// The HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response body was not valid JSON or had an unexpected shape.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service returned an explicit `error` payload.
    #[error("Service error (code {code:?}): {message}")]
    Service {
        /// Error code reported by the service.
        code: Option<i64>,
        /// Error message reported by the service.
        message: String,
    },

    /// The caller cancelled the fetch.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FeatureServiceError {
    /// Returns `true` for network / HTTP-level failures, as opposed to an
    /// explicit service error or cancellation.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. } | Self::Json(_))
    }
}

/// A feature service that can answer one page of a spatial query.
///
/// Implementations return the page as-is, including any `error` payload;
/// interpreting it is the fetcher's job.
#[async_trait]
pub trait FeatureServiceClient: Send + Sync {
    /// Short label used in log messages (e.g. the layer id).
    fn label(&self) -> &str;

    /// Requests the page of `query` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureServiceError`] if the request fails at the transport
    /// level or the body cannot be decoded.
    async fn query_page(
        &self,
        query: &SpatialQuery,
        offset: u64,
    ) -> Result<FeatureServiceResponse, FeatureServiceError>;
}
