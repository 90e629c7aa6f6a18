//! `ArcGIS` REST `FeatureServer` / `MapServer` query client.
//!
//! Sends one `GET {layer}/query` per page with the parameters rendered by
//! [`SpatialQuery::to_params`]. Transient failures are retried according to
//! the client's [`RetryPolicy`]; anything else is returned to the fetcher.

use std::time::Duration;

use async_trait::async_trait;
use locator_feature_service_models::{FeatureServiceResponse, SpatialQuery};

use crate::retry::{self, RetryPolicy};
use crate::{FeatureServiceClient, FeatureServiceError};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a single `ArcGIS` layer's `query` endpoint.
#[derive(Debug, Clone)]
pub struct ArcGisClient {
    client: reqwest::Client,
    query_url: String,
    label: String,
    retry: RetryPolicy,
}

impl ArcGisClient {
    /// Creates a client for `layer_url`, which may be either the layer
    /// (`.../FeatureServer/0`) or its `query` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureServiceError::Http`] if the HTTP client cannot be
    /// built.
    pub fn new(layer_url: &str, label: &str) -> Result<Self, FeatureServiceError> {
        Self::with_timeout(layer_url, label, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureServiceError::Http`] if the HTTP client cannot be
    /// built.
    pub fn with_timeout(
        layer_url: &str,
        label: &str,
        timeout: Duration,
    ) -> Result<Self, FeatureServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::from_client(client, layer_url, label))
    }

    /// Wraps an existing [`reqwest::Client`], so many layers can share one
    /// connection pool.
    #[must_use]
    pub fn from_client(client: reqwest::Client, layer_url: &str, label: &str) -> Self {
        Self {
            client,
            query_url: query_endpoint(layer_url),
            label: label.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the retry policy for transient failures.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The resolved `query` endpoint URL.
    #[must_use]
    pub fn query_url(&self) -> &str {
        &self.query_url
    }
}

#[async_trait]
impl FeatureServiceClient for ArcGisClient {
    fn label(&self) -> &str {
        &self.label
    }

    async fn query_page(
        &self,
        query: &SpatialQuery,
        offset: u64,
    ) -> Result<FeatureServiceResponse, FeatureServiceError> {
        let params = query.to_params(offset);

        log::debug!(
            "[{}] GET {} offset={offset} limit={} distance={:?}",
            self.label,
            self.query_url,
            query.batch_size,
            query.distance_meters,
        );

        let body = retry::send_json(&self.retry, || {
            self.client.get(&self.query_url).query(&params)
        })
        .await?;

        Ok(serde_json::from_value(body)?)
    }
}

/// Appends `/query` to a layer URL unless it is already there.
fn query_endpoint(layer_url: &str) -> String {
    let trimmed = layer_url.trim_end_matches('/');
    if trimmed.ends_with("/query") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/query")
    }
}
