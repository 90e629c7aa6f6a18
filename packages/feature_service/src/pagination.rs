//! Offset-based pagination over a [`FeatureServiceClient`].
//!
//! [`PaginatedFeatureFetcher::fetch_all_pages`] requests pages until one of
//! these happens:
//!
//! * the service returns an empty page (normal end),
//! * a page is neither full nor flagged `exceededTransferLimit` (normal end),
//! * the service returns an `error` payload or the transport fails
//!   (layer-fatal, reported in [`FetchOutcome::error`]),
//! * the accumulated record count reaches the safety ceiling
//!   ([`FetchOutcome::truncated`]),
//! * the caller cancels the [`CancellationToken`].
//!
//! Whatever was accumulated before a failure is always returned alongside
//! the error so the caller can decide whether partial data is usable.

use std::sync::Arc;
use std::time::Duration;

use locator_feature_service_models::{PaginationCursor, RawFeature, SpatialQuery};
use tokio_util::sync::CancellationToken;

use crate::progress::{ProgressCallback, null_progress};
use crate::{FeatureServiceClient, FeatureServiceError};

/// Hard ceiling on records fetched for one query.
pub const DEFAULT_MAX_RECORDS: usize = 100_000;

/// Pause between consecutive page requests.
///
/// Courtesy toward upstream services only; pagination is correct with any
/// delay, including none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageDelay {
    /// Request the next page immediately.
    #[default]
    None,
    /// Sleep for a fixed duration between pages.
    Fixed(Duration),
}

impl PageDelay {
    /// A fixed delay in milliseconds; `0` means no delay.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::None
        } else {
            Self::Fixed(Duration::from_millis(ms))
        }
    }

    /// The delay to apply, if any.
    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed(d) => Some(d),
        }
    }
}

/// Result of paginating one query.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Features accumulated across all successful pages.
    pub features: Vec<RawFeature>,
    /// The error that stopped pagination, if any.
    pub error: Option<FeatureServiceError>,
    /// Number of page requests that returned a response.
    pub pages: u32,
    /// Set when the safety ceiling stopped pagination early.
    pub truncated: bool,
}

/// Drives a [`FeatureServiceClient`] page by page.
pub struct PaginatedFeatureFetcher<'a, C: FeatureServiceClient + ?Sized> {
    client: &'a C,
    delay: PageDelay,
    max_records: usize,
    cancel: CancellationToken,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a, C: FeatureServiceClient + ?Sized> PaginatedFeatureFetcher<'a, C> {
    /// A fetcher with no page delay, the default safety ceiling, a fresh
    /// (never cancelled) token and no progress reporting.
    #[must_use]
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            delay: PageDelay::None,
            max_records: DEFAULT_MAX_RECORDS,
            cancel: CancellationToken::new(),
            progress: null_progress(),
        }
    }

    /// Sets the inter-page delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: PageDelay) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the safety ceiling on accumulated records.
    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    /// Sets the token that aborts pagination when cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the progress reporter.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Fetches every page of `query`.
    ///
    /// Never returns early with a bare error: failures are reported through
    /// [`FetchOutcome::error`] together with everything fetched before them.
    pub async fn fetch_all_pages(&self, query: &SpatialQuery) -> FetchOutcome {
        let label = self.client.label();
        let mut cursor = PaginationCursor::new(query.batch_size.max(1));
        let mut outcome = FetchOutcome::default();

        while !cursor.exhausted {
            if self.cancel.is_cancelled() {
                outcome.error = Some(FeatureServiceError::Cancelled);
                break;
            }

            let response = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Err(FeatureServiceError::Cancelled),
                result = self.client.query_page(query, cursor.offset) => result,
            };

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    log::warn!("[{label}] page at offset {} failed: {e}", cursor.offset);
                    outcome.error = Some(e);
                    break;
                }
            };
            outcome.pages += 1;

            if let Some(err) = response.service_error() {
                log::warn!(
                    "[{label}] service error at offset {}: {}",
                    cursor.offset,
                    err.message
                );
                outcome.error = Some(FeatureServiceError::Service {
                    code: err.code,
                    message: err.message,
                });
                break;
            }

            let exceeded = response.exceeded_transfer_limit();
            let returned = response.features.len();
            log::debug!(
                "[{label}] page {}: {returned} records at offset {} (exceeded={exceeded})",
                outcome.pages,
                cursor.offset
            );

            cursor.advance(returned, exceeded);
            outcome.features.extend(response.features);
            self.progress.inc(returned as u64);

            if outcome.features.len() >= self.max_records {
                let more = !cursor.exhausted || outcome.features.len() > self.max_records;
                if more {
                    log::warn!(
                        "[{label}] stopping at safety limit of {} records",
                        self.max_records
                    );
                    outcome.truncated = true;
                }
                outcome.features.truncate(self.max_records);
                cursor.exhaust();
            }

            if !cursor.exhausted
                && let Some(delay) = self.delay.duration()
            {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => {
                        outcome.error = Some(FeatureServiceError::Cancelled);
                        break;
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        log::debug!(
            "[{label}] fetch finished: {} records in {} pages",
            outcome.features.len(),
            outcome.pages
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use locator_feature_service_models::{FeatureServiceResponse, Point};
    use serde_json::json;

    use super::*;

    fn feature(id: usize) -> RawFeature {
        RawFeature {
            attributes: json!({ "OBJECTID": id }).as_object().cloned().unwrap(),
            geometry: Some(json!({ "x": -95.37, "y": 29.76 })),
        }
    }

    fn features(range: std::ops::Range<usize>) -> Vec<RawFeature> {
        range.map(feature).collect()
    }

    enum Page {
        Ok(FeatureServiceResponse),
        TransportError,
    }

    /// Serves canned pages in request order and records requested offsets.
    struct MockService {
        pages: Mutex<Vec<Page>>,
        offsets: Mutex<Vec<u64>>,
    }

    impl MockService {
        fn new(pages: Vec<Page>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().rev().collect()),
                offsets: Mutex::new(Vec::new()),
            }
        }

        fn offsets(&self) -> Vec<u64> {
            self.offsets.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeatureServiceClient for MockService {
        fn label(&self) -> &str {
            "mock"
        }

        async fn query_page(
            &self,
            _query: &SpatialQuery,
            offset: u64,
        ) -> Result<FeatureServiceResponse, FeatureServiceError> {
            self.offsets.lock().unwrap().push(offset);
            match self.pages.lock().unwrap().pop() {
                Some(Page::Ok(resp)) => Ok(resp),
                Some(Page::TransportError) => Err(FeatureServiceError::Status {
                    status: 503,
                    url: "mock://query".to_string(),
                }),
                None => Ok(FeatureServiceResponse::page(vec![], false)),
            }
        }
    }

    fn query(batch_size: u32) -> SpatialQuery {
        SpatialQuery::proximity(Point::new(29.76, -95.37), 1000.0, batch_size)
    }

    #[tokio::test]
    async fn concatenates_full_pages_and_stops_after_short_page() {
        let service = MockService::new(vec![
            Page::Ok(FeatureServiceResponse::page(features(0..3), false)),
            Page::Ok(FeatureServiceResponse::page(features(3..6), false)),
            Page::Ok(FeatureServiceResponse::page(features(6..8), false)),
            Page::Ok(FeatureServiceResponse::page(features(100..103), false)),
        ]);

        let outcome = PaginatedFeatureFetcher::new(&service)
            .fetch_all_pages(&query(3))
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.pages, 3);
        assert_eq!(outcome.features, features(0..8));
        assert_eq!(service.offsets(), vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn transfer_limit_continues_past_short_page() {
        let service = MockService::new(vec![
            Page::Ok(FeatureServiceResponse::page(features(0..2), true)),
            Page::Ok(FeatureServiceResponse::page(features(2..3), false)),
        ]);

        let outcome = PaginatedFeatureFetcher::new(&service)
            .fetch_all_pages(&query(10))
            .await;

        assert_eq!(outcome.features.len(), 3);
        assert_eq!(service.offsets(), vec![0, 2]);
    }

    #[tokio::test]
    async fn empty_first_page_is_normal_termination() {
        let service = MockService::new(vec![]);
        let outcome = PaginatedFeatureFetcher::new(&service)
            .fetch_all_pages(&query(10))
            .await;
        assert!(outcome.error.is_none());
        assert!(outcome.features.is_empty());
        assert_eq!(outcome.pages, 1);
    }

    #[tokio::test]
    async fn service_error_returns_partial_results() {
        let service = MockService::new(vec![
            Page::Ok(FeatureServiceResponse::page(features(0..2), false)),
            Page::Ok(FeatureServiceResponse::failed(500, "Unable to complete operation")),
        ]);

        let outcome = PaginatedFeatureFetcher::new(&service)
            .fetch_all_pages(&query(2))
            .await;

        assert_eq!(outcome.features.len(), 2);
        assert!(matches!(
            outcome.error,
            Some(FeatureServiceError::Service { code: Some(500), .. })
        ));
    }

    #[tokio::test]
    async fn transport_error_is_not_retried() {
        let service = MockService::new(vec![
            Page::Ok(FeatureServiceResponse::page(features(0..2), false)),
            Page::TransportError,
            Page::Ok(FeatureServiceResponse::page(features(2..3), false)),
        ]);

        let outcome = PaginatedFeatureFetcher::new(&service)
            .fetch_all_pages(&query(2))
            .await;

        assert!(outcome.error.as_ref().is_some_and(FeatureServiceError::is_transport));
        assert_eq!(service.offsets(), vec![0, 2]);
    }

    #[tokio::test]
    async fn safety_limit_stops_pagination() {
        let service = MockService::new(vec![
            Page::Ok(FeatureServiceResponse::page(features(0..4), true)),
            Page::Ok(FeatureServiceResponse::page(features(4..8), true)),
            Page::Ok(FeatureServiceResponse::page(features(8..12), true)),
        ]);

        let outcome = PaginatedFeatureFetcher::new(&service)
            .with_max_records(6)
            .fetch_all_pages(&query(4))
            .await;

        assert!(outcome.error.is_none());
        assert!(outcome.truncated);
        assert_eq!(outcome.features.len(), 6);
        assert_eq!(service.offsets(), vec![0, 4]);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_page() {
        let service = MockService::new(vec![Page::Ok(FeatureServiceResponse::page(
            features(0..2),
            false,
        ))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = PaginatedFeatureFetcher::new(&service)
            .with_cancellation(cancel)
            .fetch_all_pages(&query(2))
            .await;

        assert!(matches!(outcome.error, Some(FeatureServiceError::Cancelled)));
        assert!(service.offsets().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn page_delay_is_applied_between_pages() {
        let service = MockService::new(vec![
            Page::Ok(FeatureServiceResponse::page(features(0..2), false)),
            Page::Ok(FeatureServiceResponse::page(features(2..4), false)),
            Page::Ok(FeatureServiceResponse::page(features(4..5), false)),
        ]);

        let start = tokio::time::Instant::now();
        let outcome = PaginatedFeatureFetcher::new(&service)
            .with_delay(PageDelay::from_millis(250))
            .fetch_all_pages(&query(2))
            .await;

        assert_eq!(outcome.features.len(), 5);
        // Two gaps between three pages; no delay after the last one.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(750), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_during_page_delay_keeps_fetched_pages() {
        let service = MockService::new(vec![
            Page::Ok(FeatureServiceResponse::page(features(0..2), false)),
            Page::Ok(FeatureServiceResponse::page(features(2..4), false)),
        ]);
        let cancel = CancellationToken::new();
        let fetcher = PaginatedFeatureFetcher::new(&service)
            .with_delay(PageDelay::from_millis(500))
            .with_cancellation(cancel.clone());

        let start = tokio::time::Instant::now();
        let q = query(2);
        let (outcome, ()) = tokio::join!(fetcher.fetch_all_pages(&q), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        assert!(matches!(outcome.error, Some(FeatureServiceError::Cancelled)));
        assert_eq!(outcome.features, features(0..2));
        assert_eq!(outcome.pages, 1);
        assert_eq!(service.offsets(), vec![0]);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn zero_millis_means_no_delay() {
        assert_eq!(PageDelay::from_millis(0), PageDelay::None);
        assert_eq!(
            PageDelay::from_millis(5).duration(),
            Some(Duration::from_millis(5))
        );
    }
}
