#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Containment & proximity resolution for a single layer.
//!
//! Given a point and a search radius, [`ContainmentProximityResolver`]
//! asks a feature service which features contain the point and which lie
//! within the radius, checks every answer against local geometry, and
//! returns one deduplicated list ranked containing-first, then by
//! ascending distance.

pub mod merge;
pub mod radius;
pub mod resolver;
pub mod schema;

use locator_feature_service::PageDelay;
use locator_feature_service_models::DEFAULT_BATCH_SIZE;

pub use merge::{merge_ranked, rank};
pub use radius::RadiusPolicy;
pub use resolver::ContainmentProximityResolver;

/// Errors returned by the resolver.
///
/// Service and network failures are not errors here: they degrade the
/// [`locator_resolver_models::Resolution`] and are reported as warnings.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The query violates the resolver's input contract.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// Description of what went wrong.
        message: String,
    },
}

/// Tuning knobs shared by every resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Records per page when the layer doesn't set its own.
    pub batch_size: u32,
    /// Pause between pages.
    pub page_delay: PageDelay,
    /// Safety ceiling per strategy.
    pub max_records: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            page_delay: PageDelay::None,
            max_records: locator_feature_service::DEFAULT_MAX_RECORDS,
        }
    }
}
