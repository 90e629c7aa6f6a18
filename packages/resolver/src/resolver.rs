//! Runs the containment and proximity strategies against one layer and
//! merges what they return.
//!
//! The two strategies are independent: a failure in one is recorded as a
//! [`ResolveWarning`] and never discards what the other found. Every
//! feature the service returns is checked locally before it is kept.
//! Containment candidates must actually contain the point, and proximity
//! candidates must lie within the effective radius by true geodesic
//! distance.

use std::sync::Arc;

use locator_feature_service::progress::{ProgressCallback, null_progress};
use locator_feature_service::{
    FeatureServiceClient, FeatureServiceError, FetchOutcome, PaginatedFeatureFetcher,
};
use locator_feature_service_models::{RawFeature, SpatialQuery};
use locator_geometry::interop::bbox_may_contain;
use locator_geometry::parse::parse_geometry;
use locator_geometry::{distance_to_geometry, geometry_contains, miles_to_meters};
use locator_resolver_models::{
    LayerDefinition, LayerQuery, Point, QueryStrategy, Resolution, ResolveWarning,
    ResolvedFeature,
};
use tokio_util::sync::CancellationToken;

use crate::radius::RadiusPolicy;
use crate::{ResolveError, ResolverOptions, merge, schema};

/// What local verification made of one raw feature.
enum Verdict {
    Containing(ResolvedFeature),
    Nearby(ResolvedFeature),
    Outside,
    Malformed,
}

/// Resolves point queries against a single layer.
pub struct ContainmentProximityResolver<'a, C: FeatureServiceClient + ?Sized> {
    client: &'a C,
    layer: &'a LayerDefinition,
    options: ResolverOptions,
    cancel: CancellationToken,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a, C: FeatureServiceClient + ?Sized> ContainmentProximityResolver<'a, C> {
    /// A resolver with default options, a fresh token and no progress
    /// reporting.
    #[must_use]
    pub fn new(client: &'a C, layer: &'a LayerDefinition) -> Self {
        Self {
            client,
            layer,
            options: ResolverOptions::default(),
            cancel: CancellationToken::new(),
            progress: null_progress(),
        }
    }

    /// Sets batch size, page delay and safety ceiling.
    #[must_use]
    pub const fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the token that aborts in-flight pagination.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the progress reporter, incremented once per fetched record.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Resolves `radius_miles` around `point` using the layer's own maximum.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub async fn resolve_at(
        &self,
        point: Point,
        radius_miles: f64,
    ) -> Result<Resolution, ResolveError> {
        self.resolve(&self.layer.query(point, radius_miles)).await
    }

    /// Resolves `query` against the layer.
    ///
    /// Containment runs for polygon layers. Proximity runs when the
    /// clamped radius is positive. The returned features are deduplicated
    /// and ranked containing-first, then by ascending distance.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidQuery`] if the point is not a valid
    /// WGS84 coordinate or a radius is not finite. Service failures are not
    /// errors; they appear in [`Resolution::warnings`].
    pub async fn resolve(&self, query: &LayerQuery) -> Result<Resolution, ResolveError> {
        validate(query)?;

        let label = self.layer.id();
        let point = query.point;
        let effective = RadiusPolicy::effective_radius(query);
        let batch_size = self.layer.batch_size.unwrap_or(self.options.batch_size);

        let mut resolution = Resolution {
            layer_id: label.to_string(),
            ..Resolution::default()
        };
        let mut containing = Vec::new();
        let mut nearby = Vec::new();

        if self.layer.geometry.supports_containment() {
            log::debug!("[{label}] containment query at ({}, {})", point.lat, point.lon);
            let outcome = self
                .fetch(SpatialQuery::containment(point, batch_size))
                .await;
            self.absorb(
                QueryStrategy::Containment,
                outcome,
                point,
                None,
                &mut resolution,
                &mut containing,
                &mut nearby,
            );
        }

        if RadiusPolicy::proximity_enabled(effective) {
            log::debug!(
                "[{label}] proximity query at ({}, {}) within {effective} mi",
                point.lat,
                point.lon
            );
            let outcome = self
                .fetch(SpatialQuery::proximity(
                    point,
                    miles_to_meters(effective),
                    batch_size,
                ))
                .await;
            self.absorb(
                QueryStrategy::Proximity,
                outcome,
                point,
                Some(effective),
                &mut resolution,
                &mut containing,
                &mut nearby,
            );
        }

        resolution.features = merge::merge_ranked(containing, nearby);

        if resolution.all_failed() {
            log::error!("[{label}] every query strategy failed");
        }
        log::info!(
            "[{label}] {} features ({} containing, {} skipped)",
            resolution.features.len(),
            resolution.containing_count(),
            resolution.skipped_malformed
        );

        Ok(resolution)
    }

    async fn fetch(&self, query: SpatialQuery) -> FetchOutcome {
        let query = match &self.layer.where_clause {
            Some(where_clause) => query.with_where(where_clause.clone()),
            None => query,
        };

        PaginatedFeatureFetcher::new(self.client)
            .with_delay(self.options.page_delay)
            .with_max_records(self.options.max_records)
            .with_cancellation(self.cancel.clone())
            .with_progress(Arc::clone(&self.progress))
            .fetch_all_pages(&query)
            .await
    }

    /// Verifies one strategy's features and records its failure, if any.
    #[allow(clippy::too_many_arguments)]
    fn absorb(
        &self,
        strategy: QueryStrategy,
        outcome: FetchOutcome,
        point: Point,
        radius_miles: Option<f64>,
        resolution: &mut Resolution,
        containing: &mut Vec<ResolvedFeature>,
        nearby: &mut Vec<ResolvedFeature>,
    ) {
        let FetchOutcome {
            features,
            error,
            truncated,
            ..
        } = outcome;
        let fetched = features.len();

        resolution.attempted.push(strategy);
        resolution.truncated |= truncated;

        for raw in features {
            match self.verify(raw, point, radius_miles) {
                Verdict::Containing(feature) => containing.push(feature),
                Verdict::Nearby(feature) => nearby.push(feature),
                Verdict::Outside => {}
                Verdict::Malformed => resolution.skipped_malformed += 1,
            }
        }

        if let Some(error) = error {
            self.warn(resolution, strategy, &error, fetched);
        }
    }

    /// Checks a raw feature against local geometry.
    ///
    /// A polygon that contains the point is containing whichever strategy
    /// returned it. Otherwise the feature is nearby only when a radius is
    /// given and its distance is finite and within it.
    fn verify(&self, raw: RawFeature, point: Point, radius_miles: Option<f64>) -> Verdict {
        let label = self.layer.id();

        let geometry = match raw.geometry.as_ref().map(parse_geometry) {
            Some(Ok(geometry)) => geometry,
            Some(Err(e)) => {
                log::debug!("[{label}] skipping feature: {e}");
                return Verdict::Malformed;
            }
            None => {
                log::debug!("[{label}] skipping feature without geometry");
                return Verdict::Malformed;
            }
        };

        let id = schema::feature_id(&self.layer.schema, &raw.attributes);
        let fields = schema::display_fields(&self.layer.schema, &raw.attributes);

        if bbox_may_contain(&geometry, point) && geometry_contains(point, &geometry) {
            return Verdict::Containing(
                ResolvedFeature::containing(id, Some(geometry), raw.attributes)
                    .with_fields(fields),
            );
        }

        let Some(radius) = radius_miles else {
            log::debug!("[{label}] dropping containment candidate {id:?}: point is outside");
            return Verdict::Outside;
        };

        let distance = distance_to_geometry(point, &geometry);
        if distance.is_finite() && distance <= radius {
            Verdict::Nearby(
                ResolvedFeature::nearby(id, Some(geometry), distance, raw.attributes)
                    .with_fields(fields),
            )
        } else {
            Verdict::Outside
        }
    }

    fn warn(
        &self,
        resolution: &mut Resolution,
        strategy: QueryStrategy,
        error: &FeatureServiceError,
        partial_features: usize,
    ) {
        log::warn!(
            "[{}] {strategy} query failed after {partial_features} features: {error}",
            self.layer.id()
        );
        resolution.warnings.push(ResolveWarning {
            strategy,
            message: error.to_string(),
            partial_features,
        });
    }
}

fn validate(query: &LayerQuery) -> Result<(), ResolveError> {
    let invalid = |message: String| Err(ResolveError::InvalidQuery { message });

    if !query.point.is_valid_wgs84() {
        return invalid(format!(
            "point ({}, {}) is not a valid WGS84 coordinate",
            query.point.lat, query.point.lon
        ));
    }
    if !query.radius_miles.is_finite() {
        return invalid(format!("radius {} is not finite", query.radius_miles));
    }
    if !query.max_radius_miles.is_finite() || query.max_radius_miles < 0.0 {
        return invalid(format!(
            "maximum radius {} must be finite and non-negative",
            query.max_radius_miles
        ));
    }
    Ok(())
}
