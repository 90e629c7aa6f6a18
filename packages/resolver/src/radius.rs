//! Search radius clamping.

use locator_resolver_models::LayerQuery;

/// Clamps caller-supplied radii to what a layer allows.
pub struct RadiusPolicy;

impl RadiusPolicy {
    /// `max(0, min(requested, max))`.
    #[must_use]
    pub fn clamp(requested: f64, max: f64) -> f64 {
        requested.min(max).max(0.0)
    }

    /// The effective radius for a query.
    #[must_use]
    pub fn effective_radius(query: &LayerQuery) -> f64 {
        Self::clamp(query.radius_miles, query.max_radius_miles)
    }

    /// Whether the proximity strategy should run at this radius. The
    /// containment strategy runs regardless.
    #[must_use]
    pub fn proximity_enabled(effective_radius: f64) -> bool {
        effective_radius > 0.0
    }
}
