//! Deduplication and ranking of resolved features.

use std::collections::BTreeSet;

use locator_resolver_models::ResolvedFeature;

/// Sorts containing features first, then by ascending distance.
///
/// The sort is stable, so features at equal distance keep the order the
/// service returned them in.
pub fn rank(features: &mut [ResolvedFeature]) {
    features.sort_by(|a, b| {
        b.is_containing
            .cmp(&a.is_containing)
            .then_with(|| a.distance_miles.total_cmp(&b.distance_miles))
    });
}

/// Merges the output of both strategies into one ranked, deduplicated list.
///
/// When an id appears more than once the best-ranked record is kept, so a
/// containing record always wins over a nearby one for the same feature.
/// Features without an id are never considered duplicates.
#[must_use]
pub fn merge_ranked(
    containing: Vec<ResolvedFeature>,
    nearby: Vec<ResolvedFeature>,
) -> Vec<ResolvedFeature> {
    let mut features = containing;
    features.extend(nearby);
    rank(&mut features);

    let mut seen = BTreeSet::new();
    features.retain(|feature| {
        feature
            .id
            .as_ref()
            .is_none_or(|id| seen.insert(id.clone()))
    });
    features
}
