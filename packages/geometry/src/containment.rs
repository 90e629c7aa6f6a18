//! Ray-casting point-in-polygon.
//!
//! A horizontal ray is cast from the query point toward `+x` and the number
//! of ring edges it crosses is counted; an odd count means inside. Points
//! exactly on an edge or vertex land on one side or the other depending on
//! floating-point rounding, but the answer is deterministic for the same
//! input.

use locator_geometry_models::{FeatureGeometry, MultiPolygon, Point, Polygon, Ring};

/// Returns `true` if `point` lies inside `ring`.
///
/// Rings with fewer than three vertices enclose nothing.
#[must_use]
pub fn point_in_ring(point: Point, ring: &Ring) -> bool {
    if ring.len() < Ring::MIN_VERTICES {
        return false;
    }

    let x = point.lon;
    let y = point.lat;
    let mut inside = false;

    for (pi, pj) in ring.edges() {
        let (xi, yi) = (pi.lon, pi.lat);
        let (xj, yj) = (pj.lon, pj.lat);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
    }

    inside
}

/// Returns `true` if `point` is inside the polygon's outer ring and inside
/// none of its holes.
#[must_use]
pub fn point_in_polygon(point: Point, polygon: &Polygon) -> bool {
    let Some(exterior) = polygon.exterior() else {
        return false;
    };

    if !point_in_ring(point, exterior) {
        return false;
    }

    !polygon.holes().iter().any(|hole| point_in_ring(point, hole))
}

/// Returns `true` if any part of `multi` contains `point`.
#[must_use]
pub fn point_in_multi_polygon(point: Point, multi: &MultiPolygon) -> bool {
    multi
        .polygons
        .iter()
        .any(|polygon| point_in_polygon(point, polygon))
}

/// Containment for any feature geometry. Points and polylines contain
/// nothing.
#[must_use]
pub fn geometry_contains(point: Point, geometry: &FeatureGeometry) -> bool {
    match geometry {
        FeatureGeometry::Point(_) | FeatureGeometry::Polyline(_) => false,
        FeatureGeometry::Polygon(polygon) => point_in_polygon(point, polygon),
        FeatureGeometry::MultiPolygon(multi) => point_in_multi_polygon(point, multi),
    }
}
