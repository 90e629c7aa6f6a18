//! Great-circle distances from a point to points, segments, polylines and
//! polygon boundaries.
//!
//! All distances are in statute miles and share [`EARTH_RADIUS_MILES`].
//! Segment projection happens in the planar lon/lat space, which is accurate
//! enough for the short segments feature services return; the final
//! distance to the projected point is always great-circle.

use locator_geometry_models::{FeatureGeometry, MultiPolygon, Point, Polygon, Polyline, Ring};

use crate::containment::geometry_contains;

/// Mean Earth radius in statute miles. Every distance in the workspace uses
/// this constant.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Meters in one statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Converts statute miles to meters.
#[must_use]
pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

/// Converts meters to statute miles.
#[must_use]
pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

/// Haversine great-circle distance between two points, in miles.
///
/// Symmetric in its arguments and exactly `0.0` for identical points.
#[must_use]
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    // abs() keeps the result bit-identical when the arguments are swapped
    let d_lat = (p2.lat - p1.lat).abs().to_radians();
    let d_lon = (p2.lon - p1.lon).abs().to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Distance in miles from `p` to the closest point of segment `a`–`b`.
///
/// The projection parameter is clamped to the segment, so a point whose
/// perpendicular foot falls outside `[a, b]` measures to the nearer
/// endpoint. A degenerate segment (`a == b`) measures to `a`.
#[must_use]
pub fn distance_point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.lon - a.lon;
    let dy = b.lat - a.lat;
    let len_sq = dx.mul_add(dx, dy * dy);

    if len_sq <= 0.0 {
        return haversine_distance(p, a);
    }

    let t = (p.lon - a.lon).mul_add(dx, (p.lat - a.lat) * dy) / len_sq;

    let closest = if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        Point::new(t.mul_add(dy, a.lat), t.mul_add(dx, a.lon))
    };

    haversine_distance(p, closest)
}

/// Minimum distance in miles from `p` to any segment of any path.
///
/// Single-vertex paths count as points. A polyline with no vertices is
/// infinitely far away.
#[must_use]
pub fn distance_point_to_polyline(p: Point, polyline: &Polyline) -> f64 {
    let lone_vertices = polyline
        .paths
        .iter()
        .filter_map(|path| match path.as_slice() {
            [only] => Some(haversine_distance(p, *only)),
            _ => None,
        });

    polyline
        .segments()
        .map(|(a, b)| distance_point_to_segment(p, a, b))
        .chain(lone_vertices)
        .fold(f64::INFINITY, f64::min)
}

/// Minimum distance in miles from `p` to the boundary of `polygon`.
///
/// Hole rings are boundaries too. This does not check containment; a point
/// deep inside the polygon still reports its distance to the nearest edge.
/// A polygon with no vertices is infinitely far away.
#[must_use]
pub fn distance_point_to_polygon(p: Point, polygon: &Polygon) -> f64 {
    polygon
        .rings
        .iter()
        .flat_map(Ring::edges)
        .map(|(a, b)| distance_point_to_segment(p, a, b))
        .fold(f64::INFINITY, f64::min)
}

/// Minimum distance in miles from `p` to the boundary of any part.
#[must_use]
pub fn distance_point_to_multi_polygon(p: Point, multi: &MultiPolygon) -> f64 {
    multi
        .polygons
        .iter()
        .map(|polygon| distance_point_to_polygon(p, polygon))
        .fold(f64::INFINITY, f64::min)
}

/// Distance in miles from `p` to a feature geometry of any kind.
///
/// Polygons that contain `p` are at distance `0.0`; otherwise the distance
/// is to the nearest boundary edge.
#[must_use]
pub fn distance_to_geometry(p: Point, geometry: &FeatureGeometry) -> f64 {
    if geometry_contains(p, geometry) {
        return 0.0;
    }

    match geometry {
        FeatureGeometry::Point(q) => haversine_distance(p, *q),
        FeatureGeometry::Polyline(line) => distance_point_to_polyline(p, line),
        FeatureGeometry::Polygon(poly) => distance_point_to_polygon(p, poly),
        FeatureGeometry::MultiPolygon(multi) => distance_point_to_multi_polygon(p, multi),
    }
}
