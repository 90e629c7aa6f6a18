//! Vertex-mean centroid.

use locator_geometry_models::{Point, Ring};

/// Arithmetic mean of a ring's vertices.
///
/// Not area-weighted: this is a cheap stand-in location for ranking
/// polygons already known not to contain the query point. Use
/// [`crate::distance_point_to_polygon`] when accuracy matters. A repeated
/// closing vertex is ignored so explicitly closed rings don't pull the mean
/// toward their first vertex.
///
/// Returns `None` for an empty ring.
#[must_use]
pub fn centroid(ring: &Ring) -> Option<Point> {
    let points = match ring.points.as_slice() {
        [] => return None,
        [first, .., last] if first == last => &ring.points[..ring.points.len() - 1],
        all => all,
    };

    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let (lat_sum, lon_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));

    Some(Point::new(lat_sum / n, lon_sum / n))
}
