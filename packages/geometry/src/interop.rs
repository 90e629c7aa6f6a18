//! Conversions from the resolver's geometry types into `geo` types, for
//! callers that want to run `geo` algorithms (area, simplification,
//! `GeoJSON` export) over resolved features, plus a bounding-box quick
//! reject used before ray casting.

use geo::BoundingRect;
use locator_geometry_models::{FeatureGeometry, MultiPolygon, Point, Polygon, Polyline, Ring};

fn coord(p: Point) -> geo::Coord<f64> {
    geo::Coord { x: p.lon, y: p.lat }
}

fn line_string(points: &[Point]) -> geo::LineString<f64> {
    points.iter().copied().map(coord).collect()
}

/// Converts a point.
#[must_use]
pub fn to_geo_point(p: Point) -> geo::Point<f64> {
    geo::Point(coord(p))
}

/// Converts a polygon. `geo` closes the rings.
#[must_use]
pub fn to_geo_polygon(polygon: &Polygon) -> geo::Polygon<f64> {
    let exterior = polygon
        .exterior()
        .map_or_else(|| geo::LineString::new(vec![]), |r| line_string(&r.points));
    let interiors = polygon
        .holes()
        .iter()
        .map(|r: &Ring| line_string(&r.points))
        .collect();
    geo::Polygon::new(exterior, interiors)
}

/// Converts a multi-polygon, part by part.
#[must_use]
pub fn to_geo_multi_polygon(multi: &MultiPolygon) -> geo::MultiPolygon<f64> {
    geo::MultiPolygon::new(multi.polygons.iter().map(to_geo_polygon).collect())
}

/// Converts a polyline.
#[must_use]
pub fn to_geo_multi_line_string(polyline: &Polyline) -> geo::MultiLineString<f64> {
    geo::MultiLineString::new(polyline.paths.iter().map(|p| line_string(p)).collect())
}

/// Converts any feature geometry.
#[must_use]
pub fn to_geo_geometry(geometry: &FeatureGeometry) -> geo::Geometry<f64> {
    match geometry {
        FeatureGeometry::Point(p) => geo::Geometry::Point(to_geo_point(*p)),
        FeatureGeometry::Polyline(line) => {
            geo::Geometry::MultiLineString(to_geo_multi_line_string(line))
        }
        FeatureGeometry::Polygon(poly) => geo::Geometry::Polygon(to_geo_polygon(poly)),
        FeatureGeometry::MultiPolygon(multi) => {
            geo::Geometry::MultiPolygon(to_geo_multi_polygon(multi))
        }
    }
}

/// Axis-aligned bounding box as `(min, max)` points, or `None` for an empty
/// geometry.
#[must_use]
pub fn bounding_box(geometry: &FeatureGeometry) -> Option<(Point, Point)> {
    let rect = to_geo_geometry(geometry).bounding_rect()?;
    Some((
        Point::from_xy(rect.min().x, rect.min().y),
        Point::from_xy(rect.max().x, rect.max().y),
    ))
}

/// Quick reject: `false` when `point` is outside the geometry's bounding
/// box, so it cannot be contained. `true` says nothing about containment.
#[must_use]
pub fn bbox_may_contain(geometry: &FeatureGeometry, point: Point) -> bool {
    bounding_box(geometry).is_some_and(|(min, max)| {
        (min.lat..=max.lat).contains(&point.lat) && (min.lon..=max.lon).contains(&point.lon)
    })
}
