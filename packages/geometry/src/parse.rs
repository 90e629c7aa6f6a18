//! Parses raw feature geometry into [`FeatureGeometry`].
//!
//! Accepts Esri JSON (`{ "x", "y" }`, `{ "rings" }`, `{ "paths" }`) as
//! returned by `f=json` queries and `GeoJSON` (`Point`, `LineString`,
//! `MultiLineString`, `Polygon`, `MultiPolygon`) as returned by `f=geojson`
//! queries. Esri rings are grouped into polygons by winding: clockwise rings
//! are outer boundaries, counter-clockwise rings are holes. Every
//! coordinate goes through a [`CoordinateNormalizer`] chosen from the
//! geometry's `spatialReference`, and the result is validated before it is
//! handed back.

use locator_geometry_models::{
    FeatureGeometry, GeometryError, MultiPolygon, Point, Polygon, Polyline, Ring,
};
use serde_json::Value;

use crate::containment::point_in_ring;
use crate::normalize::CoordinateNormalizer;

/// Parses and validates one feature geometry.
///
/// # Errors
///
/// Returns [`GeometryError::Malformed`] if the geometry is null, of an
/// unsupported shape, has non-numeric coordinates, or fails
/// [`FeatureGeometry::validate`].
pub fn parse_geometry(value: &Value) -> Result<FeatureGeometry, GeometryError> {
    if value.is_null() {
        return Err(GeometryError::malformed("missing geometry"));
    }

    let normalizer = CoordinateNormalizer::from_wkid(declared_wkid(value));

    let geometry = if let Some(kind) = value.get("type").and_then(Value::as_str) {
        parse_geojson(kind, value, &normalizer)?
    } else {
        parse_esri(value, &normalizer)?
    };

    geometry.validate()?;
    Ok(geometry)
}

/// Reads `spatialReference.latestWkid`, falling back to `wkid`.
fn declared_wkid(value: &Value) -> Option<i64> {
    let sr = value.get("spatialReference")?;
    sr.get("latestWkid")
        .and_then(Value::as_i64)
        .or_else(|| sr.get("wkid").and_then(Value::as_i64))
}

fn parse_esri(
    value: &Value,
    normalizer: &CoordinateNormalizer,
) -> Result<FeatureGeometry, GeometryError> {
    if let Some(rings) = value.get("rings") {
        return Ok(group_esri_rings(
            parse_point_lists(rings, normalizer)?
                .into_iter()
                .map(Ring::new)
                .collect(),
        ));
    }

    if let Some(paths) = value.get("paths") {
        return Ok(FeatureGeometry::Polyline(Polyline::new(parse_point_lists(
            paths, normalizer,
        )?)));
    }

    if let (Some(x), Some(y)) = (value.get("x"), value.get("y")) {
        let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) else {
            return Err(GeometryError::malformed("point x/y are not numbers"));
        };
        return Ok(FeatureGeometry::Point(normalizer.normalize(x, y)?));
    }

    Err(GeometryError::malformed(
        "unrecognized Esri geometry (expected x/y, rings, or paths)",
    ))
}

fn parse_geojson(
    kind: &str,
    value: &Value,
    normalizer: &CoordinateNormalizer,
) -> Result<FeatureGeometry, GeometryError> {
    let coordinates = value
        .get("coordinates")
        .ok_or_else(|| GeometryError::malformed(format!("{kind} has no coordinates")))?;

    match kind {
        "Point" => Ok(FeatureGeometry::Point(parse_position(
            coordinates,
            normalizer,
        )?)),
        "LineString" => Ok(FeatureGeometry::Polyline(Polyline::new(vec![
            parse_point_list(coordinates, normalizer)?,
        ]))),
        "MultiLineString" => Ok(FeatureGeometry::Polyline(Polyline::new(
            parse_point_lists(coordinates, normalizer)?,
        ))),
        "Polygon" => Ok(FeatureGeometry::Polygon(parse_rings(
            coordinates,
            normalizer,
        )?)),
        "MultiPolygon" => Ok(FeatureGeometry::MultiPolygon(MultiPolygon::new(
            coordinates
                .as_array()
                .ok_or_else(|| GeometryError::malformed("expected an array of polygons"))?
                .iter()
                .map(|polygon| parse_rings(polygon, normalizer))
                .collect::<Result<_, _>>()?,
        ))),
        other => Err(GeometryError::malformed(format!(
            "unsupported GeoJSON geometry type '{other}'"
        ))),
    }
}

/// Groups Esri rings into polygons. Each clockwise ring starts a polygon;
/// each counter-clockwise ring becomes a hole of the smallest outer ring
/// around its first vertex. One outer ring yields a plain polygon, several
/// yield a multi-polygon.
///
/// Rings that are too short are kept in order so validation rejects them,
/// and input with no clockwise ring at all is read the `GeoJSON` way:
/// first ring outer, the rest holes.
fn group_esri_rings(rings: Vec<Ring>) -> FeatureGeometry {
    if rings.iter().any(|r| r.len() < Ring::MIN_VERTICES) || !rings.iter().any(Ring::is_clockwise)
    {
        return FeatureGeometry::Polygon(Polygon::new(rings));
    }

    let (outers, holes): (Vec<Ring>, Vec<Ring>) = rings.into_iter().partition(Ring::is_clockwise);
    let mut polygons: Vec<Polygon> = outers.into_iter().map(|r| Polygon::new(vec![r])).collect();

    for hole in holes {
        let owner = polygons
            .iter_mut()
            .filter(|polygon| {
                polygon
                    .exterior()
                    .is_some_and(|outer| point_in_ring(hole.points[0], outer))
            })
            .min_by(|a, b| exterior_area(a).total_cmp(&exterior_area(b)));

        match owner {
            Some(polygon) => polygon.rings.push(hole),
            None => log::debug!(
                "Dropping hole ring starting at ({}, {}): no outer ring contains it",
                hole.points[0].lon,
                hole.points[0].lat
            ),
        }
    }

    if polygons.len() == 1 {
        FeatureGeometry::Polygon(polygons.remove(0))
    } else {
        FeatureGeometry::MultiPolygon(MultiPolygon::new(polygons))
    }
}

fn exterior_area(polygon: &Polygon) -> f64 {
    polygon.exterior().map_or(0.0, |r| r.signed_area().abs())
}

fn parse_rings(value: &Value, normalizer: &CoordinateNormalizer) -> Result<Polygon, GeometryError> {
    Ok(Polygon::new(
        parse_point_lists(value, normalizer)?
            .into_iter()
            .map(Ring::new)
            .collect(),
    ))
}

fn parse_point_lists(
    value: &Value,
    normalizer: &CoordinateNormalizer,
) -> Result<Vec<Vec<Point>>, GeometryError> {
    value
        .as_array()
        .ok_or_else(|| GeometryError::malformed("expected an array of coordinate lists"))?
        .iter()
        .map(|list| parse_point_list(list, normalizer))
        .collect()
}

fn parse_point_list(
    value: &Value,
    normalizer: &CoordinateNormalizer,
) -> Result<Vec<Point>, GeometryError> {
    value
        .as_array()
        .ok_or_else(|| GeometryError::malformed("expected an array of positions"))?
        .iter()
        .map(|pos| parse_position(pos, normalizer))
        .collect()
}

/// Parses an `[x, y, ...]` position. Extra ordinates (z, m) are ignored.
fn parse_position(value: &Value, normalizer: &CoordinateNormalizer) -> Result<Point, GeometryError> {
    match value.as_array().map(Vec::as_slice) {
        Some([x, y, ..]) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => normalizer.normalize(x, y),
            _ => Err(GeometryError::malformed("position has non-numeric ordinates")),
        },
        _ => Err(GeometryError::malformed(format!(
            "expected [x, y] position, got {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containment::{geometry_contains, point_in_polygon};
    use locator_geometry_models::GeometryKind;
    use serde_json::json;

    #[test]
    fn parses_esri_polygon_with_hole() {
        let geom = json!({
            "rings": [
                [[0.0, 0.0], [0.0, 10.0], [10.0, 10.0], [10.0, 0.0], [0.0, 0.0]],
                [[4.0, 4.0], [6.0, 4.0], [6.0, 6.0], [4.0, 6.0], [4.0, 4.0]]
            ],
            "spatialReference": { "wkid": 4326 }
        });
        let FeatureGeometry::Polygon(poly) = parse_geometry(&geom).unwrap() else {
            panic!("expected polygon");
        };
        assert_eq!(poly.rings.len(), 2);
        assert_eq!(poly.holes().len(), 1);
        assert_eq!(poly.rings[0].points[1], Point::new(10.0, 0.0));
        assert!(!point_in_polygon(Point::from_xy(5.0, 5.0), &poly));
        assert!(point_in_polygon(Point::from_xy(2.0, 2.0), &poly));
    }

    #[test]
    fn esri_rings_with_several_outer_boundaries_become_a_multipolygon() {
        let geom = json!({
            "rings": [
                [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
                [[5.0, 5.0], [5.0, 6.0], [6.0, 6.0], [6.0, 5.0], [5.0, 5.0]]
            ]
        });
        let geometry = parse_geometry(&geom).unwrap();
        let FeatureGeometry::MultiPolygon(multi) = &geometry else {
            panic!("expected multipolygon, got {geometry:?}");
        };
        assert_eq!(multi.polygons.len(), 2);
        assert!(geometry_contains(Point::from_xy(5.5, 5.5), &geometry));
        assert!(geometry_contains(Point::from_xy(0.5, 0.5), &geometry));
        assert!(!geometry_contains(Point::from_xy(3.0, 3.0), &geometry));
    }

    #[test]
    fn esri_holes_attach_to_the_part_around_them() {
        // Second part has a hole; it is listed after both outer rings.
        let geom = json!({
            "rings": [
                [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
                [[10.0, 10.0], [10.0, 20.0], [20.0, 20.0], [20.0, 10.0], [10.0, 10.0]],
                [[14.0, 14.0], [16.0, 14.0], [16.0, 16.0], [14.0, 16.0], [14.0, 14.0]],
                [[50.0, 50.0], [51.0, 50.0], [51.0, 51.0], [50.0, 51.0], [50.0, 50.0]]
            ]
        });
        let geometry = parse_geometry(&geom).unwrap();
        let FeatureGeometry::MultiPolygon(multi) = &geometry else {
            panic!("expected multipolygon, got {geometry:?}");
        };
        assert_eq!(multi.polygons[0].holes().len(), 0);
        assert_eq!(multi.polygons[1].holes().len(), 1);
        assert!(!geometry_contains(Point::from_xy(15.0, 15.0), &geometry));
        assert!(geometry_contains(Point::from_xy(12.0, 12.0), &geometry));
        // The hole outside every outer ring is dropped.
        assert_eq!(geometry.vertices().count(), 15);
    }

    #[test]
    fn parses_geojson_multipolygon() {
        let geom = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]],
                [
                    [[5.0, 5.0], [9.0, 5.0], [9.0, 9.0], [5.0, 9.0], [5.0, 5.0]],
                    [[6.0, 6.0], [6.0, 8.0], [8.0, 8.0], [8.0, 6.0], [6.0, 6.0]]
                ]
            ]
        });
        let geometry = parse_geometry(&geom).unwrap();
        let FeatureGeometry::MultiPolygon(multi) = &geometry else {
            panic!("expected multipolygon, got {geometry:?}");
        };
        assert_eq!(multi.polygons.len(), 2);
        assert_eq!(multi.polygons[1].holes().len(), 1);
        assert!(geometry_contains(Point::from_xy(5.5, 5.5), &geometry));
        assert!(!geometry_contains(Point::from_xy(7.0, 7.0), &geometry));
        assert_eq!(geometry.kind(), GeometryKind::Polygon);
    }

    #[test]
    fn parses_esri_point_in_web_mercator() {
        let geom = json!({
            "x": -10_616_539.84,
            "y": 3_472_737.23,
            "spatialReference": { "wkid": 102_100, "latestWkid": 3857 }
        });
        let FeatureGeometry::Point(p) = parse_geometry(&geom).unwrap() else {
            panic!("expected point");
        };
        assert!((p.lat - 29.76).abs() < 0.001);
        assert!((p.lon - -95.37).abs() < 0.001);
    }

    #[test]
    fn parses_esri_polyline() {
        let geom = json!({ "paths": [[[-95.4, 29.7], [-95.3, 29.8]], [[-95.0, 29.0], [-95.1, 29.1]]] });
        let FeatureGeometry::Polyline(line) = parse_geometry(&geom).unwrap() else {
            panic!("expected polyline");
        };
        assert_eq!(line.paths.len(), 2);
    }

    #[test]
    fn parses_geojson_kinds() {
        let point = json!({ "type": "Point", "coordinates": [-95.37, 29.76, 12.0] });
        assert_eq!(
            parse_geometry(&point).unwrap(),
            FeatureGeometry::Point(Point::new(29.76, -95.37))
        );

        let line = json!({ "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] });
        assert!(matches!(
            parse_geometry(&line).unwrap(),
            FeatureGeometry::Polyline(_)
        ));

        let poly = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        assert!(matches!(
            parse_geometry(&poly).unwrap(),
            FeatureGeometry::Polygon(_)
        ));
    }

    #[test]
    fn rejects_malformed_geometry() {
        assert!(parse_geometry(&Value::Null).is_err());
        assert!(parse_geometry(&json!({ "rings": [[[0.0, 0.0], [1.0, 1.0]]] })).is_err());
        assert!(parse_geometry(&json!({ "paths": [[[0.0, 0.0]]] })).is_err());
        assert!(parse_geometry(&json!({ "x": "a", "y": 1.0 })).is_err());
        assert!(parse_geometry(&json!({ "points": [[0.0, 0.0]] })).is_err());
        assert!(parse_geometry(&json!({ "type": "MultiPolygon", "coordinates": [] })).is_err());
        assert!(parse_geometry(&json!({ "type": "GeometryCollection", "coordinates": [] })).is_err());
    }
}
