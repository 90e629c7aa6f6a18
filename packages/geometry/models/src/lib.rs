#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core geometry types shared by the geometry engine, the feature service
//! fetcher, and the resolver.
//!
//! Coordinates are WGS84 degrees. Source services use `[x, y]` ordering
//! (`x` = longitude, `y` = latitude); these types always name the axes
//! explicitly so the two conventions never get mixed up.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or validating a geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The geometry is missing, has too few vertices for its kind, or
    /// contains a non-finite coordinate.
    #[error("Malformed geometry: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },
}

impl GeometryError {
    /// Shorthand for [`GeometryError::Malformed`].
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude, `-90..=90`.
    pub lat: f64,
    /// Longitude, `-180..=180`.
    pub lon: f64,
}

impl Point {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a point from a source-convention `[x, y]` pair.
    #[must_use]
    pub const fn from_xy(x: f64, y: f64) -> Self {
        Self { lat: y, lon: x }
    }

    /// Returns `true` if both coordinates are finite and inside the WGS84
    /// degree ranges.
    #[must_use]
    pub fn is_valid_wgs84(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A closed ring of vertices. The closing vertex does not need to repeat
/// the first one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ring {
    /// Ring vertices in order.
    pub points: Vec<Point>,
}

impl Ring {
    /// Minimum vertex count for a ring that encloses an area.
    pub const MIN_VERTICES: usize = 3;

    /// Creates a ring from its vertices.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Iterates over the ring's edges as `(current, previous)` vertex pairs,
    /// including the implicit closing edge from the last vertex back to the
    /// first.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| {
            let j = if i == 0 { n - 1 } else { i - 1 };
            (self.points[i], self.points[j])
        })
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the ring has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace signed area in square degrees, with `x` = longitude and
    /// `y` = latitude. Positive for counter-clockwise rings, negative for
    /// clockwise ones.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        self.edges()
            .map(|(current, previous)| {
                previous
                    .lon
                    .mul_add(current.lat, -(current.lon * previous.lat))
            })
            .sum::<f64>()
            / 2.0
    }

    /// Returns `true` for clockwise winding, which Esri uses for outer
    /// rings.
    #[must_use]
    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }
}

impl From<Vec<Point>> for Ring {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

/// A polygon: `rings[0]` is the outer boundary, the remaining rings are
/// holes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Outer ring followed by hole rings.
    pub rings: Vec<Ring>,
}

impl Polygon {
    /// Creates a polygon from its rings.
    #[must_use]
    pub const fn new(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    /// The outer boundary, if any.
    #[must_use]
    pub fn exterior(&self) -> Option<&Ring> {
        self.rings.first()
    }

    /// The hole rings.
    #[must_use]
    pub fn holes(&self) -> &[Ring] {
        self.rings.get(1..).unwrap_or_default()
    }
}

/// Several disjoint polygons forming one feature, such as a wetland split
/// by a road.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPolygon {
    /// The parts, each with its own outer ring and holes.
    pub polygons: Vec<Polygon>,
}

impl MultiPolygon {
    /// Creates a multi-polygon from its parts.
    #[must_use]
    pub const fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }
}

/// A polyline made of one or more paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    /// Each path is an ordered sequence of vertices.
    pub paths: Vec<Vec<Point>>,
}

impl Polyline {
    /// Minimum vertex count for a path that forms a segment.
    pub const MIN_PATH_VERTICES: usize = 2;

    /// Creates a polyline from its paths.
    #[must_use]
    pub const fn new(paths: Vec<Vec<Point>>) -> Self {
        Self { paths }
    }

    /// Iterates over every segment of every path.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.paths
            .iter()
            .flat_map(|path| path.windows(2).map(|w| (w[0], w[1])))
    }
}

/// The kind of geometry a layer serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// Point features (wells, stations).
    Point,
    /// Line features (streams, pipelines).
    Polyline,
    /// Area features (wetlands, fire perimeters).
    Polygon,
}

impl GeometryKind {
    /// Returns `true` if a point can lie inside features of this kind.
    #[must_use]
    pub const fn supports_containment(self) -> bool {
        matches!(self, Self::Polygon)
    }
}

impl std::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Point => "point",
            Self::Polyline => "polyline",
            Self::Polygon => "polygon",
        })
    }
}

/// A parsed feature geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureGeometry {
    /// A single position.
    Point(Point),
    /// One or more paths.
    Polyline(Polyline),
    /// Outer ring plus holes.
    Polygon(Polygon),
    /// Several polygons.
    MultiPolygon(MultiPolygon),
}

impl FeatureGeometry {
    /// Returns the kind of this geometry.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) => GeometryKind::Point,
            Self::Polyline(_) => GeometryKind::Polyline,
            Self::Polygon(_) | Self::MultiPolygon(_) => GeometryKind::Polygon,
        }
    }

    /// Iterates over every vertex in the geometry.
    pub fn vertices(&self) -> Box<dyn Iterator<Item = &Point> + '_> {
        match self {
            Self::Point(p) => Box::new(std::iter::once(p)),
            Self::Polyline(line) => Box::new(line.paths.iter().flatten()),
            Self::Polygon(poly) => Box::new(poly.rings.iter().flat_map(|r| r.points.iter())),
            Self::MultiPolygon(multi) => Box::new(
                multi
                    .polygons
                    .iter()
                    .flat_map(|poly| poly.rings.iter().flat_map(|r| r.points.iter())),
            ),
        }
    }

    /// Checks the minimum vertex counts for the geometry's kind and that
    /// every coordinate is finite.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Malformed`] if a polygon has no rings or a
    /// ring with fewer than [`Ring::MIN_VERTICES`] vertices, a multi-polygon
    /// has no parts or an invalid part, a polyline has
    /// no paths or a path with fewer than [`Polyline::MIN_PATH_VERTICES`]
    /// vertices, or any coordinate is NaN or infinite.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Self::Point(_) => {}
            Self::Polyline(line) => {
                if line.paths.is_empty() {
                    return Err(GeometryError::malformed("polyline has no paths"));
                }
                if let Some(path) = line
                    .paths
                    .iter()
                    .find(|p| p.len() < Polyline::MIN_PATH_VERTICES)
                {
                    return Err(GeometryError::malformed(format!(
                        "polyline path has {} vertices, need at least {}",
                        path.len(),
                        Polyline::MIN_PATH_VERTICES
                    )));
                }
            }
            Self::Polygon(poly) => validate_polygon(poly)?,
            Self::MultiPolygon(multi) => {
                if multi.polygons.is_empty() {
                    return Err(GeometryError::malformed("multipolygon has no parts"));
                }
                for poly in &multi.polygons {
                    validate_polygon(poly)?;
                }
            }
        }

        if self
            .vertices()
            .any(|p| !p.lat.is_finite() || !p.lon.is_finite())
        {
            return Err(GeometryError::malformed("non-finite coordinate"));
        }

        Ok(())
    }
}

fn validate_polygon(poly: &Polygon) -> Result<(), GeometryError> {
    if poly.rings.is_empty() {
        return Err(GeometryError::malformed("polygon has no rings"));
    }
    if let Some(ring) = poly.rings.iter().find(|r| r.len() < Ring::MIN_VERTICES) {
        return Err(GeometryError::malformed(format!(
            "polygon ring has {} vertices, need at least {}",
            ring.len(),
            Ring::MIN_VERTICES
        )));
    }
    Ok(())
}
