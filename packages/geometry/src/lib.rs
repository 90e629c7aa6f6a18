#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry engine for the containment & proximity resolver.
//!
//! Everything here is pure and synchronous: ray-casting point-in-polygon
//! with hole and multipart support, great-circle distances from a point to segments,
//! polylines and polygon boundaries, vertex centroids, and normalization of
//! projected (Web Mercator) coordinates back to WGS84. [`parse`] turns the
//! raw Esri JSON / `GeoJSON` geometry carried by service features into
//! [`FeatureGeometry`] values, and [`interop`] bridges those into the `geo`
//! crate's types.

pub mod centroid;
pub mod containment;
pub mod distance;
pub mod interop;
pub mod normalize;
pub mod parse;

pub use centroid::centroid;
pub use containment::{
    geometry_contains, point_in_multi_polygon, point_in_polygon, point_in_ring,
};
pub use distance::{
    EARTH_RADIUS_MILES, METERS_PER_MILE, distance_point_to_multi_polygon,
    distance_point_to_polygon, distance_point_to_polyline, distance_point_to_segment,
    distance_to_geometry, haversine_distance, meters_to_miles, miles_to_meters,
};
pub use locator_geometry_models::{
    FeatureGeometry, GeometryError, GeometryKind, MultiPolygon, Point, Polygon, Polyline, Ring,
};
