//! Coordinate normalization between WGS84 and Web Mercator.
//!
//! Queries always ask for `outSR=4326`, but some services ignore it or
//! report a different spatial reference. [`CoordinateNormalizer`] uses the
//! declared `wkid` when one is present and otherwise falls back to a range
//! check: any `|x| > 180` or `|y| > 90` cannot be degrees, so the pair is
//! treated as Web Mercator meters. Mercator values within ~180 m of the
//! origin are indistinguishable from degrees and are read as degrees.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use locator_geometry_models::{GeometryError, Point};

/// Sphere radius used by the Web Mercator projection, in meters.
pub const WEB_MERCATOR_RADIUS_METERS: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square.
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Spatial references the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialReference {
    /// Geographic WGS84 degrees (EPSG:4326).
    Wgs84,
    /// Spherical Web Mercator meters (EPSG:3857 and its Esri aliases).
    WebMercator,
}

impl SpatialReference {
    /// Maps an Esri / EPSG `wkid` to a known spatial reference.
    #[must_use]
    pub const fn from_wkid(wkid: i64) -> Option<Self> {
        match wkid {
            4326 => Some(Self::Wgs84),
            3857 | 102_100 | 102_113 | 900_913 => Some(Self::WebMercator),
            _ => None,
        }
    }

    /// The canonical `wkid` for this reference.
    #[must_use]
    pub const fn wkid(self) -> i64 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }
}

/// Converts Web Mercator meters to a WGS84 point.
#[must_use]
pub fn web_mercator_to_wgs84(x: f64, y: f64) -> Point {
    let lon = (x / WEB_MERCATOR_RADIUS_METERS).to_degrees();
    let lat = 2.0f64
        .mul_add((y / WEB_MERCATOR_RADIUS_METERS).exp().atan(), -FRAC_PI_2)
        .to_degrees();
    Point::new(lat, lon)
}

/// Converts a WGS84 point to Web Mercator meters as `(x, y)`.
///
/// Latitudes beyond [`WEB_MERCATOR_MAX_LAT`] are clamped.
#[must_use]
pub fn wgs84_to_web_mercator(point: Point) -> (f64, f64) {
    let lat = point
        .lat
        .clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT)
        .to_radians();
    let x = WEB_MERCATOR_RADIUS_METERS * point.lon.to_radians();
    let y = WEB_MERCATOR_RADIUS_METERS * (FRAC_PI_4 + lat / 2.0).tan().ln();
    (x, y)
}

/// Returns `true` if an `(x, y)` pair is out of range for degrees.
#[must_use]
pub fn looks_projected(x: f64, y: f64) -> bool {
    x.abs() > 180.0 || y.abs() > 90.0
}

/// Turns raw `(x, y)` pairs from a service into WGS84 points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinateNormalizer {
    declared: Option<SpatialReference>,
}

impl CoordinateNormalizer {
    /// A normalizer that infers the reference from each coordinate's range.
    #[must_use]
    pub const fn detect() -> Self {
        Self { declared: None }
    }

    /// A normalizer for a known spatial reference.
    #[must_use]
    pub const fn with_reference(reference: SpatialReference) -> Self {
        Self {
            declared: Some(reference),
        }
    }

    /// A normalizer for a service-reported `wkid`. Unknown or missing ids
    /// fall back to range detection.
    #[must_use]
    pub fn from_wkid(wkid: Option<i64>) -> Self {
        let declared = wkid.and_then(SpatialReference::from_wkid);
        if let (Some(wkid), None) = (wkid, declared) {
            log::debug!("Unrecognized wkid {wkid}, detecting projection from coordinate ranges");
        }
        Self { declared }
    }

    /// Converts one `(x, y)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Malformed`] if a coordinate is not finite or
    /// the converted point falls outside WGS84 ranges.
    pub fn normalize(&self, x: f64, y: f64) -> Result<Point, GeometryError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::malformed(format!(
                "non-finite coordinate ({x}, {y})"
            )));
        }

        let reference = self.declared.unwrap_or(if looks_projected(x, y) {
            SpatialReference::WebMercator
        } else {
            SpatialReference::Wgs84
        });

        let point = match reference {
            SpatialReference::Wgs84 => Point::from_xy(x, y),
            SpatialReference::WebMercator => web_mercator_to_wgs84(x, y),
        };

        if point.is_valid_wgs84() {
            Ok(point)
        } else {
            Err(GeometryError::malformed(format!(
                "coordinate ({x}, {y}) is outside WGS84 range after normalization"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mercator_round_trip_houston() {
        let houston = Point::new(29.76, -95.37);
        let (x, y) = wgs84_to_web_mercator(houston);
        assert!((x - -10_616_539.84).abs() < 0.01, "x = {x}");
        let back = web_mercator_to_wgs84(x, y);
        assert!((back.lat - houston.lat).abs() < 1e-9);
        assert!((back.lon - houston.lon).abs() < 1e-9);
    }

    #[test]
    fn detects_projected_values() {
        let normalizer = CoordinateNormalizer::detect();
        let p = normalizer.normalize(-10_616_539.84, 3_472_737.23).unwrap();
        assert!((p.lon - -95.37).abs() < 0.001);
        assert!((p.lat - 29.76).abs() < 0.001);

        let q = normalizer.normalize(-95.37, 29.76).unwrap();
        assert_eq!(q, Point::new(29.76, -95.37));
    }

    #[test]
    fn declared_reference_overrides_detection() {
        // A tiny mercator value would be read as degrees without a wkid.
        let normalizer = CoordinateNormalizer::from_wkid(Some(102_100));
        let p = normalizer.normalize(100.0, 100.0).unwrap();
        assert!(p.lon.abs() < 0.01);
        assert!(p.lat.abs() < 0.01);
    }

    #[test]
    fn unknown_wkid_falls_back_to_detection() {
        assert_eq!(
            CoordinateNormalizer::from_wkid(Some(2278)),
            CoordinateNormalizer::detect()
        );
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        let wgs = CoordinateNormalizer::with_reference(SpatialReference::Wgs84);
        assert!(wgs.normalize(-200.0, 10.0).is_err());
        assert!(wgs.normalize(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn wkid_aliases() {
        assert_eq!(SpatialReference::from_wkid(3857), Some(SpatialReference::WebMercator));
        assert_eq!(SpatialReference::from_wkid(4326), Some(SpatialReference::Wgs84));
        assert_eq!(SpatialReference::WebMercator.wkid(), 3857);
    }
}
