#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and response types for `ArcGIS` `FeatureServer` / `MapServer`
//! `query` endpoints.
//!
//! [`SpatialQuery`] describes one point-geometry intersects query (with or
//! without a distance buffer) and renders the wire parameters for a given
//! page offset. [`FeatureServiceResponse`] is the subset of the JSON
//! response the fetcher cares about.

pub use locator_geometry_models::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default records requested per page.
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

/// A feature exactly as the service returned it.
///
/// Attributes are opaque to the resolver; geometry is parsed lazily by the
/// geometry engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    /// Attribute table row. `GeoJSON` responses call this `properties`.
    #[serde(default, alias = "properties")]
    pub attributes: Map<String, Value>,
    /// Esri JSON or `GeoJSON` geometry, if any.
    #[serde(default)]
    pub geometry: Option<Value>,
}

/// One page of a `query` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureServiceResponse {
    /// Present (and truthy) when the service rejected the request.
    #[serde(default)]
    pub error: Option<Value>,
    /// Features on this page.
    #[serde(default)]
    pub features: Vec<RawFeature>,
    /// `true` when more records exist beyond this page.
    #[serde(default, rename = "exceededTransferLimit")]
    pub exceeded_transfer_limit: bool,
    /// `GeoJSON` responses signal the transfer limit here instead.
    #[serde(default)]
    pub properties: Option<Value>,
}

/// A service-reported error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceErrorPayload {
    /// Error code, when the service supplies one.
    pub code: Option<i64>,
    /// Human-readable message (plus any `details`).
    pub message: String,
}

impl FeatureServiceResponse {
    /// A successful page.
    #[must_use]
    pub const fn page(features: Vec<RawFeature>, exceeded_transfer_limit: bool) -> Self {
        Self {
            error: None,
            features,
            exceeded_transfer_limit,
            properties: None,
        }
    }

    /// A page carrying a service error.
    #[must_use]
    pub fn failed(code: i64, message: &str) -> Self {
        Self {
            error: Some(serde_json::json!({ "code": code, "message": message })),
            ..Self::default()
        }
    }

    /// Returns the service error if the `error` field is truthy.
    ///
    /// `null`, `false`, `0`, `""` and `{}`/`[]` are not errors.
    #[must_use]
    pub fn service_error(&self) -> Option<ServiceErrorPayload> {
        let error = self.error.as_ref()?;
        match error {
            Value::Null | Value::Bool(false) => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(s) if s.is_empty() => None,
            Value::Array(a) if a.is_empty() => None,
            Value::Object(o) if o.is_empty() => None,
            Value::Object(o) => {
                let code = o.get("code").and_then(Value::as_i64);
                let mut message = o
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                if let Some(details) = o.get("details").and_then(Value::as_array) {
                    let details: Vec<&str> = details.iter().filter_map(Value::as_str).collect();
                    if !details.is_empty() {
                        message = format!("{message} ({})", details.join("; "));
                    }
                }
                Some(ServiceErrorPayload { code, message })
            }
            Value::String(s) => Some(ServiceErrorPayload {
                code: None,
                message: s.clone(),
            }),
            other => Some(ServiceErrorPayload {
                code: None,
                message: other.to_string(),
            }),
        }
    }

    /// Whether the service signalled that records remain beyond this page.
    #[must_use]
    pub fn exceeded_transfer_limit(&self) -> bool {
        self.exceeded_transfer_limit
            || self
                .properties
                .as_ref()
                .and_then(|p| p.get("exceededTransferLimit"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }
}

/// A point-geometry spatial-intersects query against one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialQuery {
    /// Query point (WGS84).
    pub point: Point,
    /// Buffer distance in meters. `None` for a pure containment query.
    pub distance_meters: Option<f64>,
    /// SQL `where` clause.
    pub where_clause: String,
    /// Comma-separated fields to return.
    pub out_fields: String,
    /// Records per page.
    pub batch_size: u32,
}

impl SpatialQuery {
    /// A containment query: intersects the bare point.
    #[must_use]
    pub fn containment(point: Point, batch_size: u32) -> Self {
        Self {
            point,
            distance_meters: None,
            where_clause: "1=1".to_string(),
            out_fields: "*".to_string(),
            batch_size,
        }
    }

    /// A proximity query: intersects the point buffered by `meters`.
    #[must_use]
    pub fn proximity(point: Point, meters: f64, batch_size: u32) -> Self {
        Self {
            distance_meters: Some(meters),
            ..Self::containment(point, batch_size)
        }
    }

    /// Overrides the `where` clause.
    #[must_use]
    pub fn with_where(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    /// Renders the query-string parameters for the page at `offset`.
    #[must_use]
    pub fn to_params(&self, offset: u64) -> Vec<(&'static str, String)> {
        let geometry = serde_json::json!({
            "x": self.point.lon,
            "y": self.point.lat,
            "spatialReference": { "wkid": 4326 },
        });

        let mut params = vec![
            ("f", "json".to_string()),
            ("where", self.where_clause.clone()),
            ("outFields", self.out_fields.clone()),
            ("geometry", geometry.to_string()),
            ("geometryType", "esriGeometryPoint".to_string()),
            ("spatialRel", "esriSpatialRelIntersects".to_string()),
        ];

        if let Some(meters) = self.distance_meters {
            params.push(("distance", meters.to_string()));
            params.push(("units", "esriSRUnit_Meter".to_string()));
        }

        params.extend([
            ("inSR", "4326".to_string()),
            ("outSR", "4326".to_string()),
            ("returnGeometry", "true".to_string()),
            ("resultRecordCount", self.batch_size.to_string()),
            ("resultOffset", offset.to_string()),
        ]);

        params
    }
}

/// Offset-based pagination state for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Offset of the next page to request.
    pub offset: u64,
    /// Records requested per page.
    pub batch_size: u32,
    /// Set once no further pages should be requested.
    pub exhausted: bool,
}

impl PaginationCursor {
    /// A cursor at offset zero.
    #[must_use]
    pub const fn new(batch_size: u32) -> Self {
        Self {
            offset: 0,
            batch_size,
            exhausted: false,
        }
    }

    /// Records a page of `returned` features and decides whether another
    /// page should follow.
    ///
    /// More data is signalled by `exceeded_transfer_limit` or by a full
    /// page. The offset advances by the number of records actually
    /// returned, since services silently cap pages at their own
    /// `maxRecordCount`.
    pub fn advance(&mut self, returned: usize, exceeded_transfer_limit: bool) {
        let returned = u64::try_from(returned).unwrap_or(u64::MAX);
        if returned == 0 {
            self.exhausted = true;
            return;
        }
        self.offset = self.offset.saturating_add(returned);
        let full_page = returned == u64::from(self.batch_size);
        self.exhausted = !(exceeded_transfer_limit || full_page);
    }

    /// Marks the cursor as finished.
    pub const fn exhaust(&mut self) {
        self.exhausted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_esri_page() {
        let body = json!({
            "features": [
                { "attributes": { "OBJECTID": 1 }, "geometry": { "x": -95.0, "y": 29.0 } },
                { "attributes": { "OBJECTID": 2 } }
            ],
            "exceededTransferLimit": true
        });
        let resp: FeatureServiceResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.features.len(), 2);
        assert!(resp.features[1].geometry.is_none());
        assert!(resp.exceeded_transfer_limit());
        assert!(resp.service_error().is_none());
    }

    #[test]
    fn deserializes_geojson_page() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "NAME": "A" }, "geometry": null }
            ],
            "properties": { "exceededTransferLimit": true }
        });
        let resp: FeatureServiceResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.features[0].attributes["NAME"], "A");
        assert!(resp.exceeded_transfer_limit());
    }

    #[test]
    fn service_error_truthiness() {
        let resp: FeatureServiceResponse = serde_json::from_value(json!({
            "error": { "code": 400, "message": "Invalid query", "details": ["bad geometry"] }
        }))
        .unwrap();
        let err = resp.service_error().unwrap();
        assert_eq!(err.code, Some(400));
        assert_eq!(err.message, "Invalid query (bad geometry)");

        for falsy in [json!(null), json!(false), json!(0), json!(""), json!({})] {
            let resp: FeatureServiceResponse =
                serde_json::from_value(json!({ "error": falsy })).unwrap();
            assert!(resp.service_error().is_none());
        }

        let resp: FeatureServiceResponse =
            serde_json::from_value(json!({ "error": "Token required" })).unwrap();
        assert_eq!(resp.service_error().unwrap().message, "Token required");
    }

    #[test]
    fn proximity_params_include_distance() {
        let q = SpatialQuery::proximity(Point::new(29.76, -95.37), 1609.344, 500);
        let params = q.to_params(1000);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("distance").as_deref(), Some("1609.344"));
        assert_eq!(get("units").as_deref(), Some("esriSRUnit_Meter"));
        assert_eq!(get("resultOffset").as_deref(), Some("1000"));
        assert_eq!(get("resultRecordCount").as_deref(), Some("500"));
        assert_eq!(get("where").as_deref(), Some("1=1"));
        let geometry: Value = serde_json::from_str(&get("geometry").unwrap()).unwrap();
        assert_eq!(geometry["x"], json!(-95.37));
        assert_eq!(geometry["spatialReference"]["wkid"], json!(4326));
    }

    #[test]
    fn containment_params_omit_distance() {
        let q = SpatialQuery::containment(Point::new(29.76, -95.37), DEFAULT_BATCH_SIZE);
        let params = q.to_params(0);
        assert!(params.iter().all(|(k, _)| *k != "distance" && *k != "units"));
    }

    #[test]
    fn cursor_advances_on_full_pages_and_transfer_limit() {
        let mut cursor = PaginationCursor::new(2);
        cursor.advance(2, false);
        assert_eq!(cursor.offset, 2);
        assert!(!cursor.exhausted);

        cursor.advance(1, true);
        assert_eq!(cursor.offset, 3);
        assert!(!cursor.exhausted);

        cursor.advance(1, false);
        assert!(cursor.exhausted);

        let mut empty = PaginationCursor::new(2);
        empty.advance(0, true);
        assert!(empty.exhausted);
        assert_eq!(empty.offset, 0);
    }
}
