#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layer definitions, queries, and ranked results.
//!
//! A [`LayerDefinition`] is deserialized from TOML and says where a
//! dataset lives, what kind of geometry it serves, how far the resolver may
//! search it, and how its attributes map onto an id and display fields.
//! Resolving a [`LayerQuery`] against a layer produces a [`Resolution`]:
//! the ranked [`ResolvedFeature`] list plus any per-strategy warnings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use locator_geometry_models::{FeatureGeometry, GeometryKind, Point};

/// Default maximum search radius for layers that don't specify one.
pub const DEFAULT_MAX_RADIUS_MILES: f64 = 25.0;

/// A point-and-radius query against one layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerQuery {
    /// Query point.
    pub point: Point,
    /// Radius the caller asked for.
    pub radius_miles: f64,
    /// Largest radius the layer allows.
    pub max_radius_miles: f64,
}

impl LayerQuery {
    /// Creates a query.
    #[must_use]
    pub const fn new(point: Point, radius_miles: f64, max_radius_miles: f64) -> Self {
        Self {
            point,
            radius_miles,
            max_radius_miles,
        }
    }
}

/// One feature in the ranked output.
///
/// `is_containing` features always have `distance_miles == 0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFeature {
    /// Identifier used for deduplication. Features without one are never
    /// merged with each other.
    pub id: Option<String>,
    /// Parsed geometry.
    pub geometry: Option<FeatureGeometry>,
    /// Distance from the query point in miles.
    pub distance_miles: f64,
    /// Whether the query point lies inside this feature.
    pub is_containing: bool,
    /// Display fields produced by the layer's [`SchemaMapping`].
    pub fields: BTreeMap<String, String>,
    /// Raw attributes as returned by the service.
    pub attributes: Map<String, Value>,
}

impl ResolvedFeature {
    /// A feature that contains the query point.
    #[must_use]
    pub const fn containing(
        id: Option<String>,
        geometry: Option<FeatureGeometry>,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            geometry,
            distance_miles: 0.0,
            is_containing: true,
            fields: BTreeMap::new(),
            attributes,
        }
    }

    /// A feature near, but not containing, the query point.
    #[must_use]
    pub const fn nearby(
        id: Option<String>,
        geometry: Option<FeatureGeometry>,
        distance_miles: f64,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            geometry,
            distance_miles,
            is_containing: false,
            fields: BTreeMap::new(),
            attributes,
        }
    }

    /// Attaches display fields.
    #[must_use]
    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        self.fields = fields;
        self
    }
}

/// The two query strategies the resolver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStrategy {
    /// Point-intersects query, verified locally with point-in-polygon.
    Containment,
    /// Buffered point query, ranked by true distance.
    Proximity,
}

impl std::fmt::Display for QueryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Containment => "containment",
            Self::Proximity => "proximity",
        })
    }
}

/// A non-fatal problem encountered while resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveWarning {
    /// The strategy that failed.
    pub strategy: QueryStrategy,
    /// What went wrong.
    pub message: String,
    /// Number of features that strategy had fetched before failing. They
    /// are still included in the result.
    pub partial_features: usize,
}

/// The outcome of resolving one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    /// Layer the features came from.
    pub layer_id: String,
    /// Ranked features: containing first, then ascending distance.
    pub features: Vec<ResolvedFeature>,
    /// Strategies that were run.
    pub attempted: Vec<QueryStrategy>,
    /// Failures, one per failed strategy.
    pub warnings: Vec<ResolveWarning>,
    /// Set when a safety ceiling cut pagination short.
    pub truncated: bool,
    /// Features skipped because their geometry was missing or malformed.
    pub skipped_malformed: usize,
}

impl Resolution {
    /// Returns `true` if every attempted strategy failed.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.attempted.is_empty()
            && self
                .attempted
                .iter()
                .all(|s| self.warnings.iter().any(|w| w.strategy == *s))
    }

    /// Number of containing features.
    #[must_use]
    pub fn containing_count(&self) -> usize {
        self.features.iter().filter(|f| f.is_containing).count()
    }
}

/// Caller-supplied mapping from a dataset's attribute names to the
/// resolver's id and display fields.
///
/// Candidate lists are tried in order; the first attribute that is present
/// and non-empty wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMapping {
    /// Attributes that identify a feature (e.g. `["GlobalID", "OBJECTID"]`).
    #[serde(default)]
    pub id_fields: Vec<String>,
    /// Output field name -> candidate attribute names.
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
}

/// A queryable dataset, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDefinition {
    /// Unique layer identifier (e.g. `"us_wetlands"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Layer or `query` endpoint URL.
    pub url: String,
    /// Kind of geometry the layer serves.
    pub geometry: GeometryKind,
    /// Largest search radius this layer allows.
    #[serde(default = "default_max_radius")]
    pub max_radius_miles: f64,
    /// Records per page. Defaults to the fetcher's batch size.
    #[serde(default)]
    pub batch_size: Option<u32>,
    /// Optional SQL `where` clause applied to both strategies.
    #[serde(default, rename = "where")]
    pub where_clause: Option<String>,
    /// Attribute mapping.
    #[serde(default)]
    pub schema: SchemaMapping,
}

const fn default_max_radius() -> f64 {
    DEFAULT_MAX_RADIUS_MILES
}

impl LayerDefinition {
    /// Returns the layer identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Builds a query against this layer.
    #[must_use]
    pub const fn query(&self, point: Point, radius_miles: f64) -> LayerQuery {
        LayerQuery::new(point, radius_miles, self.max_radius_miles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_definition_from_toml_with_defaults() {
        let layer: LayerDefinition = toml::de::from_str(
            r#"
            id = "wells"
            name = "Water Wells"
            url = "https://example.com/arcgis/rest/services/Wells/FeatureServer/0"
            geometry = "point"

            [schema]
            id_fields = ["OBJECTID"]

            [schema.fields]
            name = ["WELL_NAME", "NAME"]
            "#,
        )
        .unwrap();

        assert_eq!(layer.geometry, GeometryKind::Point);
        assert!((layer.max_radius_miles - DEFAULT_MAX_RADIUS_MILES).abs() < f64::EPSILON);
        assert_eq!(layer.batch_size, None);
        assert_eq!(layer.schema.fields["name"], vec!["WELL_NAME", "NAME"]);

        let query = layer.query(Point::new(29.76, -95.37), 5.0);
        assert!((query.max_radius_miles - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn all_failed_requires_every_attempted_strategy_to_fail() {
        let warning = |strategy| ResolveWarning {
            strategy,
            message: "HTTP 503".to_string(),
            partial_features: 0,
        };

        let mut resolution = Resolution {
            attempted: vec![QueryStrategy::Containment, QueryStrategy::Proximity],
            warnings: vec![warning(QueryStrategy::Containment)],
            ..Resolution::default()
        };
        assert!(!resolution.all_failed());

        resolution.warnings.push(warning(QueryStrategy::Proximity));
        assert!(resolution.all_failed());

        assert!(!Resolution::default().all_failed());
    }

    #[test]
    fn containing_constructor_has_zero_distance() {
        let f = ResolvedFeature::containing(Some("1".to_string()), None, Map::new());
        assert!(f.is_containing);
        assert!(f.distance_miles.abs() < f64::EPSILON);
    }
}
