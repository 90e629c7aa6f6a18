//! Renders resolutions for the terminal.

use std::fmt::Write as _;

use locator_resolver_models::{LayerDefinition, Resolution, ResolvedFeature};
use serde::Serialize;

/// Output format for `resolve`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table per layer.
    #[default]
    Table,
    /// Pretty-printed JSON array of resolutions.
    Json,
}

/// One layer's outcome as written to JSON.
#[derive(Serialize)]
struct LayerReport<'a> {
    name: &'a str,
    #[serde(flatten)]
    resolution: &'a Resolution,
}

/// Renders every layer's resolution in `format`.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if JSON serialization fails.
pub fn render(
    format: OutputFormat,
    results: &[(LayerDefinition, Resolution)],
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Table => Ok(render_table(results)),
        OutputFormat::Json => {
            let reports: Vec<LayerReport<'_>> = results
                .iter()
                .map(|(layer, resolution)| LayerReport {
                    name: &layer.name,
                    resolution,
                })
                .collect();
            serde_json::to_string_pretty(&reports)
        }
    }
}

/// Lists layers, one per line: id, geometry kind, maximum radius, name.
#[must_use]
pub fn render_layers(layers: &[LayerDefinition]) -> String {
    layers
        .iter()
        .map(|layer| {
            let kind = layer.geometry.to_string();
            format!(
                "{:<22} {kind:<9} {:>6.1} mi  {}\n",
                layer.id, layer.max_radius_miles, layer.name
            )
        })
        .collect()
}

fn render_table(results: &[(LayerDefinition, Resolution)]) -> String {
    let mut out = String::new();

    for (layer, resolution) in results {
        let _ = writeln!(out, "== {} ({}) ==", layer.name, layer.id);

        if resolution.features.is_empty() {
            let _ = writeln!(out, "  (no features)");
        }
        for feature in &resolution.features {
            let _ = writeln!(out, "  {}", feature_row(feature));
        }

        if resolution.truncated {
            let _ = writeln!(out, "  ! results truncated at the safety limit");
        }
        if resolution.skipped_malformed > 0 {
            let _ = writeln!(
                out,
                "  ! skipped {} features with malformed geometry",
                resolution.skipped_malformed
            );
        }
        for warning in &resolution.warnings {
            let _ = writeln!(
                out,
                "  ! {} query failed ({} partial features kept): {}",
                warning.strategy, warning.partial_features, warning.message
            );
        }
    }

    out
}

fn feature_row(feature: &ResolvedFeature) -> String {
    let place = if feature.is_containing {
        "inside".to_string()
    } else {
        format!("{:.2} mi", feature.distance_miles)
    };
    let id = feature.id.as_deref().unwrap_or("-");
    let fields = feature
        .fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!("{place:>9}  {id:<12} {fields}").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use locator_resolver_models::{GeometryKind, QueryStrategy, ResolveWarning, SchemaMapping};
    use serde_json::Map;

    use super::*;

    fn layer() -> LayerDefinition {
        LayerDefinition {
            id: "us_wetlands".to_string(),
            name: "National Wetlands Inventory".to_string(),
            url: "https://example.com/wetlands/0".to_string(),
            geometry: GeometryKind::Polygon,
            max_radius_miles: 5.0,
            batch_size: None,
            where_clause: None,
            schema: SchemaMapping::default(),
        }
    }

    fn resolution() -> Resolution {
        let fields = BTreeMap::from([("type".to_string(), "Riverine".to_string())]);
        Resolution {
            layer_id: "us_wetlands".to_string(),
            features: vec![
                ResolvedFeature::containing(Some("17".to_string()), None, Map::new())
                    .with_fields(fields),
                ResolvedFeature::nearby(None, None, 2.5, Map::new()),
            ],
            attempted: vec![QueryStrategy::Containment, QueryStrategy::Proximity],
            warnings: vec![ResolveWarning {
                strategy: QueryStrategy::Proximity,
                message: "HTTP 503".to_string(),
                partial_features: 1,
            }],
            truncated: false,
            skipped_malformed: 0,
        }
    }

    #[test]
    fn table_lists_features_and_warnings() {
        let table = render(OutputFormat::Table, &[(layer(), resolution())]).unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "== National Wetlands Inventory (us_wetlands) ==");
        assert_eq!(lines[1], "     inside  17           type=Riverine");
        assert_eq!(lines[2], "    2.50 mi  -");
        assert!(lines[3].contains("proximity query failed (1 partial features kept): HTTP 503"));
    }

    #[test]
    fn layer_listing_aligns_columns() {
        let listing = render_layers(&[layer()]);
        assert_eq!(
            listing,
            "us_wetlands            polygon      5.0 mi  National Wetlands Inventory\n"
        );
    }

    #[test]
    fn json_includes_layer_name_and_features() {
        let json = render(OutputFormat::Json, &[(layer(), resolution())]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["name"], "National Wetlands Inventory");
        assert_eq!(value[0]["layer_id"], "us_wetlands");
        assert_eq!(value[0]["features"][0]["is_containing"], true);
        assert_eq!(value[0]["warnings"][0]["strategy"], "proximity");
    }
}
