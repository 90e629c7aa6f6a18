#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layer definitions the resolver can query.
//!
//! Built-in layers are TOML files embedded at compile time (see
//! [`registry`]). Additional layers can be loaded at runtime from a TOML
//! file containing `[[layer]]` tables; those replace built-in layers with
//! the same id.

pub mod registry;

use std::collections::BTreeSet;
use std::path::Path;

use locator_resolver_models::LayerDefinition;
use serde::Deserialize;

pub use registry::{all_layers, find_layer};

/// Errors from loading runtime layer files.
#[derive(Debug, thiserror::Error)]
pub enum LayersError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid layer TOML.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The same id appears twice in one file.
    #[error("Duplicate layer id: {id}")]
    Duplicate {
        /// The repeated id.
        id: String,
    },

    /// A layer is missing something the resolver needs.
    #[error("Invalid layer '{id}': {message}")]
    Invalid {
        /// Offending layer id.
        id: String,
        /// What is wrong with it.
        message: String,
    },
}

#[derive(Deserialize)]
struct LayerFile {
    #[serde(default, rename = "layer")]
    layers: Vec<LayerDefinition>,
}

/// Parses a layer file's contents.
///
/// # Errors
///
/// * [`LayersError::Toml`] if the contents are not valid layer TOML
/// * [`LayersError::Duplicate`] if an id appears twice
/// * [`LayersError::Invalid`] if a layer has an empty id or URL, or a
///   negative or non-finite maximum radius
pub fn parse_layers(contents: &str) -> Result<Vec<LayerDefinition>, LayersError> {
    let file: LayerFile = toml::de::from_str(contents)?;

    let mut seen = BTreeSet::new();
    for layer in &file.layers {
        validate(layer)?;
        if !seen.insert(layer.id.as_str()) {
            return Err(LayersError::Duplicate {
                id: layer.id.clone(),
            });
        }
    }

    Ok(file.layers)
}

/// Reads and parses a layer file.
///
/// # Errors
///
/// Returns [`LayersError::Io`] if the file cannot be read, otherwise as
/// [`parse_layers`].
pub fn load_layers_file(path: &Path) -> Result<Vec<LayerDefinition>, LayersError> {
    let contents = std::fs::read_to_string(path)?;
    let layers = parse_layers(&contents)?;
    log::info!("Loaded {} layers from {}", layers.len(), path.display());
    Ok(layers)
}

/// Built-in layers with `extra` layered on top. An extra layer replaces the
/// built-in layer with the same id.
#[must_use]
pub fn merge_layers(extra: Vec<LayerDefinition>) -> Vec<LayerDefinition> {
    let mut layers = all_layers();

    for layer in extra {
        if let Some(existing) = layers.iter_mut().find(|l| l.id == layer.id) {
            log::debug!("Overriding built-in layer {}", layer.id);
            *existing = layer;
        } else {
            layers.push(layer);
        }
    }

    layers
}

fn validate(layer: &LayerDefinition) -> Result<(), LayersError> {
    let invalid = |message: &str| {
        Err(LayersError::Invalid {
            id: layer.id.clone(),
            message: message.to_string(),
        })
    };

    if layer.id.trim().is_empty() {
        return invalid("empty id");
    }
    if layer.url.trim().is_empty() {
        return invalid("empty url");
    }
    if !layer.max_radius_miles.is_finite() || layer.max_radius_miles < 0.0 {
        return invalid("max_radius_miles must be finite and non-negative");
    }
    if layer.batch_size == Some(0) {
        return invalid("batch_size must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use locator_resolver_models::GeometryKind;

    use super::*;

    const FILE: &str = r#"
        [[layer]]
        id = "county_parcels"
        name = "County Parcels"
        url = "https://gis.example.com/arcgis/rest/services/Parcels/FeatureServer/0"
        geometry = "polygon"
        max_radius_miles = 1.0

        [layer.schema]
        id_fields = ["PARCEL_ID"]

        [[layer]]
        id = "us_wetlands"
        name = "Local Wetlands Mirror"
        url = "https://gis.example.com/arcgis/rest/services/Wetlands/FeatureServer/0"
        geometry = "polygon"
    "#;

    #[test]
    fn parses_layer_tables() {
        let layers = parse_layers(FILE).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].id, "county_parcels");
        assert_eq!(layers[0].geometry, GeometryKind::Polygon);
        assert_eq!(layers[0].schema.id_fields, vec!["PARCEL_ID"]);
    }

    #[test]
    fn extra_layers_override_built_ins_by_id() {
        let merged = merge_layers(parse_layers(FILE).unwrap());
        assert_eq!(merged.len(), all_layers().len() + 1);

        let wetlands = merged.iter().find(|l| l.id == "us_wetlands").unwrap();
        assert_eq!(wetlands.name, "Local Wetlands Mirror");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let doubled = format!("{FILE}\n{}", FILE.replace("us_wetlands", "other"));
        assert!(matches!(
            parse_layers(&doubled),
            Err(LayersError::Duplicate { id }) if id == "county_parcels"
        ));
    }

    #[test]
    fn rejects_negative_radius() {
        let bad = r#"
            [[layer]]
            id = "bad"
            name = "Bad"
            url = "https://gis.example.com/bad"
            geometry = "point"
            max_radius_miles = -1.0
        "#;
        assert!(matches!(
            parse_layers(bad),
            Err(LayersError::Invalid { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_layers_file(Path::new("/nonexistent/locator-layers.toml"));
        assert!(matches!(result, Err(LayersError::Io(_))));
    }
}
