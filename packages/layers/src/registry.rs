//! Compile-time registry of built-in layers.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a layer requires creating a TOML file in `definitions/` and adding
//! a corresponding entry here.

use locator_resolver_models::LayerDefinition;

/// Number of built-in layers. Enforced by a test.
#[cfg(test)]
const EXPECTED_LAYER_COUNT: usize = 5;

/// Embedded TOML layer definitions.
const LAYER_TOMLS: &[(&str, &str)] = &[
    ("us_wetlands", include_str!("../definitions/us_wetlands.toml")),
    (
        "wildfire_perimeters",
        include_str!("../definitions/wildfire_perimeters.toml"),
    ),
    (
        "grazing_allotments",
        include_str!("../definitions/grazing_allotments.toml"),
    ),
    ("nhd_flowlines", include_str!("../definitions/nhd_flowlines.toml")),
    ("fire_stations", include_str!("../definitions/fire_stations.toml")),
];

/// Returns all built-in layers.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. These are compile-time
/// constants, so a parse failure is a development error caught by the
/// registry tests.
#[must_use]
pub fn all_layers() -> Vec<LayerDefinition> {
    LAYER_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse layer '{name}': {e}"))
        })
        .collect()
}

/// Looks up a built-in layer by id.
#[must_use]
pub fn find_layer(id: &str) -> Option<LayerDefinition> {
    all_layers().into_iter().find(|layer| layer.id == id)
}
