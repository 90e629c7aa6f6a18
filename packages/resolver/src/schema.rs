//! Applies a layer's [`SchemaMapping`] to raw attributes.

use std::collections::BTreeMap;

use locator_resolver_models::SchemaMapping;
use serde_json::{Map, Value};

/// The feature's id: the first configured id attribute that is present
/// and non-empty. `None` when the mapping names no id fields or none match.
#[must_use]
pub fn feature_id(schema: &SchemaMapping, attributes: &Map<String, Value>) -> Option<String> {
    first_text(&schema.id_fields, attributes)
}

/// Display fields: for each output name, the first candidate attribute
/// that is present and non-empty. Outputs with no match are omitted.
#[must_use]
pub fn display_fields(
    schema: &SchemaMapping,
    attributes: &Map<String, Value>,
) -> BTreeMap<String, String> {
    schema
        .fields
        .iter()
        .filter_map(|(name, candidates)| {
            first_text(candidates, attributes).map(|value| (name.clone(), value))
        })
        .collect()
}

fn first_text(candidates: &[String], attributes: &Map<String, Value>) -> Option<String> {
    candidates
        .iter()
        .find_map(|key| attributes.get(key).and_then(attribute_text))
}

/// Renders a scalar attribute as text. Null, blank strings, arrays and
/// objects have no text form.
fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
