use serde_json::Value;

use crate::core::data::CatalogValue;

/// One scalar leaf of a catalog document.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry {
    /// Segments joined with `.`, sequence indices included (`menu.items.0.label`).
    pub key: String,
    /// The raw segments, for source-map lookups of keys that contain dots.
    pub segments: Vec<String>,
    pub value: CatalogValue,
}

/// Flatten nested mappings and sequences into dotted keys.
///
/// Nulls and empty containers contribute nothing, and neither does a scalar root.
pub fn flatten(data: &Value) -> Vec<FlatEntry> {
    let mut entries = Vec::new();
    let mut segments = Vec::new();
    match data {
        Value::Object(_) | Value::Array(_) => walk(data, &mut segments, &mut entries),
        _ => {}
    }
    entries
}

fn walk(value: &Value, segments: &mut Vec<String>, entries: &mut Vec<FlatEntry>) {
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                segments.push(name.clone());
                walk(child, segments, entries);
                segments.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                segments.push(index.to_string());
                walk(child, segments, entries);
                segments.pop();
            }
        }
        scalar => {
            if let Some(value) = CatalogValue::from_json(scalar) {
                entries.push(FlatEntry {
                    key: segments.join("."),
                    segments: segments.clone(),
                    value,
                });
            }
        }
    }
}
