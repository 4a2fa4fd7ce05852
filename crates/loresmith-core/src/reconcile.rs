//! Shape validation and merge-under-protection.

use crate::error::LoreError;
use crate::pipeline::{PayloadShape, ReconcileMode};
use loresmith_store::LoreEntry;
use serde_json::{Map, Value};

/// Container name for shape diagnostics.
fn container_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check the payload container against the mode's expected shape.
///
/// Only the container is validated; malformed individual records are passed
/// downstream on purpose (permissive toward model creativity, strict on the
/// container).
pub fn validate_shape(mode: ReconcileMode, value: &Value) -> Result<(), LoreError> {
    let ok = match mode.expected_shape() {
        PayloadShape::Object => value.is_object(),
        PayloadShape::Array => value.is_array(),
    };
    if ok {
        return Ok(());
    }
    Err(LoreError::InvalidShape {
        mode,
        expected: mode.expected_shape().as_str(),
        found: container_name(value),
    })
}

/// Shallow-merge a patch over the target entry under field protection.
///
/// Every key present in the patch overwrites the target's key, then the
/// target's `uid` and `type` are restored unconditionally, overriding
/// anything the model attempted there.
pub fn merge_entry(
    target: &LoreEntry,
    patch: &Map<String, Value>,
) -> Result<LoreEntry, serde_json::Error> {
    let mut merged = target.to_object();
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    match target.uid {
        Some(uid) => merged.insert("uid".to_string(), Value::from(uid)),
        None => merged.remove("uid"),
    };
    match target.kind {
        Some(kind) => merged.insert("type".to_string(), serde_json::to_value(kind)?),
        None => merged.remove("type"),
    };
    serde_json::from_value(Value::Object(merged))
}

/// Decode a whole-book payload element-wise.
///
/// The validated array becomes the new book verbatim; there is no merge and
/// no field protection here, only the decode into typed entries.
pub fn decode_book(elements: &[Value]) -> Result<Vec<LoreEntry>, LoreError> {
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| decode_element(index, element))
        .collect()
}

/// Decode one array element into an entry, with its index for diagnostics.
pub fn decode_element(index: usize, element: &Value) -> Result<LoreEntry, LoreError> {
    if !element.is_object() {
        return Err(LoreError::EntryDecode {
            index,
            message: format!("expected an object, got {}", container_name(element)),
        });
    }
    serde_json::from_value(element.clone()).map_err(|err| LoreError::EntryDecode {
        index,
        message: err.to_string(),
    })
}
