//! Normalization of newly generated entries to a complete field set.
//!
//! The store rejects partial records, so every behavior field absent from a
//! generated entry is filled with its documented default before creation.

use loresmith_store::LoreEntry;
use serde_json::{Map, Value, json};

/// Documented defaults for every behavior field the store knows.
///
/// `comment` and `content` are typed on `LoreEntry` and default to empty
/// strings on their own; `type` is intentionally absent (left as supplied
/// for new entries, protected elsewhere for existing ones).
pub fn default_fields() -> Map<String, Value> {
    let Value::Object(map) = json!({
        "key": [],
        "keysecondary": [],
        "constant": false,
        "vectorized": false,
        "selective": true,
        "selectiveLogic": 0,
        "addMemo": true,
        "order": 100,
        "position": 4,
        "disable": false,
        "excludeRecursion": false,
        "preventRecursion": false,
        "matchPersonaDescription": false,
        "matchCharacterDescription": false,
        "matchCharacterPersonality": false,
        "matchCharacterDepthPrompt": false,
        "matchScenario": false,
        "matchCreatorNotes": false,
        "delayUntilRecursion": false,
        "probability": 100,
        "useProbability": true,
        "depth": 2,
        "group": "",
        "groupOverride": false,
        "groupWeight": 100,
        "scanDepth": null,
        "caseSensitive": null,
        "matchWholeWords": null,
        "useGroupScoring": false,
        "automationId": "",
        "role": 0,
        "sticky": 0,
        "cooldown": 0,
        "delay": 0,
    }) else {
        unreachable!("default table is an object literal");
    };
    map
}

/// Map a position name to its wire code. Numeric positions pass through
/// untouched elsewhere.
pub fn position_code(name: &str) -> Option<u64> {
    let normalized = name.trim().to_ascii_lowercase().replace(' ', "_");
    match normalized.as_str() {
        "before_character_definition" => Some(0),
        "at_depth" => Some(2),
        "after_character_definition" => Some(4),
        _ => None,
    }
}

/// Normalize a generated entry for creation.
///
/// Strips any uid the model echoed from context (the store assigns new
/// ones), translates a named `position` to its code, and fills every absent
/// behavior field from the default table.
pub fn apply_defaults(entry: &mut LoreEntry) {
    entry.uid = None;
    let named_position = match entry.fields.get("position") {
        Some(Value::String(name)) => position_code(name),
        _ => None,
    };
    if let Some(code) = named_position {
        entry.fields.insert("position".to_string(), json!(code));
    }
    for (field, value) in default_fields() {
        entry.fields.entry(field).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_defaults, default_fields, position_code};
    use loresmith_store::LoreEntry;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn sparse_entry_gains_every_documented_field() {
        let mut entry: LoreEntry = serde_json::from_value(json!({
            "comment": "The Shattered Coast",
            "content": "Storm-wracked cliffs north of the capital.",
        }))
        .expect("decode entry");

        apply_defaults(&mut entry);

        assert_eq!(entry.uid, None);
        assert_eq!(entry.fields.len(), default_fields().len());
        assert_eq!(entry.fields["key"], json!([]));
        assert_eq!(entry.fields["constant"], json!(false));
        assert_eq!(entry.fields["selective"], json!(true));
        assert_eq!(entry.fields["order"], json!(100));
        assert_eq!(entry.fields["position"], json!(4));
        assert_eq!(entry.fields["probability"], json!(100));
        assert_eq!(entry.fields["useProbability"], json!(true));
        assert_eq!(entry.fields["depth"], json!(2));
        assert_eq!(entry.fields["group"], json!(""));
        assert_eq!(entry.fields["groupWeight"], json!(100));
        assert_eq!(entry.fields["cooldown"], json!(0));
        assert_eq!(entry.fields["delay"], json!(0));
        assert_eq!(entry.fields["scanDepth"], json!(null));

        let encoded = serde_json::to_value(&entry).expect("encode entry");
        assert_eq!(encoded.get("uid"), None);
    }

    #[test]
    fn echoed_uid_is_stripped() {
        let mut entry: LoreEntry = serde_json::from_value(json!({
            "uid": 12,
            "comment": "echo",
            "content": "the model copied this uid from its context",
        }))
        .expect("decode entry");
        apply_defaults(&mut entry);
        assert_eq!(entry.uid, None);
    }

    #[test]
    fn supplied_fields_are_not_overwritten() {
        let mut entry: LoreEntry = serde_json::from_value(json!({
            "comment": "custom",
            "content": "x",
            "order": 5,
            "key": ["alpha"],
        }))
        .expect("decode entry");
        apply_defaults(&mut entry);
        assert_eq!(entry.fields["order"], json!(5));
        assert_eq!(entry.fields["key"], json!(["alpha"]));
    }

    #[test]
    fn named_position_maps_to_code() {
        let mut entry: LoreEntry = serde_json::from_value(json!({
            "comment": "placed",
            "content": "x",
            "position": "Before Character Definition",
        }))
        .expect("decode entry");
        apply_defaults(&mut entry);
        assert_eq!(entry.fields["position"], json!(0));

        assert_eq!(position_code("At Depth"), Some(2));
        assert_eq!(position_code("after_character_definition"), Some(4));
        assert_eq!(position_code("somewhere else"), None);
    }

    #[test]
    fn numeric_position_passes_through() {
        let mut entry: LoreEntry = serde_json::from_value(json!({
            "comment": "placed",
            "content": "x",
            "position": 2,
        }))
        .expect("decode entry");
        apply_defaults(&mut entry);
        assert_eq!(entry.fields["position"], json!(2));
    }
}
