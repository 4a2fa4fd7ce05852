//! Lorebook entry and book models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Trigger classification assigned by the store.
///
/// The store never changes an entry's kind after creation, and neither does
/// reconciliation: patch modes restore the target's kind unconditionally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Always injected into context.
    Constant,
    /// Injected when a trigger key matches.
    Selective,
    /// Injected by vector similarity.
    Vectorized,
}

/// One lorebook entry.
///
/// Only the protected identity (`uid`, `type`) and the primary text fields
/// are typed; the store's ~30 behavior flags ride in the open `fields` map
/// so unknown or model-invented keys survive a round trip untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoreEntry {
    /// Store-assigned identifier; absent until the store creates the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    /// Trigger classification, serialized as `type`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,
    /// Display label.
    #[serde(default)]
    pub comment: String,
    /// Substantive text payload that AI edits target.
    #[serde(default)]
    pub content: String,
    /// Remaining behavior flags (trigger keys, recursion, probability, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LoreEntry {
    /// Human-facing label: the comment, or the uid when unlabeled.
    pub fn display_name(&self) -> String {
        if !self.comment.is_empty() {
            return self.comment.clone();
        }
        match self.uid {
            Some(uid) => format!("entry {uid}"),
            None => "unnamed entry".to_string(),
        }
    }

    /// Serialize into a JSON object map.
    pub fn to_object(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Book listing item returned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookInfo {
    /// Display name.
    pub name: String,
    /// Store-side file identifier.
    pub file_name: String,
}

/// Global activation settings for lorebooks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BookSettings {
    /// File identifiers of the currently enabled books.
    #[serde(rename = "selected_global_lorebooks", default)]
    pub enabled: Vec<String>,
}

/// Named list of books to enable together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    /// Preset name, unique within the preset store.
    pub name: String,
    /// Book file identifiers the preset enables.
    pub books: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{EntryKind, LoreEntry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn entry_keeps_unknown_fields() {
        let entry: LoreEntry = serde_json::from_value(json!({
            "uid": 7,
            "type": "constant",
            "comment": "The Citadel",
            "content": "A fortress of glass.",
            "key": ["citadel"],
            "probability": 80,
        }))
        .expect("decode entry");

        assert_eq!(entry.uid, Some(7));
        assert_eq!(entry.kind, Some(EntryKind::Constant));
        assert_eq!(entry.fields["key"], json!(["citadel"]));
        assert_eq!(entry.fields["probability"], json!(80));

        let back = serde_json::to_value(&entry).expect("encode entry");
        assert_eq!(back["type"], json!("constant"));
        assert_eq!(back["probability"], json!(80));
    }

    #[test]
    fn entry_without_uid_serializes_no_uid_key() {
        let entry = LoreEntry {
            comment: "fresh".to_string(),
            ..LoreEntry::default()
        };
        let value = serde_json::to_value(&entry).expect("encode entry");
        assert_eq!(value.get("uid"), None);
        assert_eq!(value.get("type"), None);
    }

    #[test]
    fn display_name_falls_back_to_uid() {
        let entry = LoreEntry {
            uid: Some(3),
            ..LoreEntry::default()
        };
        assert_eq!(entry.display_name(), "entry 3");
    }
}
