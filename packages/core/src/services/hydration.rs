//! Relationship Hydration Interpreter
//!
//! The store resolves relationship fields and attaches the related records as
//! `__<key>` companions. This module interprets them for display and removes
//! them again before anything is written.
//!
//! # Label cascade
//!
//! A related record is turned into a label by trying, in order:
//!
//! 1. the caller's preferred label field
//! 2. `name`, `title`, `label`
//! 3. the first key shaped like `name_*`
//! 4. the record's `id`
//!
//! and finally the empty string. Nothing here returns an error: a missing
//! companion degrades to the raw id(s).

use crate::models::{Companion, Field, Node, NodeData, Resolved};
use serde_json::Value;

pub use crate::models::{normalize_for_field, normalize_multiple, normalize_single};

/// Keys tried after the preferred label field
pub const COMMON_LABEL_KEYS: [&str; 3] = ["name", "title", "label"];

/// Prefix of generated name keys (`name_en`, `name_1`, ...)
pub const NAME_KEY_PREFIX: &str = "name_";

/// Separator between labels of a multiple relation
pub const LABEL_SEPARATOR: &str = ", ";

/// One step of the label cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStrategy {
    PreferredField,
    CommonNames,
    NamePattern,
    Id,
}

/// Strategies in evaluation order
pub const LABEL_STRATEGIES: [LabelStrategy; 4] = [
    LabelStrategy::PreferredField,
    LabelStrategy::CommonNames,
    LabelStrategy::NamePattern,
    LabelStrategy::Id,
];

impl LabelStrategy {
    fn apply(&self, record: &NodeData, preferred: Option<&str>) -> Option<String> {
        match self {
            LabelStrategy::PreferredField => {
                preferred.and_then(|key| non_empty_text(record.get(key)?))
            }
            LabelStrategy::CommonNames => COMMON_LABEL_KEYS
                .iter()
                .find_map(|key| record.get(*key).and_then(non_empty_text)),
            LabelStrategy::NamePattern => record
                .iter()
                .filter(|(key, _)| key.starts_with(NAME_KEY_PREFIX))
                .find_map(|(_, value)| non_empty_text(value)),
            LabelStrategy::Id => record.get("id").and_then(non_empty_text),
        }
    }
}

/// Label of one related record.
///
/// Non-object companions (a bare id the store echoed back) display as text.
pub fn extract_label(record: &Value, preferred: Option<&str>) -> String {
    match record {
        Value::Object(map) => LABEL_STRATEGIES
            .iter()
            .find_map(|strategy| strategy.apply(map, preferred))
            .unwrap_or_default(),
        other => scalar_text(other).unwrap_or_default(),
    }
}

/// Display string for relationship `field_key` of `data`.
///
/// Uses the hydration companion when present, otherwise falls back to the raw
/// id(s). A companion entry that yields no label shows its raw id instead,
/// when the raw ids line up with the companion entries.
pub fn resolve_display(field_key: &str, data: &NodeData, preferred_label_field: Option<&str>) -> String {
    let resolved = Resolved::of(data, field_key);
    match &resolved.companion {
        Some(Companion::Single(record)) => {
            let label = extract_label(record, preferred_label_field);
            if label.is_empty() {
                raw_display(resolved.raw.as_ref())
            } else {
                label
            }
        }
        Some(Companion::Many(records)) => {
            let raw = raw_texts(resolved.raw.as_ref());
            let aligned = raw.len() == records.len();
            join_labels(records.iter().enumerate().map(|(index, record)| {
                let label = extract_label(record, preferred_label_field);
                match (label.is_empty(), aligned) {
                    (true, true) => raw[index].clone(),
                    _ => label,
                }
            }))
        }
        None => raw_display(resolved.raw.as_ref()),
    }
}

/// [`resolve_display`] using the field's own key and label field
pub fn display_relationship(field: &Field, data: &NodeData) -> String {
    resolve_display(&field.key, data, field.label_field.as_deref())
}

/// Display of an unhydrated value: the id itself, or ids joined
pub fn raw_display(raw: Option<&Value>) -> String {
    join_labels(raw_texts(raw).into_iter())
}

/// Non-empty scalar entries of a raw relationship value, as text
fn raw_texts(raw: Option<&Value>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .filter(|text| !text.is_empty())
            .collect(),
        Some(value) => scalar_text(value).into_iter().collect(),
    }
}

/// Shallow copy of `node` with every hydration companion removed from `data`.
///
/// Idempotent: stripping a clean node returns an equal node.
pub fn strip_hydrated(node: &Node) -> Node {
    node.without_hydration()
}

/// [`strip_hydrated`] for a bare data map, for payloads built without a `Node`
pub fn strip_hydrated_data(data: &NodeData) -> NodeData {
    crate::models::strip_companions(data)
}

fn join_labels(labels: impl Iterator<Item = String>) -> String {
    labels
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn non_empty_text(value: &Value) -> Option<String> {
    scalar_text(value).filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeData;
    use serde_json::json;

    fn data(value: Value) -> NodeData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_companion_falls_back_to_raw_id() {
        let data = data(json!({ "owner": 3 }));
        assert_eq!(resolve_display("owner", &data, None), "3");
    }

    #[test]
    fn test_single_companion_uses_name() {
        let data = data(json!({ "owner": 3, "__owner": { "id": 3, "name": "Alice" } }));
        assert_eq!(resolve_display("owner", &data, None), "Alice");
    }

    #[test]
    fn test_multiple_companions_are_joined() {
        let data = data(json!({
            "owner": [3, 4],
            "__owner": [{ "id": 3, "name": "Alice" }, { "id": 4, "name": "Bob" }]
        }));
        assert_eq!(resolve_display("owner", &data, None), "Alice, Bob");
    }

    #[test]
    fn test_unlabelled_companion_entry_shows_its_id() {
        let data = data(json!({
            "owner": [3, 4],
            "__owner": [{}, { "id": 4, "name": "Bob" }]
        }));
        assert_eq!(resolve_display("owner", &data, None), "3, Bob");

        let data = data_single();
        assert_eq!(resolve_display("owner", &data, None), "3");
    }

    fn data_single() -> NodeData {
        data(json!({ "owner": 3, "__owner": { "color": "red" } }))
    }

    #[test]
    fn test_raw_id_array_without_companion() {
        let data = data(json!({ "owner": [3, "4", null] }));
        assert_eq!(resolve_display("owner", &data, None), "3, 4");
    }

    #[test]
    fn test_label_cascade_order() {
        let record = json!({
            "id": 9,
            "label": "L",
            "title": "T",
            "name": "N",
            "full_name": "Full"
        });
        assert_eq!(extract_label(&record, Some("full_name")), "Full");
        assert_eq!(extract_label(&record, Some("missing")), "N");
        assert_eq!(extract_label(&record, None), "N");

        let record = json!({ "id": 9, "label": "L", "title": "T" });
        assert_eq!(extract_label(&record, None), "T");

        let record = json!({ "id": 9, "name": "  ", "label": "L" });
        assert_eq!(extract_label(&record, None), "L");
    }

    #[test]
    fn test_name_pattern_first_match_wins() {
        let record = json!({ "id": 2, "name_fr": "", "name_en": "Widget", "name_de": "Ding" });
        assert_eq!(extract_label(&record, None), "Widget");
    }

    #[test]
    fn test_id_then_empty_fallback() {
        assert_eq!(extract_label(&json!({ "id": 5, "color": "red" }), None), "5");
        assert_eq!(extract_label(&json!({ "color": "red" }), None), "");
        assert_eq!(extract_label(&json!(null), None), "");
        assert_eq!(extract_label(&json!(7), None), "7");
    }

    #[test]
    fn test_preferred_label_field_must_be_non_empty() {
        let record = json!({ "id": 1, "code": "", "name": "Fallback" });
        assert_eq!(extract_label(&record, Some("code")), "Fallback");
        let record = json!({ "id": 1, "code": 0 });
        assert_eq!(extract_label(&record, Some("code")), "0");
    }

    #[test]
    fn test_resolve_display_never_panics() {
        let companions = [
            None,
            Some(json!(null)),
            Some(json!({})),
            Some(json!({ "name": "" })),
            Some(json!([])),
            Some(json!([null, {}, { "title": "X" }, 4])),
            Some(json!("bare")),
        ];
        let raws = [None, Some(json!(null)), Some(json!(1)), Some(json!([])), Some(json!({}))];
        let preferred = [None, Some("name"), Some("")];

        for companion in &companions {
            for raw in &raws {
                for label_field in preferred {
                    let mut map = NodeData::new();
                    if let Some(raw) = raw {
                        map.insert("rel".to_string(), raw.clone());
                    }
                    if let Some(companion) = companion {
                        map.insert("__rel".to_string(), companion.clone());
                    }
                    let _ = resolve_display("rel", &map, label_field);
                }
            }
        }
    }

    #[test]
    fn test_strip_hydrated_is_idempotent() {
        let node = Node::from_value(json!({
            "id": 1,
            "type": "task",
            "data": {
                "owner": 3,
                "__owner": { "id": 3 },
                "__orphan": true,
                "title": "Keep"
            }
        }))
        .unwrap();

        let once = strip_hydrated(&node);
        let twice = strip_hydrated(&once);
        assert_eq!(once, twice);
        assert_eq!(once.data.len(), 2);
        assert!(once.hydrated_keys().next().is_none());
        // The input is left untouched
        assert_eq!(node.data.len(), 4);
    }

    #[test]
    fn test_display_relationship_uses_field_label_field() {
        let field = Field::new("client", crate::models::FieldType::Select)
            .relation(7, Some("company_name"));
        let data = data(json!({
            "client": 2,
            "__client": { "id": 2, "name": "ignored", "company_name": "Acme" }
        }));
        assert_eq!(display_relationship(&field, &data), "Acme");
    }
}
