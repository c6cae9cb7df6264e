//! Chip-style editor state for multi-valued relationship fields
//!
//! Holds the selected ids in insertion order without duplicates and always
//! emits a JSON array, whatever shape the stored value had.

use super::hydration::{extract_label, normalize_multiple};
use crate::db::SelectOption;
use crate::models::{companion_key, NodeData};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChipSelection {
    selected: Vec<Value>,
}

impl ChipSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a stored value: null, a scalar, or an array
    pub fn from_value(value: Option<&Value>) -> Self {
        let mut selection = Self::new();
        for item in normalize_multiple(value) {
            selection.add(item);
        }
        selection
    }

    /// Returns false when the value was empty or already selected
    pub fn add(&mut self, value: Value) -> bool {
        if crate::models::is_empty_entry(&value) || self.contains(&value) {
            return false;
        }
        self.selected.push(value);
        true
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        let before = self.selected.len();
        self.selected.retain(|v| !same_id(v, value));
        self.selected.len() != before
    }

    /// Add when absent, remove when present. Returns whether it is now selected.
    pub fn toggle(&mut self, value: Value) -> bool {
        if self.remove(&value) {
            false
        } else {
            self.add(value)
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.selected.iter().any(|v| same_id(v, value))
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.selected
    }

    /// Value to write back into node data; always an array
    pub fn emit(&self) -> Value {
        Value::Array(self.selected.clone())
    }

    /// Chip labels: from loaded options first, then the hydration companion
    /// on `data[field_key]`, then the bare id.
    pub fn labels(
        &self,
        options: &[SelectOption],
        data: Option<(&NodeData, &str)>,
        label_field: Option<&str>,
    ) -> Vec<String> {
        let companions: Vec<Value> = data
            .and_then(|(data, key)| data.get(&companion_key(key)))
            .map(|c| match c {
                Value::Array(items) => items.clone(),
                single => vec![single.clone()],
            })
            .unwrap_or_default();

        self.selected
            .iter()
            .map(|value| {
                if let Some(option) = options.iter().find(|o| same_id(&o.value, value)) {
                    return option.label.clone();
                }
                companions
                    .iter()
                    .find(|c| c.get("id").is_some_and(|id| same_id(id, value)))
                    .map(|c| extract_label(c, label_field))
                    .filter(|label| !label.is_empty())
                    .unwrap_or_else(|| extract_label(value, None))
            })
            .collect()
    }
}

/// Ids may arrive as numbers or numeric strings
fn same_id(a: &Value, b: &Value) -> bool {
    a == b || matches!((id_text(a), id_text(b)), (Some(x), Some(y)) if x == y)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}
