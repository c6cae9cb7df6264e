//! Typed field values
//!
//! Node data is an open JSON map, but every value that passes through a form
//! control is first mapped into a [`FieldValue`] variant chosen by the field's
//! type, and mapped back out on extraction. Select values are normalized
//! against the field's `multiple` flag in both directions.

use super::schema::{Field, FieldType};
use serde_json::{Number, Value};

/// Value of one form control
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// text and textarea
    Text(String),
    /// `YYYY-MM-DD` or whatever the store sent
    Date(String),
    Number(Option<Number>),
    Checkbox(bool),
    /// Single select: one id/choice, or `""` when nothing is chosen
    Select(Value),
    /// Multi select: always an array, never holding null or `""`
    MultiSelect(Vec<Value>),
    /// Editing text of a json field; parsed back on extraction
    Json(String),
    /// Embedded list-of-rows
    Table(Vec<Value>),
}

impl FieldValue {
    /// Type-appropriate empty value for `field`
    pub fn empty(field: &Field) -> Self {
        match field.field_type {
            FieldType::Number => FieldValue::Number(None),
            FieldType::Checkbox => FieldValue::Checkbox(false),
            FieldType::Date => FieldValue::Date(String::new()),
            FieldType::Json => FieldValue::Json(String::new()),
            FieldType::Table => FieldValue::Table(Vec::new()),
            FieldType::Select if field.multiple => FieldValue::MultiSelect(Vec::new()),
            FieldType::Select => FieldValue::Select(Value::String(String::new())),
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Id
            | FieldType::Type
            | FieldType::Created => FieldValue::Text(String::new()),
        }
    }

    /// Map a raw data value into the control for `field`
    pub fn read(field: &Field, value: &Value) -> Self {
        if value.is_null() {
            return Self::empty(field);
        }
        match field.field_type {
            FieldType::Number => FieldValue::Number(number_from(value)),
            FieldType::Checkbox => FieldValue::Checkbox(truthy(value)),
            FieldType::Date => FieldValue::Date(text_from(value)),
            FieldType::Json => match value {
                Value::String(s) => FieldValue::Json(s.clone()),
                other => FieldValue::Json(
                    serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
                ),
            },
            FieldType::Table => FieldValue::Table(rows_from(value)),
            FieldType::Select if field.multiple => {
                FieldValue::MultiSelect(normalize_multiple(Some(value)))
            }
            FieldType::Select => FieldValue::Select(normalize_single(Some(value))),
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Id
            | FieldType::Type
            | FieldType::Created => FieldValue::Text(text_from(value)),
        }
    }

    /// Map the control value back into node data for `field`.
    ///
    /// Json text that does not parse is returned as the raw string.
    pub fn extract(&self, field: &Field) -> Value {
        let value = match self {
            FieldValue::Text(s) | FieldValue::Date(s) => Value::String(s.clone()),
            FieldValue::Number(n) => n.clone().map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Checkbox(b) => Value::Bool(*b),
            FieldValue::Select(v) => v.clone(),
            FieldValue::MultiSelect(items) => Value::Array(items.clone()),
            FieldValue::Json(text) => {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
            }
            FieldValue::Table(rows) => Value::Array(rows.clone()),
        };

        if field.field_type == FieldType::Select {
            normalize_for_field(field, &value)
        } else {
            value
        }
    }

    /// Emptiness as seen by the `required` validator
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Date(s) | FieldValue::Json(s) => s.is_empty(),
            FieldValue::Number(n) => n.is_none(),
            FieldValue::Checkbox(_) => false,
            FieldValue::Select(v) => is_empty_entry(v),
            FieldValue::MultiSelect(items) => items.is_empty(),
            FieldValue::Table(rows) => rows.is_empty(),
        }
    }
}

/// Null and empty strings do not count as selected values
pub fn is_empty_entry(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Coerce a multi-valued select value to an array:
/// null/absent → `[]`, scalar → `[scalar]`, array → itself minus empty entries.
pub fn normalize_multiple(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !is_empty_entry(item))
            .cloned()
            .collect(),
        Some(scalar) if is_empty_entry(scalar) => Vec::new(),
        Some(scalar) => vec![scalar.clone()],
    }
}

/// Coerce a single-valued select value: arrays collapse to their first element,
/// and anything empty becomes `""`.
pub fn normalize_single(value: Option<&Value>) -> Value {
    let candidate = match value {
        Some(Value::Array(items)) => items.first(),
        other => other,
    };
    match candidate {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(v) => v.clone(),
    }
}

/// Apply the normalization matching `field.multiple`
pub fn normalize_for_field(field: &Field, value: &Value) -> Value {
    if field.multiple {
        Value::Array(normalize_multiple(Some(value)))
    } else {
        normalize_single(Some(value))
    }
}

fn number_from(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Some(Number::from(i))
            } else {
                s.parse::<f64>().ok().and_then(Number::from_f64)
            }
        }
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

fn text_from(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn rows_from(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows.clone(),
        Value::String(s) => match serde_json::from_str(s) {
            Ok(Value::Array(rows)) => rows,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
