//! Relationship side-channel
//!
//! A relationship field is stored as a raw id (or id array) under its key. The
//! store may add the related record(s) under the companion key; [`Resolved`]
//! pairs both so readers never look up `__` keys by hand.

use super::node::{companion_key, id_from_value, NodeData, NodeId};
use serde_json::Value;

/// Hydrated related data attached by the store
#[derive(Debug, Clone, PartialEq)]
pub enum Companion {
    /// Single relation: one related record's data
    Single(Value),
    /// Multiple relation: one entry per resolved target
    Many(Vec<Value>),
}

/// Raw foreign-key value plus whatever the store resolved for it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolved {
    pub raw: Option<Value>,
    pub companion: Option<Companion>,
}

impl Resolved {
    /// Read the relationship `field_key` out of node data
    pub fn of(data: &NodeData, field_key: &str) -> Self {
        let raw = data.get(field_key).filter(|v| !v.is_null()).cloned();
        let companion = match data.get(&companion_key(field_key)) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(Companion::Many(items.clone())),
            Some(other) => Some(Companion::Single(other.clone())),
        };
        Self { raw, companion }
    }

    pub fn is_hydrated(&self) -> bool {
        self.companion.is_some()
    }

    /// Ids held by the raw value, skipping anything that is not id-shaped
    pub fn raw_ids(&self) -> Vec<NodeId> {
        match &self.raw {
            Some(Value::Array(items)) => items.iter().filter_map(id_from_value).collect(),
            Some(value) => id_from_value(value).into_iter().collect(),
            None => Vec::new(),
        }
    }
}
