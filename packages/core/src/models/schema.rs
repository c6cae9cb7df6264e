//! Collection Schema Types
//!
//! A Collection is a runtime-defined record shape. It is stored as a regular
//! node with `type = "collection"` whose `data` holds the definition:
//!
//! ```json
//! {
//!   "id": 7,
//!   "type": "collection",
//!   "data": {
//!     "name": "Clients",
//!     "targetType": "client",
//!     "groups": [{ "id": "contact", "name": "Contact", "order": 1 }],
//!     "fields": [
//!       { "key": "name", "label": "Name", "type": "text", "required": true, "groupId": "contact" },
//!       {
//!         "key": "owner",
//!         "label": "Owner",
//!         "type": "select",
//!         "source": "collection",
//!         "sourceCollectionId": 3,
//!         "labelField": "full_name"
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! Validation never fails hard: [`Collection::validate`] returns a
//! [`SchemaReport`] and the generators skip whatever it flags.

use super::node::{deserialize_optional_id, Node, NodeData, NodeId, ValidationError};
use super::node::COLLECTION_NODE_TYPE;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Closed set of field types.
///
/// `Id`, `Type` and `Created` are display-only pseudo-types used by the system
/// columns of a table configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Checkbox,
    Select,
    Json,
    Table,
    Id,
    Type,
    Created,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Checkbox => "checkbox",
            FieldType::Select => "select",
            FieldType::Json => "json",
            FieldType::Table => "table",
            FieldType::Id => "id",
            FieldType::Type => "type",
            FieldType::Created => "created",
        }
    }

    /// System pseudo-types never appear as editable controls
    pub fn is_system(&self) -> bool {
        matches!(self, FieldType::Id | FieldType::Type | FieldType::Created)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a select field gets its choices from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    /// The field's own `options` list
    #[default]
    Static,
    /// Records of another Collection (a relationship)
    Collection,
}

/// Named, ordered section used to cluster fields for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub order: i64,
}

/// One attribute of a Collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Property name inside node data; unique within the Collection
    pub key: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    /// Blank ids read as "no group"
    #[serde(
        default,
        deserialize_with = "deserialize_group_ref",
        skip_serializing_if = "Option::is_none"
    )]
    pub group_id: Option<String>,

    /// Static choices (select fields with `source = static`)
    #[serde(
        default,
        deserialize_with = "deserialize_options",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<String>,

    #[serde(default)]
    pub source: FieldSource,

    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_collection_id: Option<NodeId>,

    /// Field of the related Collection that supplies a readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,

    /// Whether a select holds an array of values instead of one
    #[serde(default)]
    pub multiple: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Field {
    /// Minimal field of the given type; label defaults to the key
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            field_type,
            required: false,
            group_id: None,
            options: Vec::new(),
            source: FieldSource::Static,
            source_collection_id: None,
            label_field: None,
            multiple: false,
            default: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Static select over the given choices
    pub fn static_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_type = FieldType::Select;
        self.source = FieldSource::Static;
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Relationship select pointing at another Collection
    pub fn relation(mut self, collection_id: NodeId, label_field: Option<&str>) -> Self {
        self.field_type = FieldType::Select;
        self.source = FieldSource::Collection;
        self.source_collection_id = Some(collection_id);
        self.label_field = label_field.map(str::to_string);
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// A select whose choices are records of another Collection
    pub fn is_relationship(&self) -> bool {
        self.field_type == FieldType::Select && self.source == FieldSource::Collection
    }

    /// `multiple` only means something on select fields
    pub fn is_multi_select(&self) -> bool {
        self.field_type == FieldType::Select && self.multiple
    }

    /// Group this field belongs to; blank ids count as ungrouped
    pub fn group_ref(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.key
        } else {
            &self.label
        }
    }
}

/// One schema invariant violation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaIssue {
    #[error("Field at position {index} has an empty key")]
    EmptyKey { index: usize },

    #[error("Duplicate field key: {key}")]
    DuplicateKey { index: usize, key: String },

    #[error("Field {key} references unknown group {group_id}")]
    UnknownGroup {
        index: usize,
        key: String,
        group_id: String,
    },

    #[error("Relationship field {key} has no source collection")]
    MissingSourceCollection { index: usize, key: String },

    #[error("Field {key} uses display-only type {field_type}")]
    SystemTypeField {
        index: usize,
        key: String,
        field_type: FieldType,
    },

    #[error("Duplicate group id: {group_id}")]
    DuplicateGroup { group_id: String },

    /// The stored definition entry could not be read; it is not part of `fields`
    #[error("Field entry {position} ({}) could not be decoded: {reason}", .key.as_deref().unwrap_or("no key"))]
    UndecodableField {
        position: usize,
        key: Option<String>,
        reason: String,
    },

    #[error("Group entry {position} could not be decoded: {reason}")]
    UndecodableGroup { position: usize, reason: String },
}

impl SchemaIssue {
    /// Position of the offending field, if the issue concerns a field
    pub fn field_index(&self) -> Option<usize> {
        match self {
            SchemaIssue::EmptyKey { index }
            | SchemaIssue::DuplicateKey { index, .. }
            | SchemaIssue::UnknownGroup { index, .. }
            | SchemaIssue::MissingSourceCollection { index, .. }
            | SchemaIssue::SystemTypeField { index, .. } => Some(*index),
            SchemaIssue::DuplicateGroup { .. }
            | SchemaIssue::UndecodableField { .. }
            | SchemaIssue::UndecodableGroup { .. } => None,
        }
    }
}

/// Result of validating a Collection. Callers choose whether to block or
/// render best-effort; the generators render best-effort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaReport {
    pub issues: Vec<SchemaIssue>,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether the field at `index` must be left out of generated UI
    pub fn skips_field(&self, index: usize) -> bool {
        self.issues.iter().any(|i| i.field_index() == Some(index))
    }
}

/// Stored definition with groups and fields left undecoded, so one bad entry
/// does not take the whole Collection down
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionDocument {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_type: Option<String>,
    #[serde(default)]
    groups: Vec<Value>,
    #[serde(default)]
    fields: Vec<Value>,
}

/// A group or field entry that failed to decode, kept verbatim so saving the
/// definition back does not lose it
#[derive(Debug, Clone, PartialEq)]
pub struct UndecodableEntry {
    /// Index in the stored array
    pub position: usize,
    pub raw: Value,
    pub reason: String,
}

impl UndecodableEntry {
    fn key(&self) -> Option<String> {
        self.raw
            .get("key")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Decode every entry on its own; failures are set aside with their position
fn decode_entries<T: serde::de::DeserializeOwned>(
    raw: Vec<Value>,
) -> (Vec<T>, Vec<UndecodableEntry>) {
    let mut decoded = Vec::new();
    let mut rejected = Vec::new();
    for (position, entry) in raw.into_iter().enumerate() {
        match serde_json::from_value::<T>(entry.clone()) {
            Ok(item) => decoded.push(item),
            Err(err) => rejected.push(UndecodableEntry {
                position,
                raw: entry,
                reason: err.to_string(),
            }),
        }
    }
    (decoded, rejected)
}

/// Put undecodable entries back at their stored positions
fn merge_entries<T: Serialize>(decoded: &[T], rejected: &[UndecodableEntry]) -> Vec<Value> {
    let mut merged: Vec<Value> = decoded
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect();
    for entry in rejected {
        let at = entry.position.min(merged.len());
        merged.insert(at, entry.raw.clone());
    }
    merged
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strings or numbers, read as a string
fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    match &raw {
        Value::String(_) | Value::Number(_) => {
            scalar_to_string(&raw).ok_or_else(|| serde::de::Error::custom("invalid id"))
        }
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

fn deserialize_group_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value @ (Value::String(_) | Value::Number(_))) => Ok(scalar_to_string(&value)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid group id: {other}"
        ))),
    }
}

/// Static options may be stored as numbers or booleans; nulls are dropped
fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| {
            scalar_to_string(v)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid option: {v}")))
        })
        .collect()
}

/// A stored schema definition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collection {
    pub id: Option<NodeId>,
    pub name: String,
    /// Explicit node type for instances; falls back to the id as a string
    pub target_type: Option<String>,
    pub groups: Vec<Group>,
    pub fields: Vec<Field>,
    /// Stored group entries that could not be decoded
    pub undecodable_groups: Vec<UndecodableEntry>,
    /// Stored field entries that could not be decoded
    pub undecodable_fields: Vec<UndecodableEntry>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Read a Collection out of its stored node
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidNodeType` if the node is not a
    /// collection, or `InvalidData` if its data is not a definition at all.
    /// Individual groups or fields that fail to decode are set aside and
    /// reported by [`Collection::validate`].
    pub fn from_node(node: &Node) -> Result<Self, ValidationError> {
        if node.node_type != COLLECTION_NODE_TYPE {
            return Err(ValidationError::InvalidNodeType(format!(
                "Expected '{}', got '{}'",
                COLLECTION_NODE_TYPE, node.node_type
            )));
        }

        let document: CollectionDocument =
            serde_json::from_value(Value::Object(node.data.clone()))
                .map_err(|e| ValidationError::InvalidData(e.to_string()))?;

        let (groups, undecodable_groups) = decode_entries::<Group>(document.groups);
        let (fields, undecodable_fields) = decode_entries::<Field>(document.fields);

        Ok(Self {
            id: node.id,
            name: document.name,
            target_type: document.target_type.filter(|t| !t.trim().is_empty()),
            groups,
            fields,
            undecodable_groups,
            undecodable_fields,
        })
    }

    /// Node representation used to store this definition
    pub fn to_node(&self) -> Node {
        let document = CollectionDocument {
            name: self.name.clone(),
            target_type: self.target_type.clone(),
            groups: merge_entries(&self.groups, &self.undecodable_groups),
            fields: merge_entries(&self.fields, &self.undecodable_fields),
        };
        let data = match serde_json::to_value(document) {
            Ok(Value::Object(map)) => map,
            _ => NodeData::new(),
        };
        Node {
            id: self.id,
            ..Node::new(COLLECTION_NODE_TYPE, data)
        }
    }

    /// The `type` discriminator carried by instances of this Collection
    pub fn node_type(&self) -> Option<String> {
        self.target_type
            .clone()
            .or_else(|| self.id.map(|id| id.to_string()))
    }

    /// Whether `node_type` identifies instances of this Collection
    pub fn owns_type(&self, node_type: &str) -> bool {
        self.target_type.as_deref() == Some(node_type)
            || self.id.map(|id| id.to_string()).as_deref() == Some(node_type)
    }

    pub fn get_field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn get_group(&self, group_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    /// Groups sorted by display order (stable for equal orders)
    pub fn ordered_groups(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self.groups.iter().collect();
        groups.sort_by_key(|g| g.order);
        groups
    }

    pub fn relationship_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_relationship())
    }

    /// Check the schema invariants: group references resolve, relationship
    /// fields name their source, keys are present and unique.
    pub fn validate(&self) -> SchemaReport {
        let mut issues: Vec<SchemaIssue> = self
            .undecodable_groups
            .iter()
            .map(|entry| SchemaIssue::UndecodableGroup {
                position: entry.position,
                reason: entry.reason.clone(),
            })
            .chain(
                self.undecodable_fields
                    .iter()
                    .map(|entry| SchemaIssue::UndecodableField {
                        position: entry.position,
                        key: entry.key(),
                        reason: entry.reason.clone(),
                    }),
            )
            .collect();

        let mut group_ids = HashSet::new();
        for group in &self.groups {
            if !group_ids.insert(group.id.as_str()) {
                issues.push(SchemaIssue::DuplicateGroup {
                    group_id: group.id.clone(),
                });
            }
        }

        let mut seen_keys = HashSet::new();
        for (index, field) in self.fields.iter().enumerate() {
            let key = field.key.trim();
            if key.is_empty() {
                issues.push(SchemaIssue::EmptyKey { index });
                continue;
            }
            if !seen_keys.insert(key) {
                issues.push(SchemaIssue::DuplicateKey {
                    index,
                    key: key.to_string(),
                });
                continue;
            }
            if field.field_type.is_system() {
                issues.push(SchemaIssue::SystemTypeField {
                    index,
                    key: key.to_string(),
                    field_type: field.field_type,
                });
            }
            if let Some(group_id) = field.group_ref() {
                if !group_ids.contains(group_id) {
                    issues.push(SchemaIssue::UnknownGroup {
                        index,
                        key: key.to_string(),
                        group_id: group_id.to_string(),
                    });
                }
            }
            if field.is_relationship() && field.source_collection_id.is_none() {
                issues.push(SchemaIssue::MissingSourceCollection {
                    index,
                    key: key.to_string(),
                });
            }
        }

        SchemaReport { issues }
    }

    /// Fields that survive validation, in schema order
    pub fn renderable_fields<'a>(&'a self, report: &SchemaReport) -> Vec<&'a Field> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(index, _)| !report.skips_field(*index))
            .map(|(_, field)| field)
            .collect()
    }

    /// Log every issue in `report` against this collection
    pub(crate) fn log_issues(&self, report: &SchemaReport) {
        for issue in &report.issues {
            tracing::warn!(
                collection = %self.name,
                collection_id = ?self.id,
                "Schema issue, rendering best-effort: {}",
                issue
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group(id: &str, order: i64) -> Group {
        Group {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: None,
            order,
        }
    }

    #[test]
    fn test_collection_from_node() {
        let node = Node::from_value(json!({
            "id": 7,
            "type": "collection",
            "data": {
                "name": "Clients",
                "targetType": "client",
                "groups": [{ "id": "main", "name": "Main", "order": 2 }],
                "fields": [
                    { "key": "name", "label": "Name", "type": "text", "required": true, "groupId": "main" },
                    { "key": "owner", "label": "Owner", "type": "select", "source": "collection",
                      "sourceCollectionId": "3", "labelField": "full_name", "multiple": true }
                ]
            }
        }))
        .unwrap();

        let collection = Collection::from_node(&node).unwrap();
        assert_eq!(collection.id, Some(7));
        assert_eq!(collection.node_type().as_deref(), Some("client"));
        assert_eq!(collection.fields.len(), 2);
        assert!(collection.fields[0].required);
        assert_eq!(collection.fields[0].group_id.as_deref(), Some("main"));

        let owner = collection.get_field("owner").unwrap();
        assert!(owner.is_relationship());
        assert!(owner.is_multi_select());
        assert_eq!(owner.source_collection_id, Some(3));
        assert_eq!(owner.label_field.as_deref(), Some("full_name"));
    }

    #[test]
    fn test_undecodable_field_skips_only_that_field() {
        let node = Node::from_value(json!({
            "id": 9,
            "type": "collection",
            "data": {
                "name": "Contacts",
                "fields": [
                    { "key": "title", "type": "text" },
                    { "key": "email", "type": "email" },
                    { "key": "age", "type": "number" }
                ]
            }
        }))
        .unwrap();

        let collection = Collection::from_node(&node).unwrap();
        let keys: Vec<&str> = collection.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["title", "age"]);

        let report = collection.validate();
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            &report.issues[0],
            SchemaIssue::UndecodableField { position: 1, key: Some(key), .. } if key == "email"
        ));
        assert_eq!(collection.renderable_fields(&report).len(), 2);

        // saving the definition back keeps the entry where it was
        let stored = collection.to_node();
        assert_eq!(stored.data["fields"][1], json!({ "key": "email", "type": "email" }));
        assert_eq!(stored.data["fields"][2]["key"], "age");
    }

    #[test]
    fn test_loose_ids_and_options_decode() {
        let node = Node::from_value(json!({
            "type": "collection",
            "data": {
                "name": "Loose",
                "groups": [{ "id": 1, "name": "First" }, { "name": "No id" }],
                "fields": [
                    { "key": "size", "type": "select", "options": [1, "2", null, true], "groupId": 1 },
                    { "key": "title", "type": "text", "groupId": "" },
                    { "key": "body", "type": "textarea", "groupId": null }
                ]
            }
        }))
        .unwrap();

        let collection = Collection::from_node(&node).unwrap();
        assert_eq!(collection.groups.len(), 1);
        assert_eq!(collection.groups[0].id, "1");
        assert_eq!(collection.undecodable_groups.len(), 1);

        let size = collection.get_field("size").unwrap();
        assert_eq!(size.options, vec!["1", "2", "true"]);
        assert_eq!(size.group_ref(), Some("1"));
        assert_eq!(collection.get_field("title").unwrap().group_id, None);
        assert_eq!(collection.get_field("body").unwrap().group_id, None);

        let report = collection.validate();
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(report.issues[0], SchemaIssue::UndecodableGroup { position: 1, .. }));
        assert_eq!(collection.renderable_fields(&report).len(), 3);
    }

    #[test]
    fn test_blank_group_id_is_not_unknown() {
        let collection = Collection::new("Blank")
            .field(Field::new("title", FieldType::Text).in_group(" "));
        assert!(collection.validate().is_valid());
        assert_eq!(collection.fields[0].group_ref(), None);
    }

    #[test]
    fn test_from_node_rejects_non_object_definition() {
        let node = Node::new(
            "collection",
            json!({ "fields": "not a list" }).as_object().cloned().unwrap(),
        );
        assert!(matches!(
            Collection::from_node(&node),
            Err(ValidationError::InvalidData(_))
        ));
    }

    #[test]
    fn test_from_node_rejects_wrong_type() {
        let node = Node::new("view", NodeData::new());
        let result = Collection::from_node(&node);
        assert!(matches!(result, Err(ValidationError::InvalidNodeType(_))));
    }

    #[test]
    fn test_node_type_falls_back_to_id() {
        let collection = Collection::new("Targets").with_id(12);
        assert_eq!(collection.node_type().as_deref(), Some("12"));
        assert!(collection.owns_type("12"));
        assert!(!collection.owns_type("targets"));
        assert_eq!(Collection::new("Unsaved").node_type(), None);
    }

    #[test]
    fn test_to_node_round_trip() {
        let collection = Collection::new("Clients")
            .with_id(4)
            .with_target_type("client")
            .group(group("main", 1))
            .field(Field::new("name", FieldType::Text).required().in_group("main"))
            .field(Field::new("owner", FieldType::Select).relation(3, Some("name")));

        let node = collection.to_node();
        assert_eq!(node.node_type, "collection");
        assert_eq!(node.data["targetType"], "client");
        assert_eq!(node.data["fields"][1]["sourceCollectionId"], 3);

        let decoded = Collection::from_node(&node).unwrap();
        assert_eq!(decoded, collection);
    }

    #[test]
    fn test_validate_clean_schema() {
        let collection = Collection::new("Clients")
            .group(group("main", 1))
            .field(Field::new("name", FieldType::Text).in_group("main"))
            .field(Field::new("notes", FieldType::Textarea));
        assert!(collection.validate().is_valid());
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let collection = Collection::new("Broken")
            .group(group("main", 1))
            .field(Field::new("name", FieldType::Text).in_group("main"))
            .field(Field::new("name", FieldType::Number))
            .field(Field::new("extra", FieldType::Text).in_group("missing"))
            .field(Field {
                source: FieldSource::Collection,
                ..Field::new("owner", FieldType::Select)
            })
            .field(Field::new(" ", FieldType::Text));

        let report = collection.validate();
        assert_eq!(report.issues.len(), 4);
        assert!(report.issues.contains(&SchemaIssue::DuplicateKey {
            index: 1,
            key: "name".to_string()
        }));
        assert!(report.issues.contains(&SchemaIssue::UnknownGroup {
            index: 2,
            key: "extra".to_string(),
            group_id: "missing".to_string()
        }));
        assert!(report.issues.contains(&SchemaIssue::MissingSourceCollection {
            index: 3,
            key: "owner".to_string()
        }));
        assert!(report.issues.contains(&SchemaIssue::EmptyKey { index: 4 }));

        let renderable: Vec<&str> = collection
            .renderable_fields(&report)
            .iter()
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(renderable, vec!["name"]);
    }

    #[test]
    fn test_ordered_groups_is_stable() {
        let collection = Collection::new("Ordered")
            .group(group("b", 2))
            .group(group("a", 1))
            .group(group("c", 2));
        let ids: Vec<&str> = collection
            .ordered_groups()
            .iter()
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_field_serialization_uses_camel_case() {
        let field = Field::new("owner", FieldType::Select)
            .relation(9, Some("title"))
            .multiple()
            .in_group("g1");
        let wire = serde_json::to_value(&field).unwrap();
        assert_eq!(wire["type"], "select");
        assert_eq!(wire["source"], "collection");
        assert_eq!(wire["sourceCollectionId"], 9);
        assert_eq!(wire["labelField"], "title");
        assert_eq!(wire["groupId"], "g1");
        assert_eq!(wire["multiple"], true);
    }
}
