//! Node Data Structures
//!
//! A `Node` is one record instance in the remote store. Its `type` is either a
//! literal discriminator (`"collection"`, `"view"`) or the node type of the
//! Collection that owns it, and its `data` is an open map shaped by that
//! Collection's fields.
//!
//! # Hydration companions
//!
//! When the store resolves a relationship field `owner`, it adds a read-only
//! companion at `data["__owner"]` holding the related record's data (or an array
//! of them). Companions are never written back: the only way to hand a node to a
//! store write is through [`WriteNode`], whose constructor strips them.
//!
//! ```rust
//! use nodeform_core::models::{Node, WriteNode};
//! use serde_json::json;
//!
//! let node = Node::from_value(json!({
//!     "id": 1,
//!     "type": "task",
//!     "data": { "owner": 3, "__owner": { "id": 3, "name": "Alice" } }
//! }))
//! .unwrap();
//!
//! let payload = WriteNode::new(node);
//! assert!(payload.as_node().data.get("__owner").is_none());
//! assert_eq!(payload.as_node().data["owner"], json!(3));
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Store-assigned record identifier
pub type NodeId = i64;

/// Open `key → value` map holding a node's schema-shaped data
pub type NodeData = Map<String, Value>;

/// Prefix of read-only hydration companion keys inside `data`
pub const HYDRATION_PREFIX: &str = "__";

/// Node type of stored Collection definitions
pub const COLLECTION_NODE_TYPE: &str = "collection";

/// Node type of stored View overlays
pub const VIEW_NODE_TYPE: &str = "view";

/// Validation errors for Node documents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),

    #[error("Node data validation failed: {0}")]
    InvalidData(String),
}

/// One record instance as it travels over the wire.
///
/// `created_at`/`updated_at` are kept as the store sent them; the table
/// generator parses them for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<NodeId>,

    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default)]
    pub data: NodeData,

    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<NodeId>,

    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub company_id: Option<NodeId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Node {
    /// Create an unsaved node; the store assigns `id` and timestamps.
    pub fn new(node_type: impl Into<String>, data: NodeData) -> Self {
        Self {
            id: None,
            node_type: node_type.into(),
            data,
            parent_id: None,
            company_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Parse a node from its JSON wire shape
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value).map_err(|e| ValidationError::InvalidData(e.to_string()))
    }

    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_company(mut self, company_id: NodeId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    /// Validate the envelope of a node.
    ///
    /// The shape of `data` is checked against its Collection by the form
    /// generator, not here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.node_type.trim().is_empty() {
            return Err(ValidationError::MissingField("type".to_string()));
        }
        Ok(())
    }

    /// Whether this node is owned by `owner_id` through either ownership link
    pub fn is_owned_by(&self, owner_id: NodeId) -> bool {
        self.parent_id == Some(owner_id) || self.company_id == Some(owner_id)
    }

    /// Keys of hydration companions currently present in `data`
    pub fn hydrated_keys(&self) -> impl Iterator<Item = &str> {
        self.data
            .keys()
            .map(String::as_str)
            .filter(|key| is_companion_key(key))
    }

    /// Shallow copy with every hydration companion removed from `data`
    pub fn without_hydration(&self) -> Node {
        Node {
            data: strip_companions(&self.data),
            ..self.clone()
        }
    }
}

/// Whether `key` names a hydration companion
pub fn is_companion_key(key: &str) -> bool {
    key.starts_with(HYDRATION_PREFIX)
}

/// Companion key for a relationship field
pub fn companion_key(field_key: &str) -> String {
    format!("{HYDRATION_PREFIX}{field_key}")
}

/// Copy of `data` without any `__`-prefixed keys
pub fn strip_companions(data: &NodeData) -> NodeData {
    data.iter()
        .filter(|(key, _)| !is_companion_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Read a relationship id out of a raw JSON value (number or numeric string)
pub fn id_from_value(value: &Value) -> Option<NodeId> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts ids as JSON numbers or numeric strings; blank strings mean "none".
pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<NodeId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => id_from_value(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid node id: {value}"))),
    }
}

/// A node that is safe to send to a store write operation.
///
/// The only constructor strips hydration companions, so a payload carrying
/// `__` keys cannot be built. Deserializing a `WriteNode` strips as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Node", into = "Node")]
pub struct WriteNode(Node);

impl WriteNode {
    pub fn new(node: Node) -> Self {
        if node.hydrated_keys().next().is_none() {
            return Self(node);
        }
        Self(node.without_hydration())
    }

    pub fn id(&self) -> Option<NodeId> {
        self.0.id
    }

    pub fn as_node(&self) -> &Node {
        &self.0
    }

    pub fn into_node(self) -> Node {
        self.0
    }
}

impl From<Node> for WriteNode {
    fn from(node: Node) -> Self {
        Self::new(node)
    }
}

impl From<WriteNode> for Node {
    fn from(payload: WriteNode) -> Self {
        payload.0
    }
}

/// Per-item outcome of a batch create/update.
///
/// Items are applied independently by the store; a failed item never discards
/// the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchItemResult {
    Success { node: Node },
    Failed { error: String },
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchItemResult::Success { .. })
    }

    pub fn node(&self) -> Option<&Node> {
        match self {
            BatchItemResult::Success { node } => Some(node),
            BatchItemResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BatchItemResult::Success { .. } => None,
            BatchItemResult::Failed { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hydrated_node() -> Node {
        Node::from_value(json!({
            "id": 12,
            "type": "7",
            "data": {
                "title": "Quarterly review",
                "owner": 3,
                "__owner": { "id": 3, "name": "Alice" },
                "reviewers": [3, 4],
                "__reviewers": [{ "id": 3, "name": "Alice" }, { "id": 4, "name": "Bob" }]
            },
            "company_id": "5",
            "created_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_wire_shape() {
        let node = hydrated_node();
        assert_eq!(node.id, Some(12));
        assert_eq!(node.node_type, "7");
        assert_eq!(node.company_id, Some(5));
        assert_eq!(node.parent_id, None);
        assert!(node.is_owned_by(5));
        assert!(!node.is_owned_by(12));
    }

    #[test]
    fn test_hydrated_keys() {
        let node = hydrated_node();
        let keys: Vec<&str> = node.hydrated_keys().collect();
        assert_eq!(keys, vec!["__owner", "__reviewers"]);
    }

    #[test]
    fn test_without_hydration_keeps_raw_ids() {
        let stripped = hydrated_node().without_hydration();
        assert_eq!(stripped.data.len(), 3);
        assert_eq!(stripped.data["owner"], json!(3));
        assert_eq!(stripped.data["reviewers"], json!([3, 4]));
        assert_eq!(stripped.id, Some(12));
    }

    #[test]
    fn test_write_node_serializes_without_companions() {
        let payload = WriteNode::new(hydrated_node());
        let wire = serde_json::to_value(&payload).unwrap();
        assert!(wire["data"].get("__owner").is_none());
        assert!(wire["data"].get("__reviewers").is_none());
        assert_eq!(wire["type"], "7");
        assert!(wire.get("parent_id").is_none());
    }

    #[test]
    fn test_write_node_deserialize_strips() {
        let payload: WriteNode = serde_json::from_value(json!({
            "type": "task",
            "data": { "owner": 1, "__owner": { "id": 1 } }
        }))
        .unwrap();
        assert_eq!(payload.as_node().data.len(), 1);
        assert_eq!(payload.id(), None);
    }

    #[test]
    fn test_validate_requires_type() {
        let node = Node::new("  ", NodeData::new());
        assert_eq!(
            node.validate(),
            Err(ValidationError::MissingField("type".to_string()))
        );
        assert!(Node::new("task", NodeData::new()).validate().is_ok());
    }

    #[test]
    fn test_id_from_value() {
        assert_eq!(id_from_value(&json!(3)), Some(3));
        assert_eq!(id_from_value(&json!("42")), Some(42));
        assert_eq!(id_from_value(&json!(4.0)), Some(4));
        assert_eq!(id_from_value(&json!("abc")), None);
        assert_eq!(id_from_value(&json!(null)), None);
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        let result = Node::from_value(json!({ "id": "not-a-number", "type": "task" }));
        assert!(matches!(result, Err(ValidationError::InvalidData(_))));
    }

    #[test]
    fn test_batch_item_result_wire_shape() {
        let failed = BatchItemResult::Failed {
            error: "missing id".to_string(),
        };
        let wire = serde_json::to_value(&failed).unwrap();
        assert_eq!(wire, json!({ "status": "failed", "error": "missing id" }));
        assert!(!failed.is_success());
        assert_eq!(failed.error(), Some("missing id"));
    }
}
