//! View overlays
//!
//! A View is a node of type `"view"` narrowing which columns a table shows for
//! one Collection. It is advisory only and never touches record data.

use super::node::{deserialize_optional_id, Node, NodeData, NodeId, ValidationError};
use super::node::VIEW_NODE_TYPE;
use super::schema::Collection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort hint carried by a View
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSort {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewDocument {
    #[serde(default)]
    name: String,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    collection_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort: Option<ViewSort>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct View {
    pub id: Option<NodeId>,
    pub name: String,
    pub collection_id: Option<NodeId>,
    /// Column allow-list; `None` or an empty list keeps every column
    pub fields: Option<Vec<String>>,
    /// Opaque filter hint, passed through untouched
    pub filter: Option<Value>,
    pub sort: Option<ViewSort>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn for_collection(mut self, collection_id: NodeId) -> Self {
        self.collection_id = Some(collection_id);
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(ViewSort {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn from_node(node: &Node) -> Result<Self, ValidationError> {
        if node.node_type != VIEW_NODE_TYPE {
            return Err(ValidationError::InvalidNodeType(format!(
                "Expected '{}', got '{}'",
                VIEW_NODE_TYPE, node.node_type
            )));
        }
        let document: ViewDocument = serde_json::from_value(Value::Object(node.data.clone()))
            .map_err(|e| ValidationError::InvalidData(e.to_string()))?;

        Ok(Self {
            id: node.id,
            name: document.name,
            collection_id: document.collection_id,
            fields: document.fields,
            filter: document.filter,
            sort: document.sort,
        })
    }

    pub fn to_node(&self) -> Node {
        let document = ViewDocument {
            name: self.name.clone(),
            collection_id: self.collection_id,
            fields: self.fields.clone(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
        };
        let data = match serde_json::to_value(document) {
            Ok(Value::Object(map)) => map,
            _ => NodeData::new(),
        };
        Node {
            id: self.id,
            ..Node::new(VIEW_NODE_TYPE, data)
        }
    }

    /// The allow-list, if this view actually restricts columns
    pub fn allow_list(&self) -> Option<&[String]> {
        self.fields.as_deref().filter(|fields| !fields.is_empty())
    }

    pub fn applies_to(&self, collection: &Collection) -> bool {
        match (self.collection_id, collection.id) {
            (Some(view_target), Some(id)) => view_target == id,
            _ => false,
        }
    }
}
