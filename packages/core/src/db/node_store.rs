//! NodeStore Trait - Remote Store Contract
//!
//! The record store is an opaque service reached through a fixed set of
//! request/response calls. This trait is that contract; `HttpStore` speaks it
//! over HTTP and `MemoryStore` implements it in process.
//!
//! # Guarantees expected from implementations
//!
//! - Every node returned is already hydrated: each resolvable relationship
//!   field has a `__<key>` companion. A relationship whose target was deleted
//!   simply has no companion.
//! - Write methods only accept [`WriteNode`], so companions never travel back.
//! - Batch methods apply every item independently and report one
//!   [`BatchItemResult`] per input, in input order.
//! - List ordering is store-defined (insertion order for the bundled stores).
//!
//! ```rust,no_run
//! use nodeform_core::db::{MemoryStore, NodeStore};
//! use nodeform_core::models::{Node, NodeData, WriteNode};
//! use std::sync::Arc;
//!
//! # async fn example() -> nodeform_core::db::StoreResult<()> {
//! let store: Arc<dyn NodeStore> = Arc::new(MemoryStore::new());
//! let created = store
//!     .create_node(WriteNode::new(Node::new("task", NodeData::new())))
//!     .await?;
//! let fetched = store.get_node(created.id.unwrap_or_default()).await?;
//! # Ok(())
//! # }
//! ```

use super::error::StoreResult;
use crate::models::{BatchItemResult, Node, NodeId, WriteNode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Id + label projection used to fill relationship pickers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: serde_json::Value,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<serde_json::Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Abstraction over the remote record store
///
/// Implementations must be `Send + Sync`; independent widgets issue calls
/// concurrently and complete in any order.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Fetch one hydrated node
    ///
    /// # Errors
    ///
    /// `StoreFailure::NotFound` if no node has this id.
    async fn get_node(&self, id: NodeId) -> StoreResult<Node>;

    /// All nodes of one type
    async fn get_nodes_by_type(&self, node_type: &str) -> StoreResult<Vec<Node>>;

    /// Nodes owned by `owner_id` (through `parent_id` or `company_id`),
    /// optionally narrowed to one type
    async fn get_nodes_by_owner(
        &self,
        owner_id: NodeId,
        node_type: Option<&str>,
    ) -> StoreResult<Vec<Node>>;

    /// Create a node; returns the store's authoritative, hydrated copy
    async fn create_node(&self, node: WriteNode) -> StoreResult<Node>;

    /// Replace a node's data; the payload must carry the id
    async fn update_node(&self, node: WriteNode) -> StoreResult<Node>;

    async fn delete_node(&self, id: NodeId) -> StoreResult<()>;

    async fn batch_create(&self, nodes: Vec<WriteNode>) -> StoreResult<Vec<BatchItemResult>>;

    async fn batch_update(&self, nodes: Vec<WriteNode>) -> StoreResult<Vec<BatchItemResult>>;

    /// `{value, label}` pairs for every record of a Collection, labelled with
    /// `label_field` when it is set on the record
    async fn collection_options(
        &self,
        collection_id: NodeId,
        label_field: Option<&str>,
    ) -> StoreResult<Vec<SelectOption>>;
}
