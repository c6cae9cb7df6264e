//! NodeService - the Node Store Client
//!
//! The single gateway every consumer uses to reach the record store. It adds
//! two things on top of a raw [`NodeStore`]:
//!
//! - **Payload hygiene**: `create`/`update` and the batch variants accept plain
//!   [`Node`]s and strip every hydration companion before transmission, so
//!   callers that hand-build payloads cannot leak `__` keys.
//! - **Logging**: each call is traced with its operation name; failures are
//!   logged at `warn` and returned as [`StoreError`].
//!
//! Nodes coming back are the store's authoritative, hydrated copies. This
//! client interprets hydration (see `hydration`), it never computes it.

use crate::db::{NodeStore, SelectOption, StoreError, StoreOperation, StoreResult};
use crate::models::{BatchItemResult, Node, NodeId, WriteNode};
use std::sync::Arc;

#[derive(Clone)]
pub struct NodeService {
    store: Arc<dyn NodeStore>,
}

impl NodeService {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub async fn get_by_id(&self, id: NodeId) -> StoreResult<Node> {
        tracing::debug!(operation = "getById", id, "Fetching node");
        self.store.get_node(id).await.inspect_err(log_failure)
    }

    pub async fn get_by_type(&self, node_type: &str) -> StoreResult<Vec<Node>> {
        tracing::debug!(operation = "getByType", node_type, "Listing nodes");
        self.store
            .get_nodes_by_type(node_type)
            .await
            .inspect_err(log_failure)
    }

    pub async fn get_by_owner(
        &self,
        owner_id: NodeId,
        node_type: Option<&str>,
    ) -> StoreResult<Vec<Node>> {
        tracing::debug!(operation = "getByOwner", owner_id, ?node_type, "Listing owned nodes");
        self.store
            .get_nodes_by_owner(owner_id, node_type)
            .await
            .inspect_err(log_failure)
    }

    /// Create a node; hydration companions on the input are dropped
    pub async fn create(&self, node: Node) -> StoreResult<Node> {
        let payload = WriteNode::new(node);
        tracing::debug!(operation = "create", node_type = %payload.as_node().node_type, "Creating node");
        let created = self
            .store
            .create_node(payload)
            .await
            .inspect_err(log_failure)?;
        tracing::info!(id = ?created.id, node_type = %created.node_type, "Node created");
        Ok(created)
    }

    /// Update a node; hydration companions on the input are dropped
    pub async fn update(&self, node: Node) -> StoreResult<Node> {
        let payload = WriteNode::new(node);
        tracing::debug!(operation = "update", id = ?payload.id(), "Updating node");
        self.store
            .update_node(payload)
            .await
            .inspect_err(log_failure)
    }

    /// Create when the node has no id yet, update otherwise
    pub async fn save(&self, node: Node) -> StoreResult<Node> {
        if node.id.is_some() {
            self.update(node).await
        } else {
            self.create(node).await
        }
    }

    pub async fn delete(&self, id: NodeId) -> StoreResult<()> {
        tracing::debug!(operation = "delete", id, "Deleting node");
        self.store.delete_node(id).await.inspect_err(log_failure)?;
        tracing::info!(id, "Node deleted");
        Ok(())
    }

    /// Create many nodes; each item succeeds or fails on its own
    pub async fn batch_create(&self, nodes: Vec<Node>) -> StoreResult<Vec<BatchItemResult>> {
        let expected = nodes.len();
        let payloads: Vec<WriteNode> = nodes.into_iter().map(WriteNode::new).collect();
        tracing::debug!(operation = "batchCreate", items = expected, "Batch creating nodes");
        let results = self
            .store
            .batch_create(payloads)
            .await
            .inspect_err(log_failure)?;
        check_batch(StoreOperation::BatchCreate, expected, results)
    }

    /// Update many nodes; each item succeeds or fails on its own
    pub async fn batch_update(&self, nodes: Vec<Node>) -> StoreResult<Vec<BatchItemResult>> {
        let expected = nodes.len();
        let payloads: Vec<WriteNode> = nodes.into_iter().map(WriteNode::new).collect();
        tracing::debug!(operation = "batchUpdate", items = expected, "Batch updating nodes");
        let results = self
            .store
            .batch_update(payloads)
            .await
            .inspect_err(log_failure)?;
        check_batch(StoreOperation::BatchUpdate, expected, results)
    }

    /// Id + label pairs for a relationship picker
    pub async fn get_collection_options(
        &self,
        collection_id: NodeId,
        label_field: Option<&str>,
    ) -> StoreResult<Vec<SelectOption>> {
        tracing::debug!(
            operation = "collectionOptions",
            collection_id,
            ?label_field,
            "Loading collection options"
        );
        self.store
            .collection_options(collection_id, label_field)
            .await
            .inspect_err(log_failure)
    }
}

fn log_failure(err: &StoreError) {
    tracing::warn!(operation = %err.operation, "Store call failed: {}", err.source);
}

fn check_batch(
    operation: StoreOperation,
    expected: usize,
    results: Vec<BatchItemResult>,
) -> StoreResult<Vec<BatchItemResult>> {
    if results.len() != expected {
        let err = StoreError::rejected(
            operation,
            format!("store returned {} results for {} items", results.len(), expected),
        );
        log_failure(&err);
        return Err(err);
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        tracing::warn!(operation = %operation, failed, total = expected, "Batch finished with failed items");
    }
    Ok(results)
}
