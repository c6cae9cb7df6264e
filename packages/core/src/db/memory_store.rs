//! In-process reference store
//!
//! `MemoryStore` behaves like the remote store as far as callers can observe:
//! it assigns ids, stamps timestamps, applies batch items independently and
//! hydrates relationship fields on every read. It backs the dev server and
//! the test suite.
//!
//! Hydration finds the Collection owning a node (by `targetType`, or by the
//! collection id rendered as a string) and, for each relationship field,
//! attaches the related records' data plus their `id` under `__<key>`.
//! Only records of the field's source collection qualify. Targets that no
//! longer exist are skipped; a single relation pointing at a
//! deleted record gets no companion at all.

use super::error::{StoreError, StoreOperation, StoreResult};
use super::node_store::{NodeStore, SelectOption};
use crate::models::{
    companion_key, normalize_multiple, normalize_single, strip_companions, BatchItemResult,
    Collection, Node, NodeId, Resolved, WriteNode, COLLECTION_NODE_TYPE,
};
use crate::services::hydration::extract_label;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Thread-safe in-memory node store with hydration
pub struct MemoryStore {
    nodes: RwLock<BTreeMap<NodeId, Node>>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored nodes
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    /// Stored copy of a node exactly as persisted (no companions)
    pub async fn raw_node(&self, id: NodeId) -> Option<Node> {
        self.nodes.read().await.get(&id).cloned()
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    fn insert(&self, nodes: &mut BTreeMap<NodeId, Node>, payload: WriteNode) -> StoreResult<Node> {
        let mut node = payload.into_node();
        node.validate()
            .map_err(|e| StoreError::rejected(StoreOperation::Create, e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Self::now();
        node.id = Some(id);
        node.created_at = Some(now.clone());
        node.updated_at = Some(now);
        nodes.insert(id, node.clone());
        Ok(node)
    }

    fn replace(nodes: &mut BTreeMap<NodeId, Node>, payload: WriteNode) -> StoreResult<Node> {
        let update = payload.into_node();
        let id = update
            .id
            .ok_or_else(|| StoreError::rejected(StoreOperation::Update, "update requires an id"))?;
        let existing = nodes
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(StoreOperation::Update, id))?;

        if existing.node_type != update.node_type {
            return Err(StoreError::rejected(
                StoreOperation::Update,
                format!(
                    "node {} has type '{}' and cannot become '{}'",
                    id, existing.node_type, update.node_type
                ),
            ));
        }

        existing.data = update.data;
        if update.parent_id.is_some() {
            existing.parent_id = update.parent_id;
        }
        if update.company_id.is_some() {
            existing.company_id = update.company_id;
        }
        existing.updated_at = Some(Self::now());
        Ok(existing.clone())
    }

    fn collections(nodes: &BTreeMap<NodeId, Node>) -> Vec<Collection> {
        nodes
            .values()
            .filter(|n| n.node_type == COLLECTION_NODE_TYPE)
            .filter_map(|n| Collection::from_node(n).ok())
            .collect()
    }

    /// Data of a related record as embedded in a companion
    fn related_record(node: &Node) -> Value {
        let mut record = strip_companions(&node.data);
        if let Some(id) = node.id {
            record.insert("id".to_string(), Value::from(id));
        }
        Value::Object(record)
    }

    fn hydrate(nodes: &BTreeMap<NodeId, Node>, collections: &[Collection], node: &Node) -> Node {
        let mut hydrated = node.clone();
        let Some(collection) = collections.iter().find(|c| c.owns_type(&node.node_type)) else {
            return hydrated;
        };

        for field in collection.relationship_fields() {
            let resolved = Resolved::of(&node.data, &field.key);
            let Some(raw) = resolved.raw.as_ref() else {
                continue;
            };
            // An unknown source collection is unreachable: no companion
            let Some(source) = field
                .source_collection_id
                .and_then(|id| collections.iter().find(|c| c.id == Some(id)))
            else {
                continue;
            };
            let target = |id: NodeId| {
                nodes
                    .get(&id)
                    .filter(|related| source.owns_type(&related.node_type))
            };

            let companion = if field.multiple {
                let related: Vec<Value> = normalize_multiple(Some(raw))
                    .iter()
                    .filter_map(crate::models::id_from_value)
                    .filter_map(target)
                    .map(Self::related_record)
                    .collect();
                (!related.is_empty()).then_some(Value::Array(related))
            } else {
                crate::models::id_from_value(&normalize_single(Some(raw)))
                    .and_then(target)
                    .map(Self::related_record)
            };

            if let Some(companion) = companion {
                hydrated.data.insert(companion_key(&field.key), companion);
            }
        }
        hydrated
    }

    fn hydrate_all<'a>(
        nodes: &BTreeMap<NodeId, Node>,
        selected: impl Iterator<Item = &'a Node>,
    ) -> Vec<Node> {
        let collections = Self::collections(nodes);
        selected
            .map(|node| Self::hydrate(nodes, &collections, node))
            .collect()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn get_node(&self, id: NodeId) -> StoreResult<Node> {
        let nodes = self.nodes.read().await;
        let node = nodes
            .get(&id)
            .ok_or_else(|| StoreError::not_found(StoreOperation::GetById, id))?;
        let collections = Self::collections(&nodes);
        Ok(Self::hydrate(&nodes, &collections, node))
    }

    async fn get_nodes_by_type(&self, node_type: &str) -> StoreResult<Vec<Node>> {
        let nodes = self.nodes.read().await;
        let selected = nodes.values().filter(|n| n.node_type == node_type);
        Ok(Self::hydrate_all(&nodes, selected))
    }

    async fn get_nodes_by_owner(
        &self,
        owner_id: NodeId,
        node_type: Option<&str>,
    ) -> StoreResult<Vec<Node>> {
        let nodes = self.nodes.read().await;
        let selected = nodes.values().filter(|n| {
            n.is_owned_by(owner_id) && node_type.map_or(true, |t| n.node_type == t)
        });
        Ok(Self::hydrate_all(&nodes, selected))
    }

    async fn create_node(&self, node: WriteNode) -> StoreResult<Node> {
        let mut nodes = self.nodes.write().await;
        let created = self.insert(&mut nodes, node)?;
        let collections = Self::collections(&nodes);
        Ok(Self::hydrate(&nodes, &collections, &created))
    }

    async fn update_node(&self, node: WriteNode) -> StoreResult<Node> {
        let mut nodes = self.nodes.write().await;
        let updated = Self::replace(&mut nodes, node)?;
        let collections = Self::collections(&nodes);
        Ok(Self::hydrate(&nodes, &collections, &updated))
    }

    async fn delete_node(&self, id: NodeId) -> StoreResult<()> {
        let mut nodes = self.nodes.write().await;
        nodes
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(StoreOperation::Delete, id))
    }

    async fn batch_create(&self, payloads: Vec<WriteNode>) -> StoreResult<Vec<BatchItemResult>> {
        let mut nodes = self.nodes.write().await;
        let outcomes: Vec<StoreResult<Node>> = payloads
            .into_iter()
            .map(|payload| self.insert(&mut nodes, payload))
            .collect();
        Ok(Self::batch_results(&nodes, outcomes))
    }

    async fn batch_update(&self, payloads: Vec<WriteNode>) -> StoreResult<Vec<BatchItemResult>> {
        let mut nodes = self.nodes.write().await;
        let outcomes: Vec<StoreResult<Node>> = payloads
            .into_iter()
            .map(|payload| Self::replace(&mut nodes, payload))
            .collect();
        Ok(Self::batch_results(&nodes, outcomes))
    }

    async fn collection_options(
        &self,
        collection_id: NodeId,
        label_field: Option<&str>,
    ) -> StoreResult<Vec<SelectOption>> {
        let nodes = self.nodes.read().await;
        let collection = nodes
            .get(&collection_id)
            .and_then(|n| Collection::from_node(n).ok())
            .ok_or_else(|| StoreError::not_found(StoreOperation::CollectionOptions, collection_id))?;

        Ok(nodes
            .values()
            .filter(|n| collection.owns_type(&n.node_type))
            .filter_map(|n| {
                let id = n.id?;
                let label = extract_label(&Self::related_record(n), label_field);
                Some(SelectOption::new(id, label))
            })
            .collect())
    }
}

impl MemoryStore {
    fn batch_results(
        nodes: &BTreeMap<NodeId, Node>,
        outcomes: Vec<StoreResult<Node>>,
    ) -> Vec<BatchItemResult> {
        let collections = Self::collections(nodes);
        outcomes
            .into_iter()
            .map(|outcome| match outcome {
                Ok(node) => BatchItemResult::Success {
                    node: Self::hydrate(nodes, &collections, &node),
                },
                Err(err) => BatchItemResult::Failed {
                    error: err.source.to_string(),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, FieldType, NodeData};
    use serde_json::json;

    fn data(value: Value) -> NodeData {
        value.as_object().cloned().unwrap()
    }

    async fn seed_people(store: &MemoryStore) -> (NodeId, NodeId, NodeId) {
        let people = Collection::new("People")
            .with_target_type("person")
            .field(Field::new("name", FieldType::Text));
        let people_id = store
            .create_node(WriteNode::new(people.to_node()))
            .await
            .unwrap()
            .id
            .unwrap();
        let alice = store
            .create_node(WriteNode::new(Node::new("person", data(json!({ "name": "Alice" })))))
            .await
            .unwrap()
            .id
            .unwrap();
        let bob = store
            .create_node(WriteNode::new(Node::new("person", data(json!({ "name": "Bob" })))))
            .await
            .unwrap()
            .id
            .unwrap();
        (people_id, alice, bob)
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let store = MemoryStore::new();
        let created = store
            .create_node(WriteNode::new(Node::new("note", NodeData::new())))
            .await
            .unwrap();
        assert_eq!(created.id, Some(1));
        assert!(created.created_at.is_some());
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_hydrates_single_and_multiple_relations() {
        let store = MemoryStore::new();
        let (people_id, alice, bob) = seed_people(&store).await;

        let tasks = Collection::new("Tasks")
            .with_target_type("task")
            .field(Field::new("owner", FieldType::Select).relation(people_id, None))
            .field(Field::new("reviewers", FieldType::Select).relation(people_id, None).multiple());
        store.create_node(WriteNode::new(tasks.to_node())).await.unwrap();

        let task = store
            .create_node(WriteNode::new(Node::new(
                "task",
                data(json!({ "owner": alice, "reviewers": [alice, bob, 999] })),
            )))
            .await
            .unwrap();

        assert_eq!(task.data["__owner"], json!({ "name": "Alice", "id": alice }));
        assert_eq!(task.data["__reviewers"].as_array().unwrap().len(), 2);

        let raw = store.raw_node(task.id.unwrap()).await.unwrap();
        assert!(raw.hydrated_keys().next().is_none());
    }

    #[tokio::test]
    async fn test_deleted_target_yields_missing_companion() {
        let store = MemoryStore::new();
        let (people_id, alice, _bob) = seed_people(&store).await;
        let tasks = Collection::new("Tasks")
            .with_target_type("task")
            .field(Field::new("owner", FieldType::Select).relation(people_id, None));
        store.create_node(WriteNode::new(tasks.to_node())).await.unwrap();
        let task = store
            .create_node(WriteNode::new(Node::new("task", data(json!({ "owner": alice })))))
            .await
            .unwrap();

        store.delete_node(alice).await.unwrap();
        let fetched = store.get_node(task.id.unwrap()).await.unwrap();
        assert_eq!(fetched.data["owner"], json!(alice));
        assert!(fetched.data.get("__owner").is_none());
    }

    #[tokio::test]
    async fn test_unknown_source_collection_is_not_hydrated() {
        let store = MemoryStore::new();
        let (people_id, alice, _bob) = seed_people(&store).await;
        let tasks = Collection::new("Tasks")
            .with_target_type("task")
            .field(Field::new("owner", FieldType::Select).relation(people_id + 100, None))
            .field(Field::new("lead", FieldType::Select).relation(people_id, None));
        store.create_node(WriteNode::new(tasks.to_node())).await.unwrap();

        // `lead` points at a node that exists but is not a person
        let task = store
            .create_node(WriteNode::new(Node::new(
                "task",
                data(json!({ "owner": alice, "lead": people_id })),
            )))
            .await
            .unwrap();
        assert!(task.hydrated_keys().next().is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_type_change_and_missing_id() {
        let store = MemoryStore::new();
        let created = store
            .create_node(WriteNode::new(Node::new("note", NodeData::new())))
            .await
            .unwrap();

        let retyped = Node {
            node_type: "task".to_string(),
            ..created.clone()
        };
        let err = store.update_node(WriteNode::new(retyped)).await.unwrap_err();
        assert_eq!(err.operation, StoreOperation::Update);

        let no_id = Node::new("note", NodeData::new());
        assert!(store.update_node(WriteNode::new(no_id)).await.is_err());

        let missing = Node::new("note", NodeData::new()).with_id(404);
        assert!(store
            .update_node(WriteNode::new(missing))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_get_by_owner_filters_type() {
        let store = MemoryStore::new();
        for node_type in ["swot", "swot", "gps"] {
            store
                .create_node(WriteNode::new(Node::new(node_type, NodeData::new()).with_company(50)))
                .await
                .unwrap();
        }
        store
            .create_node(WriteNode::new(Node::new("swot", NodeData::new()).with_company(51)))
            .await
            .unwrap();

        assert_eq!(store.get_nodes_by_owner(50, None).await.unwrap().len(), 3);
        assert_eq!(store.get_nodes_by_owner(50, Some("swot")).await.unwrap().len(), 2);
        assert_eq!(store.get_nodes_by_type("swot").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_collection_options_use_label_cascade() {
        let store = MemoryStore::new();
        let (people_id, alice, bob) = seed_people(&store).await;

        let options = store.collection_options(people_id, None).await.unwrap();
        assert_eq!(
            options,
            vec![SelectOption::new(alice, "Alice"), SelectOption::new(bob, "Bob")]
        );

        let err = store.collection_options(777, None).await.unwrap_err();
        assert_eq!(err.operation, StoreOperation::CollectionOptions);
    }
}
