//! HTTP transport for the remote store
//!
//! Maps every `NodeStore` call onto one JSON request/response pair:
//!
//! | operation            | request                                        |
//! |----------------------|------------------------------------------------|
//! | get by id            | `GET    {base}/nodes/{id}`                     |
//! | get by type          | `GET    {base}/nodes?type={type}`              |
//! | get by owner         | `GET    {base}/nodes?owner={id}[&type={type}]` |
//! | create               | `POST   {base}/nodes`                          |
//! | update               | `PUT    {base}/nodes/{id}`                     |
//! | delete               | `DELETE {base}/nodes/{id}`                     |
//! | batch create         | `POST   {base}/nodes/batch`                    |
//! | batch update         | `PUT    {base}/nodes/batch`                    |
//! | collection options   | `GET    {base}/collections/{id}/options[?labelField=]` |
//!
//! 404 becomes `StoreFailure::NotFound`, other 4xx `Rejected`, anything else
//! non-2xx `Status`. Error bodies are `{ "message": ..., "code": ... }`.

use super::error::{StoreError, StoreOperation, StoreResult};
use super::node_store::{NodeStore, SelectOption};
use crate::config::ClientConfig;
use crate::models::{BatchItemResult, Node, NodeId, WriteNode};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// `NodeStore` implementation talking to the remote store over HTTP
#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    /// Build a store client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, &config.store_url))
    }

    /// Use an existing client (shared connection pool)
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn node_id_of(operation: StoreOperation, payload: &WriteNode) -> StoreResult<NodeId> {
        payload
            .id()
            .ok_or_else(|| StoreError::rejected(operation, "update requires an id"))
    }

    async fn execute(
        operation: StoreOperation,
        request: RequestBuilder,
        target: Option<NodeId>,
    ) -> StoreResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::new(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(body);

        tracing::warn!(
            operation = %operation,
            status = status.as_u16(),
            "Store request failed: {}",
            message
        );

        Err(match (status, target) {
            (StatusCode::NOT_FOUND, Some(id)) => StoreError::not_found(operation, id),
            (s, _) if s.is_client_error() && s != StatusCode::NOT_FOUND => {
                StoreError::rejected(operation, message)
            }
            (s, _) => StoreError::status(operation, s.as_u16(), message),
        })
    }

    async fn fetch<T: DeserializeOwned>(
        operation: StoreOperation,
        request: RequestBuilder,
        target: Option<NodeId>,
    ) -> StoreResult<T> {
        let response = Self::execute(operation, request, target).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::new(operation, e))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::new(operation, e))
    }
}

#[async_trait]
impl NodeStore for HttpStore {
    async fn get_node(&self, id: NodeId) -> StoreResult<Node> {
        let request = self.client.get(self.url(&format!("/nodes/{id}")));
        Self::fetch(StoreOperation::GetById, request, Some(id)).await
    }

    async fn get_nodes_by_type(&self, node_type: &str) -> StoreResult<Vec<Node>> {
        let request = self
            .client
            .get(self.url("/nodes"))
            .query(&[("type", node_type)]);
        Self::fetch(StoreOperation::GetByType, request, None).await
    }

    async fn get_nodes_by_owner(
        &self,
        owner_id: NodeId,
        node_type: Option<&str>,
    ) -> StoreResult<Vec<Node>> {
        let mut query = vec![("owner", owner_id.to_string())];
        if let Some(node_type) = node_type {
            query.push(("type", node_type.to_string()));
        }
        let request = self.client.get(self.url("/nodes")).query(&query);
        Self::fetch(StoreOperation::GetByOwner, request, None).await
    }

    async fn create_node(&self, node: WriteNode) -> StoreResult<Node> {
        let request = self.client.post(self.url("/nodes")).json(&node);
        Self::fetch(StoreOperation::Create, request, None).await
    }

    async fn update_node(&self, node: WriteNode) -> StoreResult<Node> {
        let id = Self::node_id_of(StoreOperation::Update, &node)?;
        let request = self
            .client
            .put(self.url(&format!("/nodes/{id}")))
            .json(&node);
        Self::fetch(StoreOperation::Update, request, Some(id)).await
    }

    async fn delete_node(&self, id: NodeId) -> StoreResult<()> {
        let request = self.client.delete(self.url(&format!("/nodes/{id}")));
        Self::execute(StoreOperation::Delete, request, Some(id)).await?;
        Ok(())
    }

    async fn batch_create(&self, nodes: Vec<WriteNode>) -> StoreResult<Vec<BatchItemResult>> {
        let request = self.client.post(self.url("/nodes/batch")).json(&nodes);
        Self::fetch(StoreOperation::BatchCreate, request, None).await
    }

    async fn batch_update(&self, nodes: Vec<WriteNode>) -> StoreResult<Vec<BatchItemResult>> {
        let request = self.client.put(self.url("/nodes/batch")).json(&nodes);
        Self::fetch(StoreOperation::BatchUpdate, request, None).await
    }

    async fn collection_options(
        &self,
        collection_id: NodeId,
        label_field: Option<&str>,
    ) -> StoreResult<Vec<SelectOption>> {
        let mut request = self
            .client
            .get(self.url(&format!("/collections/{collection_id}/options")));
        if let Some(label_field) = label_field {
            request = request.query(&[("labelField", label_field)]);
        }
        Self::fetch(StoreOperation::CollectionOptions, request, Some(collection_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let store = HttpStore::with_client(Client::new(), "http://localhost:3001/api/");
        assert_eq!(store.base_url(), "http://localhost:3001/api");
        assert_eq!(store.url("/nodes/4"), "http://localhost:3001/api/nodes/4");
    }

    #[test]
    fn test_update_without_id_is_rejected_locally() {
        let payload = WriteNode::new(Node::new("task", Default::default()));
        let err = HttpStore::node_id_of(StoreOperation::Update, &payload).unwrap_err();
        assert_eq!(err.operation, StoreOperation::Update);
    }
}
