//! Collection Service
//!
//! Schema-driven CRUD for any record type. A business tab (companies,
//! annual returns, compliance filings, ...) is one Collection plus this
//! service: load the definition, generate the form and table from it, list
//! and save records. No record type gets its own hand-written CRUD code.
//!
//! List operations never fail past this boundary: a store error becomes an
//! empty [`RecordList`] carrying a user-visible message.

use super::error::ServiceError;
use super::form_config::FormConfig;
use super::node_service::NodeService;
use super::table_config::TableConfig;
use crate::config::ClientConfig;
use crate::models::{Collection, Node, NodeId, View, COLLECTION_NODE_TYPE, VIEW_NODE_TYPE};

/// Records of one Collection, or why they could not be loaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordList {
    pub nodes: Vec<Node>,
    pub error: Option<String>,
}

impl RecordList {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Ownership stamped on newly created records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOwner {
    pub parent_id: Option<NodeId>,
    pub company_id: Option<NodeId>,
}

impl RecordOwner {
    pub fn company(company_id: NodeId) -> Self {
        Self {
            parent_id: None,
            company_id: Some(company_id),
        }
    }

    pub fn parent(parent_id: NodeId) -> Self {
        Self {
            parent_id: Some(parent_id),
            company_id: None,
        }
    }

    /// Id used for owner lookups; the company wins when both are set
    fn lookup_id(&self) -> Option<NodeId> {
        self.company_id.or(self.parent_id)
    }
}

#[derive(Clone)]
pub struct CollectionService {
    client: NodeService,
    config: ClientConfig,
}

impl CollectionService {
    pub fn new(client: NodeService, config: ClientConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &NodeService {
        &self.client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn load_collection(&self, id: NodeId) -> Result<Collection, ServiceError> {
        let node = self.client.get_by_id(id).await?;
        Ok(Collection::from_node(&node)?)
    }

    /// Every stored Collection; definitions that fail to decode are skipped
    pub async fn list_collections(&self) -> Result<Vec<Collection>, ServiceError> {
        let nodes = self.client.get_by_type(COLLECTION_NODE_TYPE).await?;
        Ok(nodes
            .iter()
            .filter_map(|node| match Collection::from_node(node) {
                Ok(collection) => Some(collection),
                Err(err) => {
                    tracing::warn!(id = ?node.id, "Skipping undecodable collection: {}", err);
                    None
                }
            })
            .collect())
    }

    pub async fn load_view(&self, id: NodeId) -> Result<View, ServiceError> {
        let node = self.client.get_by_id(id).await?;
        Ok(View::from_node(&node)?)
    }

    pub async fn views_for_collection(
        &self,
        collection: &Collection,
    ) -> Result<Vec<View>, ServiceError> {
        let nodes = self.client.get_by_type(VIEW_NODE_TYPE).await?;
        Ok(nodes
            .iter()
            .filter_map(|node| View::from_node(node).ok())
            .filter(|view| view.applies_to(collection))
            .collect())
    }

    /// Form with every relationship option list loaded
    pub async fn build_form(&self, collection: &Collection, editing: Option<&Node>) -> FormConfig {
        FormConfig::generate(collection, editing, &self.client).await
    }

    /// Form for an existing record, fetched fresh from the store
    pub async fn build_edit_form(
        &self,
        collection: &Collection,
        record_id: NodeId,
    ) -> Result<FormConfig, ServiceError> {
        let node = self.client.get_by_id(record_id).await?;
        Ok(self.build_form(collection, Some(&node)).await)
    }

    pub fn build_table(&self, collection: &Collection, view: Option<&View>) -> TableConfig {
        TableConfig::build(collection, view, &self.config)
    }

    /// Records of `collection`, optionally restricted to one owner
    pub async fn list_records(
        &self,
        collection: &Collection,
        owner: Option<RecordOwner>,
    ) -> RecordList {
        let Some(node_type) = collection.node_type() else {
            return RecordList {
                nodes: Vec::new(),
                error: Some(format!(
                    "Collection '{}' has no record type",
                    collection.name
                )),
            };
        };

        let result = match owner.and_then(|o| o.lookup_id()) {
            Some(owner_id) => self.client.get_by_owner(owner_id, Some(&node_type)).await,
            None => self.client.get_by_type(&node_type).await,
        };

        match result {
            Ok(nodes) => RecordList { nodes, error: None },
            Err(err) => RecordList {
                nodes: Vec::new(),
                error: Some(ServiceError::from(err).user_message()),
            },
        }
    }

    /// Validate the form and write it. Nothing is sent when validation fails.
    ///
    /// New records get the Collection's node type and `owner`; edited records
    /// keep their own envelope.
    pub async fn save_form(
        &self,
        form: &FormConfig,
        owner: Option<RecordOwner>,
    ) -> Result<Node, ServiceError> {
        let mut node = form.to_node()?;
        if node.id.is_none() {
            if let Some(owner) = owner {
                node.parent_id = node.parent_id.or(owner.parent_id);
                node.company_id = node.company_id.or(owner.company_id);
            }
        }
        Ok(self.client.save(node).await?)
    }

    pub async fn delete_record(&self, id: NodeId) -> Result<(), ServiceError> {
        Ok(self.client.delete(id).await?)
    }
}
