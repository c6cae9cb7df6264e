//! Node endpoints for the HTTP dev server
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `GET /api/nodes?type=&owner=` - List nodes by type and/or owner
//! - `POST /api/nodes` - Create a node
//! - `GET /api/nodes/:id` - Get a node by ID
//! - `PUT /api/nodes/:id` - Update a node
//! - `DELETE /api/nodes/:id` - Delete a node
//! - `POST /api/nodes/batch` - Create many nodes
//! - `PUT /api/nodes/batch` - Update many nodes
//! - `GET /api/collections/:id/options?labelField=` - Relationship picker options

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use super::http_error::INVALID_INPUT;
use super::{AppState, HttpError};
use crate::db::SelectOption;
use crate::models::{BatchItemResult, Node, NodeId, WriteNode};

/// Query parameters for node listing
#[derive(Debug, Deserialize)]
pub struct NodeQuery {
    #[serde(rename = "type")]
    node_type: Option<String>,
    owner: Option<NodeId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsQuery {
    label_field: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// ```bash
/// curl http://localhost:3001/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List nodes. `owner` takes precedence and may be narrowed by `type`.
///
/// ```bash
/// curl "http://localhost:3001/api/nodes?type=company"
/// curl "http://localhost:3001/api/nodes?owner=5&type=annual_return"
/// ```
async fn list_nodes(
    State(state): State<AppState>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<Vec<Node>>, HttpError> {
    let nodes = match (query.owner, query.node_type.as_deref()) {
        (Some(owner), node_type) => state.store.get_nodes_by_owner(owner, node_type).await?,
        (None, Some(node_type)) => state.store.get_nodes_by_type(node_type).await?,
        (None, None) => {
            return Err(HttpError::new(
                "Either 'type' or 'owner' must be given",
                INVALID_INPUT,
            ))
        }
    };
    Ok(Json(nodes))
}

/// Create a node
///
/// ```bash
/// curl -X POST http://localhost:3001/api/nodes \
///   -H "Content-Type: application/json" \
///   -d '{"type": "company", "data": {"name": "Acme"}}'
/// ```
async fn create_node(
    State(state): State<AppState>,
    Json(node): Json<Node>,
) -> Result<(StatusCode, Json<Node>), HttpError> {
    let created = state.store.create_node(WriteNode::new(node)).await?;
    tracing::debug!(id = ?created.id, node_type = %created.node_type, "Created node");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
) -> Result<Json<Node>, HttpError> {
    Ok(Json(state.store.get_node(id).await?))
}

/// Update a node; the path id wins over any id in the body
async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
    Json(node): Json<Node>,
) -> Result<Json<Node>, HttpError> {
    let payload = WriteNode::new(node.with_id(id));
    Ok(Json(state.store.update_node(payload).await?))
}

async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
) -> Result<StatusCode, HttpError> {
    state.store.delete_node(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn batch_create(
    State(state): State<AppState>,
    Json(nodes): Json<Vec<WriteNode>>,
) -> Result<Json<Vec<BatchItemResult>>, HttpError> {
    Ok(Json(state.store.batch_create(nodes).await?))
}

async fn batch_update(
    State(state): State<AppState>,
    Json(nodes): Json<Vec<WriteNode>>,
) -> Result<Json<Vec<BatchItemResult>>, HttpError> {
    Ok(Json(state.store.batch_update(nodes).await?))
}

async fn collection_options(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
    Query(query): Query<OptionsQuery>,
) -> Result<Json<Vec<SelectOption>>, HttpError> {
    let options = state
        .store
        .collection_options(id, query.label_field.as_deref())
        .await?;
    Ok(Json(options))
}

/// Create node routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/nodes", get(list_nodes).post(create_node))
        .route(
            "/api/nodes/batch",
            post(batch_create).put(batch_update),
        )
        .route(
            "/api/nodes/:id",
            get(get_node).put(update_node).delete(delete_node),
        )
        .route("/api/collections/:id/options", get(collection_options))
        .with_state(state)
}
