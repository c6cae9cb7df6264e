//! Development-only HTTP server standing in for the remote store
//!
//! Exposes any [`NodeStore`] over exactly the REST contract `HttpStore`
//! consumes, so the client stack can be exercised end to end without the
//! real store. Usually run over a `MemoryStore`:
//!
//! ```bash
//! cargo run --bin nodeform-dev-server
//! NODEFORM_DEV_PORT=3002 RUST_LOG=debug cargo run --bin nodeform-dev-server
//! ```
//!
//! # Security
//!
//! - CORS restricted to localhost dev origins (override with `CORS_ALLOW_ORIGIN`)
//! - No authentication (local development only)

use axum::{
    http::{header, Method},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::NodeStore;

mod http_error;
mod node_endpoints;

pub use http_error::HttpError;

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NodeStore>,
}

/// Create the application router
pub fn create_router(store: Arc<dyn NodeStore>) -> Router {
    let state = AppState { store };
    Router::new()
        .merge(node_endpoints::routes(state))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Allows the usual local frontend origins, or the one named by
/// `CORS_ALLOW_ORIGIN`
fn cors_layer() -> CorsLayer {
    let default_origins = [
        "http://localhost:1420",
        "http://localhost:5173",
        "http://localhost:3000",
    ];

    let configured = std::env::var("CORS_ALLOW_ORIGIN").ok().and_then(|origin| {
        match origin.parse::<header::HeaderValue>() {
            Ok(value) => Some(vec![value]),
            Err(_) => {
                tracing::warn!(%origin, "Invalid CORS_ALLOW_ORIGIN, using defaults");
                None
            }
        }
    });

    let origins = configured.unwrap_or_else(|| {
        default_origins
            .iter()
            .map(|o| header::HeaderValue::from_static(o))
            .collect()
    });

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .allow_credentials(false)
}

/// Serve on an already bound listener until the task is dropped
pub async fn serve(listener: TcpListener, store: Arc<dyn NodeStore>) -> std::io::Result<()> {
    let app = create_router(store);
    axum::serve(listener, app).await
}

/// Bind `127.0.0.1:{port}` and serve
///
/// # Errors
///
/// Returns error if the port cannot be bound or the server stops abnormally.
pub async fn start_server(store: Arc<dyn NodeStore>, port: u16) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Dev store listening on http://{}/api", addr);
    tracing::info!("Development mode only - NOT for production use");
    serve(listener, store).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router() -> Router {
        create_router(Arc::new(MemoryStore::new()))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/api/health").body(Body::empty()).unwrap();
        let (status, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_strips_companions_and_get_roundtrips() {
        let app = router();
        let request = json_request(
            "POST",
            "/api/nodes",
            json!({ "type": "task", "data": { "title": "T", "__owner": { "id": 1 } } }),
        );
        let (status, created) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["data"].get("__owner").is_none());

        let id = created["id"].as_i64().unwrap();
        let request = Request::get(format!("/api/nodes/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, fetched) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["title"], "T");
    }

    #[tokio::test]
    async fn test_missing_node_is_404_with_code() {
        let request = Request::get("/api/nodes/42").body(Body::empty()).unwrap();
        let (status, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NODE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_requires_a_filter() {
        let request = Request::get("/api/nodes").body(Body::empty()).unwrap();
        let (status, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected() {
        let request = json_request("POST", "/api/nodes", json!({ "type": "", "data": {} }));
        let (status, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_batch_route_is_not_shadowed_by_id() {
        let request = json_request(
            "POST",
            "/api/nodes/batch",
            json!([{ "type": "task", "data": {} }, { "type": "", "data": {} }]),
        );
        let (status, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["status"], "success");
        assert_eq!(body[1]["status"], "failed");
    }
}
