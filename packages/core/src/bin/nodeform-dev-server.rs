//! Development Store Server Binary
//!
//! Serves an in-memory store over the same REST contract the client's
//! `HttpStore` speaks, so forms and tables can be exercised locally.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin nodeform-dev-server
//!
//! # Custom port
//! NODEFORM_DEV_PORT=3002 cargo run --bin nodeform-dev-server
//! ```
//!
//! # Environment Variables
//!
//! - `NODEFORM_DEV_PORT`: Server port (default: 3001)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::sync::Arc;

use nodeform_core::config::ClientConfig;
use nodeform_core::db::MemoryStore;
use nodeform_core::dev_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("NodeForm dev store");
    tracing::info!("Port: {}", config.dev_server_port);

    let store = Arc::new(MemoryStore::new());
    dev_server::start_server(store, config.dev_server_port).await?;

    Ok(())
}
