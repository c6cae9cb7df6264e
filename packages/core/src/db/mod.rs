//! Store Layer
//!
//! Everything that talks to (or stands in for) the remote record store:
//!
//! - `NodeStore` - The fixed request/response contract
//! - `HttpStore` - JSON-over-HTTP transport to the remote store
//! - `MemoryStore` - In-process store with the same observable behaviour,
//!   including relationship hydration
//! - `StoreError` - Failures tagged with the operation that failed
//!
//! Callers normally go through `services::NodeService`, which adds payload
//! stripping and logging on top of any `NodeStore`.

mod error;
mod http_store;
mod memory_store;
mod node_store;

pub use error::{StoreError, StoreFailure, StoreOperation, StoreResult};
pub use http_store::HttpStore;
pub use memory_store::MemoryStore;
pub use node_store::{NodeStore, SelectOption};
