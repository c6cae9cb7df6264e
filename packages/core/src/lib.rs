//! NodeForm Core
//!
//! Schema-driven record engine. Record shapes are defined at runtime as
//! Collections stored in a remote record store; this crate turns them into
//! validated forms and configured tables, and reads and writes records
//! through a single client.
//!
//! # Architecture
//!
//! - **Schema-as-Node**: Collections and Views are nodes of type `collection`/`view`
//! - **Hydration**: the store attaches related records as `__<key>` companions;
//!   they are read for display and can never be written back (`WriteNode`)
//! - **Degrade, don't fail**: schema issues skip fields, missing companions
//!   fall back to raw ids, list failures yield empty lists with a message
//!
//! # Modules
//!
//! - [`models`] - Node, Collection/Field/Group, View, typed field values
//! - [`db`] - The `NodeStore` contract, HTTP transport and in-memory store
//! - [`services`] - Store client, hydration, form/table generators, auto-save
//! - [`config`] - Runtime configuration
//! - [`dev_server`] - Local HTTP stand-in for the remote store

pub mod config;
pub mod db;
pub mod dev_server;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::ClientConfig;
pub use db::{HttpStore, MemoryStore, NodeStore, StoreError, StoreResult};
pub use models::*;
pub use services::*;
