//! Data Models
//!
//! Pure data used throughout NodeForm:
//!
//! - `Node` - Universal record envelope with an open `data` map
//! - `Collection` / `Field` / `Group` - Runtime-defined record shapes, stored as nodes
//! - `View` - Column allow-list overlay for a Collection's table
//! - `Resolved` - Raw relationship value paired with its hydration companion
//! - `FieldValue` - Typed value of one form control

mod node;
mod resolved;
pub mod schema;
mod value;
mod view;

pub use node::{
    companion_key, id_from_value, is_companion_key, strip_companions, BatchItemResult, Node,
    NodeData, NodeId, ValidationError, WriteNode, COLLECTION_NODE_TYPE, HYDRATION_PREFIX,
    VIEW_NODE_TYPE,
};
pub use resolved::{Companion, Resolved};
pub use schema::{
    Collection, Field, FieldSource, FieldType, Group, SchemaIssue, SchemaReport, UndecodableEntry,
};
pub use value::{
    is_empty_entry, normalize_for_field, normalize_multiple, normalize_single, FieldValue,
};
pub use view::{SortDirection, View, ViewSort};
