//! Business Services
//!
//! - `NodeService` - The Node Store Client every consumer goes through
//! - `hydration` - Reads `__` companions for display, strips them for writes
//! - `FormConfig` - Validatable form generated from a Collection
//! - `TableConfig` - Column layout, cell formatting, sort and search
//! - `ChipSelection` - Editor state for multi-valued relationships
//! - `AutoSaveScheduler` - Per-record debounced saving
//! - `CollectionService` - Schema-driven CRUD facade used by every record type

pub mod autosave;
pub mod chip_selection;
pub mod collection_service;
pub mod error;
pub mod form_config;
pub mod hydration;
pub mod node_service;
pub mod table_config;

pub use autosave::{AutoSaveScheduler, SaveStatus};
pub use chip_selection::ChipSelection;
pub use collection_service::{CollectionService, RecordList, RecordOwner};
pub use error::{FieldError, ServiceError, ValidationFailure};
pub use form_config::{FormConfig, FormControl, FormGroup, Validator};
pub use hydration::{extract_label, resolve_display, strip_hydrated};
pub use node_service::NodeService;
pub use table_config::{Column, ColumnGroup, ColumnWidth, TableConfig};
