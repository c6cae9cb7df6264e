//! Form Configuration Generator
//!
//! Turns a Collection (and optionally the node being edited) into a tree of
//! validatable controls:
//!
//! ```text
//! FormConfig                      valid iff every group is valid
//! ├── FormGroup "contact"         one per schema Group, in display order
//! │   ├── FormControl name        value + validators + options
//! │   └── FormControl owner
//! └── FormGroup "ungrouped"       only when some field has no group
//! ```
//!
//! Initial values come from the edited node's data, else the field default,
//! else the type's empty value. Relationship options are loaded separately
//! through [`FormConfig::resolve_options`]; extraction parses json text and
//! re-normalizes select values against each field's `multiple` flag.

use super::error::{FieldError, ServiceError, ValidationFailure};
use super::node_service::NodeService;
use crate::db::SelectOption;
use crate::models::{
    Collection, Field, FieldType, FieldValue, Group, Node, NodeData, NodeId, SchemaReport,
    ValidationError,
};
use futures::future::join_all;
use serde_json::Value;

/// Id of the synthetic group holding fields without a `groupId`
pub const UNGROUPED_GROUP_ID: &str = "ungrouped";
pub const UNGROUPED_GROUP_NAME: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Value must be present (non-null, non-empty string, non-empty list)
    Required,
    /// Text must parse as JSON; empty text passes
    Json,
}

impl Validator {
    pub fn check(&self, value: &FieldValue) -> Option<FieldError> {
        match self {
            Validator::Required => value.is_empty().then_some(FieldError::Required),
            Validator::Json => match value {
                FieldValue::Json(text) if !text.trim().is_empty() => {
                    serde_json::from_str::<Value>(text)
                        .err()
                        .map(|_| FieldError::InvalidJson)
                }
                _ => None,
            },
        }
    }
}

/// One input control bound to a schema field
#[derive(Debug, Clone, PartialEq)]
pub struct FormControl {
    pub field: Field,
    pub value: FieldValue,
    pub validators: Vec<Validator>,
    /// Choices for select fields
    pub options: Vec<SelectOption>,
    /// Set when a relationship option list failed to load
    pub options_error: Option<String>,
    options_loaded: bool,
}

impl FormControl {
    fn new(field: &Field, editing: Option<&Node>) -> Self {
        let from_node = editing
            .and_then(|node| node.data.get(&field.key))
            .filter(|v| !v.is_null());
        let from_default = field.default.as_ref().filter(|v| !v.is_null());
        let value = match from_node.or(from_default) {
            Some(raw) => FieldValue::read(field, raw),
            None => FieldValue::empty(field),
        };

        let mut validators = Vec::new();
        if field.required {
            validators.push(Validator::Required);
        }
        if field.field_type == FieldType::Json {
            validators.push(Validator::Json);
        }

        let (options, options_loaded) = if field.is_relationship() {
            (Vec::new(), false)
        } else {
            let options = field
                .options
                .iter()
                .map(|option| SelectOption::new(option.as_str(), option.as_str()))
                .collect();
            (options, true)
        };

        Self {
            field: field.clone(),
            value,
            validators,
            options,
            options_error: None,
            options_loaded,
        }
    }

    pub fn key(&self) -> &str {
        &self.field.key
    }

    /// Whether this control still waits on a relationship option list
    pub fn needs_options(&self) -> bool {
        !self.options_loaded && self.field.source_collection_id.is_some()
    }

    pub fn options_loaded(&self) -> bool {
        self.options_loaded
    }

    /// Set from a raw JSON value, normalizing it for the field
    pub fn set_value(&mut self, raw: &Value) {
        self.value = FieldValue::read(&self.field, raw);
    }

    pub fn errors(&self) -> Vec<FieldError> {
        self.validators
            .iter()
            .filter_map(|v| v.check(&self.value))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Value as it should be written to node data
    pub fn extract(&self) -> Value {
        self.value.extract(&self.field)
    }
}

/// Independently validatable section of a form
#[derive(Debug, Clone, PartialEq)]
pub struct FormGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub order: i64,
    pub controls: Vec<FormControl>,
}

impl FormGroup {
    fn from_group(group: &Group, controls: Vec<FormControl>) -> Self {
        Self {
            id: group.id.clone(),
            name: group.name.clone(),
            description: group.description.clone(),
            order: group.order,
            controls,
        }
    }

    pub fn control(&self, key: &str) -> Option<&FormControl> {
        self.controls.iter().find(|c| c.key() == key)
    }

    pub fn validate(&self) -> Vec<ValidationFailure> {
        self.controls
            .iter()
            .flat_map(|control| {
                control.errors().into_iter().map(|error| ValidationFailure {
                    group_id: self.id.clone(),
                    field_key: control.field.key.clone(),
                    error,
                })
            })
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.controls.iter().all(FormControl::is_valid)
    }
}

/// Generated form for one Collection
#[derive(Debug, Clone, PartialEq)]
pub struct FormConfig {
    pub collection_id: Option<NodeId>,
    pub collection_name: String,
    /// Node type stamped on newly created records
    pub node_type: Option<String>,
    pub groups: Vec<FormGroup>,
    /// Schema issues found while generating; offending fields were skipped
    pub report: SchemaReport,
    editing: Option<Node>,
}

impl FormConfig {
    /// Build the control tree. Static options are filled in; relationship
    /// options still need [`FormConfig::resolve_options`].
    pub fn build(collection: &Collection, editing: Option<&Node>) -> Self {
        let report = collection.validate();
        collection.log_issues(&report);
        let fields = collection.renderable_fields(&report);

        let mut groups: Vec<FormGroup> = collection
            .ordered_groups()
            .into_iter()
            .map(|group| {
                let controls = fields
                    .iter()
                    .filter(|f| f.group_ref() == Some(group.id.as_str()))
                    .map(|f| FormControl::new(f, editing))
                    .collect();
                FormGroup::from_group(group, controls)
            })
            .collect();

        let ungrouped: Vec<FormControl> = fields
            .iter()
            .filter(|f| f.group_ref().is_none())
            .map(|f| FormControl::new(f, editing))
            .collect();
        if !ungrouped.is_empty() {
            groups.push(FormGroup {
                id: UNGROUPED_GROUP_ID.to_string(),
                name: UNGROUPED_GROUP_NAME.to_string(),
                description: None,
                order: groups.iter().map(|g| g.order).max().unwrap_or(0) + 1,
                controls: ungrouped,
            });
        }

        Self {
            collection_id: collection.id,
            collection_name: collection.name.clone(),
            node_type: collection.node_type(),
            groups,
            report,
            editing: editing.cloned(),
        }
    }

    /// Build the form and load every relationship option list
    pub async fn generate(
        collection: &Collection,
        editing: Option<&Node>,
        client: &NodeService,
    ) -> Self {
        let mut form = Self::build(collection, editing);
        form.resolve_options(client).await;
        form
    }

    /// Load option lists for relationship selects concurrently.
    ///
    /// Each list is independent: a failure leaves that control with no
    /// options and an `options_error`, the others are unaffected.
    pub async fn resolve_options(&mut self, client: &NodeService) {
        let pending: Vec<(usize, usize, NodeId, Option<String>)> = self
            .groups
            .iter()
            .enumerate()
            .flat_map(|(group_index, group)| {
                group
                    .controls
                    .iter()
                    .enumerate()
                    .filter(|(_, control)| control.needs_options())
                    .filter_map(move |(control_index, control)| {
                        let collection_id = control.field.source_collection_id?;
                        Some((
                            group_index,
                            control_index,
                            collection_id,
                            control.field.label_field.clone(),
                        ))
                    })
            })
            .collect();

        let loads = pending
            .into_iter()
            .map(|(group_index, control_index, collection_id, label_field)| {
                let client = client.clone();
                async move {
                    let result = client
                        .get_collection_options(collection_id, label_field.as_deref())
                        .await;
                    (group_index, control_index, result)
                }
            });

        for (group_index, control_index, result) in join_all(loads).await {
            let control = &mut self.groups[group_index].controls[control_index];
            control.options_loaded = true;
            match result {
                Ok(options) => {
                    control.options = options;
                    control.options_error = None;
                }
                Err(err) => {
                    tracing::warn!(
                        field = %control.field.key,
                        "Relationship options unavailable: {}",
                        err
                    );
                    control.options = Vec::new();
                    control.options_error = Some(err.to_string());
                }
            }
        }
    }

    /// Whether every relationship option list has been loaded
    pub fn options_ready(&self) -> bool {
        self.controls().all(|c| !c.needs_options())
    }

    pub fn controls(&self) -> impl Iterator<Item = &FormControl> {
        self.groups.iter().flat_map(|g| g.controls.iter())
    }

    pub fn group(&self, group_id: &str) -> Option<&FormGroup> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn control(&self, key: &str) -> Option<&FormControl> {
        self.controls().find(|c| c.key() == key)
    }

    pub fn control_mut(&mut self, key: &str) -> Option<&mut FormControl> {
        self.groups
            .iter_mut()
            .flat_map(|g| g.controls.iter_mut())
            .find(|c| c.key() == key)
    }

    /// Set a control from a raw value; returns false for unknown keys
    pub fn set_value(&mut self, key: &str, raw: &Value) -> bool {
        match self.control_mut(key) {
            Some(control) => {
                control.set_value(raw);
                true
            }
            None => false,
        }
    }

    /// The node being edited, if any
    pub fn editing(&self) -> Option<&Node> {
        self.editing.as_ref()
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationFailure>> {
        let failures: Vec<ValidationFailure> =
            self.groups.iter().flat_map(FormGroup::validate).collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.groups.iter().all(FormGroup::is_valid)
    }

    /// Current values keyed by field, without validating
    pub fn extract(&self) -> NodeData {
        self.controls()
            .map(|control| (control.field.key.clone(), control.extract()))
            .collect()
    }

    /// Validate, then extract
    pub fn submit(&self) -> Result<NodeData, Vec<ValidationFailure>> {
        self.validate()?;
        Ok(self.extract())
    }

    /// Write payload for this form: extracted data in the edited node's
    /// envelope, or a fresh node stamped with the Collection's node type.
    pub fn to_node(&self) -> Result<Node, ServiceError> {
        let data = self.submit().map_err(ServiceError::Validation)?;

        if let Some(existing) = &self.editing {
            // fields skipped for schema issues keep their stored value
            let mut node = existing.without_hydration();
            node.data.extend(data);
            return Ok(node);
        }

        let node_type = self
            .node_type
            .clone()
            .ok_or_else(|| ValidationError::MissingField("targetType".to_string()))?;
        Ok(Node::new(node_type, data))
    }
}
