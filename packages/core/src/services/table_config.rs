//! Table Configuration Generator
//!
//! Produces the column layout for a Collection's record table: the fixed
//! system columns `id` and `type` first, one column per schema field in
//! schema order, then the trailing `created_at` system column. A View may
//! narrow the set but never reorders or adds columns.
//!
//! Cells are rendered through [`TableConfig::display_value`], which never
//! fails: anything missing shows as `"-"`.

use super::hydration::{display_relationship, raw_display};
use crate::config::ClientConfig;
use crate::models::{
    Collection, Field, FieldSource, FieldType, Group, Node, NodeData, NodeId, Resolved,
    SchemaReport, SortDirection, View, ViewSort,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::Write;

/// Placeholder for missing or empty cells
pub const EMPTY_CELL: &str = "-";

pub const ID_COLUMN: &str = "id";
pub const TYPE_COLUMN: &str = "type";
pub const CREATED_COLUMN: &str = "created_at";

/// Columns kept regardless of a View's allow-list
pub const SYSTEM_COLUMN_KEYS: [&str; 3] = [ID_COLUMN, TYPE_COLUMN, CREATED_COLUMN];

/// Prefix shown for a relationship value with no hydration companion
pub const UNRESOLVED_PREFIX: &str = "ID: ";

/// Rendering width bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnWidth {
    Narrow,
    Medium,
    Wide,
}

impl ColumnWidth {
    pub fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Id | FieldType::Checkbox | FieldType::Number => ColumnWidth::Narrow,
            FieldType::Textarea | FieldType::Json => ColumnWidth::Wide,
            FieldType::Text
            | FieldType::Date
            | FieldType::Select
            | FieldType::Table
            | FieldType::Type
            | FieldType::Created => ColumnWidth::Medium,
        }
    }
}

/// Sort/search capability of a column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub sortable: bool,
    pub searchable: bool,
}

impl Capabilities {
    pub fn for_type(field_type: FieldType) -> Self {
        let (sortable, searchable) = match field_type {
            FieldType::Text | FieldType::Select | FieldType::Type => (true, true),
            FieldType::Textarea => (false, true),
            FieldType::Number | FieldType::Date | FieldType::Id | FieldType::Created => {
                (true, false)
            }
            FieldType::Checkbox | FieldType::Json | FieldType::Table => (false, false),
        };
        Self {
            sortable,
            searchable,
        }
    }
}

/// One table column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub width: ColumnWidth,
    pub sortable: bool,
    pub searchable: bool,
    pub system: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub source: FieldSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_collection_id: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,
    pub multiple: bool,
}

impl Column {
    fn system(key: &str, label: &str, field_type: FieldType) -> Self {
        let caps = Capabilities::for_type(field_type);
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type,
            width: ColumnWidth::for_type(field_type),
            sortable: caps.sortable,
            searchable: caps.searchable,
            system: true,
            group_id: None,
            source: FieldSource::Static,
            source_collection_id: None,
            label_field: None,
            multiple: false,
        }
    }

    fn from_field(field: &Field) -> Self {
        let caps = Capabilities::for_type(field.field_type);
        Self {
            key: field.key.clone(),
            label: field.display_label().to_string(),
            field_type: field.field_type,
            width: ColumnWidth::for_type(field.field_type),
            sortable: caps.sortable,
            searchable: caps.searchable,
            system: false,
            group_id: field.group_ref().map(str::to_string),
            source: field.source,
            source_collection_id: field.source_collection_id,
            label_field: field.label_field.clone(),
            multiple: field.multiple,
        }
    }

    pub fn is_relationship(&self) -> bool {
        self.field_type == FieldType::Select && self.source == FieldSource::Collection
    }

    /// Field view of this column, for the hydration interpreter
    fn as_field(&self) -> Field {
        let mut field = Field::new(self.key.clone(), self.field_type);
        field.source = self.source;
        field.source_collection_id = self.source_collection_id;
        field.label_field = self.label_field.clone();
        field.multiple = self.multiple;
        field
    }
}

/// Columns of one schema group, for grouped rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGroup<'a> {
    /// `None` for fields without a group
    pub group: Option<&'a Group>,
    pub columns: Vec<&'a Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    pub collection_id: Option<NodeId>,
    pub collection_name: String,
    pub columns: Vec<Column>,
    /// Schema groups in display order
    pub groups: Vec<Group>,
    /// Initial sort from the View, when its column is present
    pub default_sort: Option<ViewSort>,
    pub report: SchemaReport,
    date_format: String,
    json_preview_chars: usize,
}

impl TableConfig {
    pub fn build(collection: &Collection, view: Option<&View>, config: &ClientConfig) -> Self {
        let report = collection.validate();
        collection.log_issues(&report);

        let mut columns = vec![
            Column::system(ID_COLUMN, "ID", FieldType::Id),
            Column::system(TYPE_COLUMN, "Type", FieldType::Type),
        ];
        for field in collection.renderable_fields(&report) {
            if SYSTEM_COLUMN_KEYS.contains(&field.key.as_str()) {
                tracing::warn!(
                    collection = %collection.name,
                    field = %field.key,
                    "Field shadows a system column, skipping"
                );
                continue;
            }
            columns.push(Column::from_field(field));
        }
        columns.push(Column::system(CREATED_COLUMN, "Created", FieldType::Created));

        let view = view.filter(|view| {
            let mismatch = matches!(
                (view.collection_id, collection.id),
                (Some(target), Some(id)) if target != id
            );
            if mismatch {
                tracing::warn!(
                    view = %view.name,
                    collection = %collection.name,
                    "View belongs to another collection, ignoring"
                );
            }
            !mismatch
        });

        if let Some(allowed) = view.and_then(View::allow_list) {
            columns.retain(|column| {
                SYSTEM_COLUMN_KEYS.contains(&column.key.as_str())
                    || allowed.iter().any(|key| key == &column.key)
            });
        }

        let default_sort = view
            .and_then(|view| view.sort.clone())
            .filter(|sort| columns.iter().any(|c| c.key == sort.field && c.sortable));

        Self {
            collection_id: collection.id,
            collection_name: collection.name.clone(),
            columns,
            groups: collection.ordered_groups().into_iter().cloned().collect(),
            default_sort,
            report,
            date_format: config.date_format.clone(),
            json_preview_chars: config.json_preview_chars,
        }
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.key.as_str()).collect()
    }

    /// Non-system columns clustered by group in display order, ungrouped last.
    /// Groups without visible columns are left out.
    pub fn grouped_columns(&self) -> Vec<ColumnGroup<'_>> {
        let data_columns = || self.columns.iter().filter(|c| !c.system);

        let mut grouped: Vec<ColumnGroup<'_>> = self
            .groups
            .iter()
            .map(|group| ColumnGroup {
                group: Some(group),
                columns: data_columns()
                    .filter(|c| c.group_id.as_deref() == Some(group.id.as_str()))
                    .collect(),
            })
            .filter(|g| !g.columns.is_empty())
            .collect();

        let ungrouped: Vec<&Column> = data_columns().filter(|c| c.group_id.is_none()).collect();
        if !ungrouped.is_empty() {
            grouped.push(ColumnGroup {
                group: None,
                columns: ungrouped,
            });
        }
        grouped
    }

    /// Display string for `column` read from node data
    pub fn display_value(&self, data: &NodeData, column: &Column) -> String {
        let raw = match data.get(&column.key) {
            None | Some(Value::Null) => return EMPTY_CELL.to_string(),
            Some(raw) => raw,
        };

        let text = match column.field_type {
            FieldType::Checkbox => {
                return if truthy(raw) { "Yes" } else { "No" }.to_string();
            }
            FieldType::Table => return row_summary(raw),
            FieldType::Date | FieldType::Created => self.format_date(raw),
            FieldType::Json => self.json_preview(raw),
            FieldType::Select if column.is_relationship() => {
                if Resolved::of(data, &column.key).is_hydrated() {
                    display_relationship(&column.as_field(), data)
                } else {
                    let ids = raw_display(Some(raw));
                    if ids.is_empty() {
                        ids
                    } else {
                        format!("{UNRESOLVED_PREFIX}{ids}")
                    }
                }
            }
            FieldType::Select => raw_display(Some(raw)),
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Number
            | FieldType::Id
            | FieldType::Type => plain_text(raw),
        };

        if text.is_empty() {
            EMPTY_CELL.to_string()
        } else {
            text
        }
    }

    /// Display string for `column` of a whole node, including system columns
    pub fn cell(&self, node: &Node, column: &Column) -> String {
        if !column.system {
            return self.display_value(&node.data, column);
        }
        let raw = match column.key.as_str() {
            ID_COLUMN => node.id.map(Value::from),
            TYPE_COLUMN => Some(Value::String(node.node_type.clone())),
            CREATED_COLUMN => node.created_at.clone().map(Value::String),
            _ => None,
        };
        let mut data = NodeData::new();
        if let Some(raw) = raw {
            data.insert(column.key.clone(), raw);
        }
        self.display_value(&data, column)
    }

    /// Sort rows in place by a sortable column. Returns false, leaving the
    /// rows untouched, when the column is unknown or not sortable.
    pub fn sort_rows(&self, rows: &mut [Node], key: &str, direction: SortDirection) -> bool {
        let Some(column) = self.column(key).filter(|c| c.sortable) else {
            return false;
        };

        rows.sort_by(|a, b| {
            let ordering = self.sort_key(a, column).cmp_with(&self.sort_key(b, column));
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        true
    }

    /// Apply the View's default sort, if any
    pub fn apply_default_sort(&self, rows: &mut [Node]) {
        if let Some(sort) = &self.default_sort {
            self.sort_rows(rows, &sort.field, sort.direction);
        }
    }

    /// Rows where any searchable column's display value contains `term`,
    /// ignoring case. A blank term keeps every row.
    pub fn search_rows<'a>(&self, rows: &'a [Node], term: &str) -> Vec<&'a Node> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return rows.iter().collect();
        }
        rows.iter()
            .filter(|node| {
                self.columns
                    .iter()
                    .filter(|c| c.searchable)
                    .any(|c| self.cell(node, c).to_lowercase().contains(&needle))
            })
            .collect()
    }

    fn sort_key(&self, node: &Node, column: &Column) -> SortKey {
        match column.field_type {
            FieldType::Id => SortKey::Number(node.id.map(|id| id as f64)),
            FieldType::Number => SortKey::Number(node.data.get(&column.key).and_then(as_f64)),
            // Stored dates are ISO shaped, so the raw text orders correctly
            FieldType::Created => SortKey::Text(node.created_at.clone()),
            FieldType::Date => {
                SortKey::Text(node.data.get(&column.key).map(plain_text).filter(|s| !s.is_empty()))
            }
            _ => {
                let display = self.cell(node, column);
                SortKey::Text((display != EMPTY_CELL).then(|| display.to_lowercase()))
            }
        }
    }

    fn format_date(&self, raw: &Value) -> String {
        let text = plain_text(raw);
        let Some(date) = parse_date(&text) else {
            return text;
        };
        let mut out = String::new();
        match write!(out, "{}", date.format(&self.date_format)) {
            Ok(()) => out,
            Err(_) => {
                tracing::warn!(format = %self.date_format, "Invalid date format");
                date.to_string()
            }
        }
    }

    fn json_preview(&self, raw: &Value) -> String {
        let text = match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if text.chars().count() > self.json_preview_chars {
            let head: String = text.chars().take(self.json_preview_chars).collect();
            format!("{head}...")
        } else {
            text
        }
    }
}

enum SortKey {
    Number(Option<f64>),
    Text(Option<String>),
}

impl SortKey {
    /// Missing values sort after present ones
    fn cmp_with(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => match (a, b) {
                (Some(a), Some(b)) => a.total_cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            (SortKey::Text(a), SortKey::Text(b)) => match (a, b) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            _ => Ordering::Equal,
        }
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn row_summary(raw: &Value) -> String {
    let count = match raw {
        Value::Array(rows) => rows.len(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(rows)) => rows.len(),
            _ => 0,
        },
        _ => 0,
    };
    match count {
        0 => EMPTY_CELL.to_string(),
        1 => "1 row".to_string(),
        n => format!("{n} rows"),
    }
}

fn plain_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) if items.is_empty() => String::new(),
        other => other.to_string(),
    }
}

fn as_f64(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}
