//! Typed model for tool specifications and the ephemeral structures the
//! generation pipeline passes between stages.
//!
//! The language model's raw JSON is deserialized into [`ToolSpecification`]
//! immediately after parsing, so the shape is validated exactly once and
//! everything downstream works with concrete types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of data source a tool queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Collection,
    Table,
}

impl DataType {
    /// JSON field carrying the data-source name for this kind.
    pub fn identity_field(self) -> &'static str {
        match self {
            DataType::Collection => "collection_name",
            DataType::Table => "table_name",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Collection => write!(f, "collection"),
            DataType::Table => write!(f, "table"),
        }
    }
}

/// How a parameter's value is supplied at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamMode {
    #[default]
    ToolParam,
    Static,
    Expression,
}

/// Value type of a filter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Text,
    Timestamp,
    Float,
    Vector,
}

/// Filter operator applied to the underlying attribute.
///
/// Operator/type compatibility (e.g. `$in` with list-valued attributes) is
/// a modeling convention and is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "$eq")]
    Eq,
    #[serde(rename = "$gt")]
    Gt,
    #[serde(rename = "$gte")]
    Gte,
    #[serde(rename = "$lt")]
    Lt,
    #[serde(rename = "$lte")]
    Lte,
    #[serde(rename = "$in")]
    In,
    #[serde(rename = "$ne")]
    Ne,
}

/// One filterable input exposed by a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Identifier the caller supplies.
    pub param: String,
    #[serde(rename = "paramMode", default)]
    pub param_mode: ParamMode,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
    /// Underlying data field this parameter filters.
    pub attribute: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Why the attribute was chosen (partition key, indexed column, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

fn default_kind() -> String {
    "tool".to_string()
}

fn default_method() -> String {
    "find".to_string()
}

fn default_limit() -> u32 {
    10
}

fn default_enabled() -> bool {
    true
}

/// A persisted, named description of a parameterized query against a
/// collection or table. This is the artifact the pipeline produces and
/// the catalog stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpecification {
    /// Store identity, present only on previously saved tools.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Attribute name → inclusion marker (1 or "$vector"-style strings).
    #[serde(default)]
    pub projection: Map<String, Value>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Set for vector-typed columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

/// A secondary index on a table column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub column: String,
}

/// Structural metadata for a table source: column types, primary key
/// decomposition, and secondary indexes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    /// Column name → declared type (e.g. "text", "timestamp", "vector").
    pub columns: BTreeMap<String, String>,
    pub partition_keys: Vec<String>,
    pub clustering_keys: Vec<String>,
    pub indexes: Vec<IndexDescriptor>,
}

impl TableMetadata {
    /// Columns eligible as filter parameters: partition keys, clustering
    /// keys, and indexed columns.
    pub fn filterable_columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .partition_keys
            .iter()
            .chain(self.clustering_keys.iter())
            .map(String::as_str)
            .collect();
        for idx in &self.indexes {
            if !out.contains(&idx.column.as_str()) {
                out.push(&idx.column);
            }
        }
        out
    }
}

/// Fresh-per-request sample of a data source, discarded once the prompt
/// is built.
#[derive(Debug, Clone)]
pub struct SampleSet {
    /// Up to five records with the identity field stripped.
    pub sample_data: Vec<Value>,
    /// Sorted union of observed record keys (and declared columns for
    /// tables).
    pub attributes: Vec<String>,
    pub table_metadata: Option<TableMetadata>,
}
