//! QueryEngine trait: the abstraction over the data warehouse.
//!
//! Three operations back the agent's tools: a cost estimate that moves no
//! data, real execution, and schema lookup. Implementations: BigQuery over
//! REST (see the `datacopilot-warehouse` crate) and scripted engines in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::EngineError;

/// Column metadata for a warehouse table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,

    /// Warehouse type name (e.g. "STRING", "INTEGER")
    #[serde(rename = "type")]
    pub data_type: String,

    /// Nullability mode ("NULLABLE", "REQUIRED", "REPEATED")
    pub mode: String,

    #[serde(default)]
    pub description: String,
}

/// How a result column's values should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Boolean,
}

impl ColumnKind {
    /// Map a warehouse type name onto a rendering kind.
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT64" => Self::Integer,
            "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" | "DECIMAL" | "BIGDECIMAL" => Self::Float,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            _ => Self::Text,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

/// A result column header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A single result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// A tabular query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl TabularResult {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// The core QueryEngine trait.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// A human-readable name for this engine (e.g., "bigquery").
    fn name(&self) -> &str;

    /// Estimate how many bytes `sql` would scan, without running it.
    async fn estimate(&self, sql: &str) -> std::result::Result<u64, EngineError>;

    /// Execute `sql` and return its rows.
    async fn execute(&self, sql: &str) -> std::result::Result<TabularResult, EngineError>;

    /// Column metadata for a table in the active dataset.
    async fn schema(&self, table: &str) -> std::result::Result<Vec<ColumnSchema>, EngineError>;

    /// List tables in the active dataset.
    async fn list_tables(&self) -> std::result::Result<Vec<String>, EngineError> {
        Ok(Vec::new())
    }
}
