//! BigQuery REST payloads and their conversion into domain types.
//!
//! `jobs.query` returns every cell as a string (`{"f": [{"v": "42"}]}`);
//! the field schema says how to read it.

use chrono::{DateTime, Utc};
use datacopilot_core::engine::{Cell, Column, ColumnKind, ColumnSchema, TabularResult};
use datacopilot_core::error::EngineError;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldSchema {
    fn is_repeated(&self) -> bool {
        self.mode.as_deref() == Some("REPEATED")
    }
}

impl From<FieldSchema> for ColumnSchema {
    fn from(field: FieldSchema) -> Self {
        ColumnSchema {
            name: field.name,
            data_type: field.field_type,
            mode: field.mode.unwrap_or_else(|| "NULLABLE".into()),
            description: field.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobReference {
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Body of `jobs.query` and `jobs.getQueryResults`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub job_complete: bool,
    pub job_reference: Option<JobReference>,
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<Row>,
    pub page_token: Option<String>,
    /// int64 encoded as a string
    pub total_bytes_processed: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Row {
    #[serde(default)]
    pub f: Vec<RowValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RowValue {
    #[serde(default)]
    pub v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableResource {
    pub schema: Option<TableSchema>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableList {
    #[serde(default)]
    pub tables: Vec<TableListEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableListEntry {
    pub table_reference: TableReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TableReference {
    pub table_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Pull the human-readable message out of a Google API error body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Parse the dry-run byte estimate.
pub(crate) fn bytes_processed(response: &QueryResponse) -> Result<u64, EngineError> {
    let raw = response
        .total_bytes_processed
        .as_deref()
        .ok_or_else(|| EngineError::Decode("dry run response has no totalBytesProcessed".into()))?;
    raw.parse::<u64>()
        .map_err(|e| EngineError::Decode(format!("totalBytesProcessed '{raw}': {e}")))
}

/// Column headers for a result schema.
pub(crate) fn columns(schema: &TableSchema) -> Vec<Column> {
    schema
        .fields
        .iter()
        .map(|f| {
            let kind = if f.is_repeated() {
                ColumnKind::Text
            } else {
                ColumnKind::from_type_name(&f.field_type)
            };
            Column::new(f.name.clone(), kind)
        })
        .collect()
}

/// Append the rows of one result page to `result`.
pub(crate) fn append_rows(
    result: &mut TabularResult,
    schema: &TableSchema,
    rows: Vec<Row>,
) -> Result<(), EngineError> {
    for row in rows {
        if row.f.len() != schema.fields.len() {
            return Err(EngineError::Decode(format!(
                "row has {} values but schema has {} fields",
                row.f.len(),
                schema.fields.len()
            )));
        }
        let cells = row
            .f
            .into_iter()
            .zip(&schema.fields)
            .map(|(value, field)| decode_cell(value.v, field))
            .collect::<Result<Vec<_>, _>>()?;
        result.push_row(cells);
    }
    Ok(())
}

fn decode_cell(value: serde_json::Value, field: &FieldSchema) -> Result<Cell, EngineError> {
    let raw = match value {
        serde_json::Value::Null => return Ok(Cell::Null),
        serde_json::Value::String(s) if !field.is_repeated() => s,
        // Repeated and record values arrive as nested JSON; keep them readable.
        other => return Ok(Cell::Text(other.to_string())),
    };

    let bad = |e: &dyn std::fmt::Display| {
        EngineError::Decode(format!("column '{}' value '{raw}': {e}", field.name))
    };

    match field.field_type.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT64" => raw.parse::<i64>().map(Cell::Integer).map_err(|e| bad(&e)),
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" | "DECIMAL" | "BIGDECIMAL" => {
            raw.parse::<f64>().map(Cell::Float).map_err(|e| bad(&e))
        }
        "BOOLEAN" | "BOOL" => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(Cell::Bool(true)),
            "false" => Ok(Cell::Bool(false)),
            _ => Err(bad(&"not a boolean")),
        },
        "TIMESTAMP" => {
            // Seconds since the epoch, possibly fractional or in exponent form
            let seconds = raw.parse::<f64>().map_err(|e| bad(&e))?;
            let micros = (seconds * 1_000_000.0).round() as i64;
            DateTime::<Utc>::from_timestamp_micros(micros)
                .map(|ts| Cell::Text(ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()))
                .ok_or_else(|| bad(&"timestamp out of range"))
        }
        _ => Ok(Cell::Text(raw)),
    }
}
