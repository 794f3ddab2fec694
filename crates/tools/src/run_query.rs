//! `run_query` tool: executes guarded SQL and returns a text table.

use crate::guard::QueryGuard;
use async_trait::async_trait;
use datacopilot_core::error::ToolError;
use datacopilot_core::tool::{Tool, ToolResult};
use tracing::debug;

pub struct RunQueryTool {
    guard: QueryGuard,
    default_top_n_rows: usize,
}

impl RunQueryTool {
    pub fn new(guard: QueryGuard, default_top_n_rows: usize) -> Self {
        Self {
            guard,
            default_top_n_rows,
        }
    }
}

#[async_trait]
impl Tool for RunQueryTool {
    fn name(&self) -> &str {
        "run_query"
    }

    fn description(&self) -> &str {
        "Execute a BigQuery Standard SQL statement and return a text table of results. \
         Constraints: read-only (must start with SELECT); no SELECT * (name the columns); \
         must include a numeric LIMIT no larger than the row cap; queries that would scan \
         more than the byte cap are refused."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "The SELECT statement to run, with explicit columns and a LIMIT"
                },
                "top_n_rows": {
                    "type": "integer",
                    "description": format!(
                        "Maximum number of result rows to show (default {})",
                        self.default_top_n_rows
                    ),
                    "default": self.default_top_n_rows
                }
            },
            "required": ["sql"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let sql = arguments["sql"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'sql' argument".into()))?;

        let top_n_rows = top_n_rows(&arguments, self.default_top_n_rows);

        let outcome = self.guard.guard_and_run(sql, top_n_rows).await;
        Ok(if outcome.is_rows() {
            ToolResult::ok(outcome.into_text())
        } else {
            ToolResult::failed(outcome.into_text())
        })
    }
}

/// The requested row count, or `default` when absent or not a non-negative integer.
fn top_n_rows(arguments: &serde_json::Value, default: usize) -> usize {
    match arguments.get("top_n_rows") {
        None => default,
        Some(value) => match value.as_u64() {
            Some(n) => n as usize,
            None => {
                debug!(top_n_rows = %value, default, "Ignoring malformed top_n_rows argument");
                default
            }
        },
    }
}
