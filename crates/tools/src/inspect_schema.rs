//! `inspect_schema` tool: column metadata for a table in the active dataset.

use async_trait::async_trait;
use datacopilot_core::engine::QueryEngine;
use datacopilot_core::error::ToolError;
use datacopilot_core::tool::{Tool, ToolResult};
use std::sync::Arc;
use tracing::{error, info};

pub struct InspectSchemaTool {
    engine: Arc<dyn QueryEngine>,
}

impl InspectSchemaTool {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for InspectSchemaTool {
    fn name(&self) -> &str {
        "inspect_schema"
    }

    fn description(&self) -> &str {
        "Return the JSON schema (name, type, mode, description of every column) for a table \
         in the configured dataset, e.g. 'orders' or 'users'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Table name inside the configured dataset"
                }
            },
            "required": ["table_name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let table = arguments["table_name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'table_name' argument".into()))?;

        info!(table, "Describing schema");
        match self.engine.schema(table).await {
            Ok(columns) => {
                let json = serde_json::to_string(&columns).map_err(|e| ToolError::ExecutionFailed {
                    tool_name: self.name().to_string(),
                    reason: e.to_string(),
                })?;
                Ok(ToolResult {
                    call_id: String::new(),
                    success: true,
                    output: json,
                    data: serde_json::to_value(&columns).ok(),
                })
            }
            Err(e) => {
                error!(table, error = %e, "Failed to retrieve schema");
                Ok(ToolResult::failed(format!("ERROR: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockEngine;
    use datacopilot_core::engine::ColumnSchema;

    fn engine() -> Arc<MockEngine> {
        Arc::new(MockEngine::new().with_table(
            "orders",
            vec![ColumnSchema {
                name: "order_id".into(),
                data_type: "INTEGER".into(),
                mode: "NULLABLE".into(),
                description: String::new(),
            }],
        ))
    }

    #[tokio::test]
    async fn known_table_returns_json_columns() {
        let tool = InspectSchemaTool::new(engine());
        let result = tool
            .execute(serde_json::json!({ "table_name": "orders" }))
            .await
            .unwrap();
        assert!(result.success);
        let parsed: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(parsed[0]["name"], "order_id");
        assert_eq!(parsed[0]["type"], "INTEGER");
        assert_eq!(parsed[0]["mode"], "NULLABLE");
    }

    #[tokio::test]
    async fn unknown_table_surfaces_engine_error() {
        let tool = InspectSchemaTool::new(engine());
        let result = tool
            .execute(serde_json::json!({ "table_name": "orders_v2" }))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("ERROR:"));
        assert!(result.output.contains("orders_v2"));
    }

    #[tokio::test]
    async fn missing_table_name() {
        let tool = InspectSchemaTool::new(engine());
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
