//! Tool dispatcher: runs one batch of tool-call requests.
//!
//! Calls in a batch run concurrently. Results come back in request order,
//! one per request, tagged with the request id. A failing tool never fails
//! the batch; its error becomes the result text, prefixed `ERROR:`.

use chrono::Utc;
use datacopilot_core::event::{DomainEvent, EventBus};
use datacopilot_core::message::{Message, MessageToolCall};
use datacopilot_core::tool::{ToolCall, ToolRegistry};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const ERROR_PREFIX: &str = "ERROR:";

pub struct ToolDispatcher {
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
}

impl ToolDispatcher {
    pub fn new(tools: Arc<ToolRegistry>, event_bus: Arc<EventBus>) -> Self {
        Self { tools, event_bus }
    }

    /// Execute `requests` and return one tool-result message per request, in order.
    pub async fn dispatch(&self, requests: &[MessageToolCall]) -> Vec<Message> {
        debug!(tool_count = requests.len(), "Executing tool calls");
        join_all(requests.iter().map(|request| self.run_one(request))).await
    }

    async fn run_one(&self, request: &MessageToolCall) -> Message {
        let start = Instant::now();

        let (success, output) = match parse_arguments(&request.arguments) {
            Err(reason) => (
                false,
                format!(
                    "{ERROR_PREFIX} Invalid arguments for tool '{}': {reason}",
                    request.name
                ),
            ),
            Ok(arguments) => {
                let call = ToolCall {
                    id: request.id.clone(),
                    name: request.name.clone(),
                    arguments,
                };
                match self.tools.execute(&call).await {
                    Ok(result) if result.success => (true, result.output),
                    Ok(result) => (false, ensure_error_prefix(result.output)),
                    Err(e) => (false, format!("{ERROR_PREFIX} {e}")),
                }
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        if !success {
            warn!(tool = %request.name, call_id = %request.id, "Tool call failed");
        }
        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: request.name.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        Message::tool_result(request.id.clone(), output)
    }
}

/// Tool arguments arrive as a JSON string. Empty means no arguments.
fn parse_arguments(raw: &str) -> Result<serde_json::Value, String> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ serde_json::Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    }
}

fn ensure_error_prefix(output: String) -> String {
    if output.starts_with(ERROR_PREFIX) {
        output
    } else {
        format!("{ERROR_PREFIX} {output}")
    }
}
