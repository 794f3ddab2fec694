//! Shared test helpers: a scripted LLM, a configurable tool, and an
//! in-memory warehouse.

use crate::preview::{TurnEvent, TurnObserver};
use async_trait::async_trait;
use datacopilot_core::engine::{Cell, Column, ColumnKind, ColumnSchema, QueryEngine, TabularResult};
use datacopilot_core::error::{EngineError, ProviderError, ToolError};
use datacopilot_core::message::{Message, MessageToolCall};
use datacopilot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use datacopilot_core::tool::{Tool, ToolResult};
use std::sync::Mutex;

/// A provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Once the script is exhausted further calls fail with an API error.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        let responses = self.responses.lock().unwrap();
        responses.get(call).cloned().ok_or_else(|| ProviderError::ApiError {
            status_code: 500,
            message: format!("script exhausted (call #{call}, have {})", responses.len()),
        })
    }
}

fn response(message: Message) -> ProviderResponse {
    ProviderResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A final-answer response.
pub fn text_response(text: &str) -> ProviderResponse {
    response(Message::agent(text))
}

/// A response requesting `calls`.
pub fn tool_call_response(calls: Vec<MessageToolCall>) -> ProviderResponse {
    response(Message::agent_tool_calls("", calls))
}

pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}

/// Echoes its `text` argument, optionally after a delay or as a failure.
pub struct EchoTool {
    name: String,
    delay_ms: u64,
    fail: bool,
}

impl EchoTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delay_ms: 0,
            fail: false,
        }
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Echoes back the input"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        let text = arguments["text"].as_str().unwrap_or_default();
        if self.fail {
            Ok(ToolResult::failed(text))
        } else {
            Ok(ToolResult::ok(text))
        }
    }
}

/// Records every preview it is shown.
#[derive(Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<TurnEvent>>,
}

impl CollectingObserver {
    pub fn events(&self) -> Vec<TurnEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn types(&self) -> Vec<&'static str> {
        self.events().iter().map(TurnEvent::event_type).collect()
    }
}

impl TurnObserver for CollectingObserver {
    fn on_event(&self, event: &TurnEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// A warehouse with one `orders` table holding a single row.
#[derive(Default)]
pub struct MockEngine;

#[async_trait]
impl QueryEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn estimate(&self, _sql: &str) -> Result<u64, EngineError> {
        Ok(1024)
    }

    async fn execute(&self, _sql: &str) -> Result<TabularResult, EngineError> {
        let mut result = TabularResult::new(vec![
            Column::new("status", ColumnKind::Text),
            Column::new("orders", ColumnKind::Integer),
        ]);
        result.push_row(vec![Cell::Text("Complete".into()), Cell::Integer(31_250)]);
        Ok(result)
    }

    async fn schema(&self, table: &str) -> Result<Vec<ColumnSchema>, EngineError> {
        if table != "orders" {
            return Err(EngineError::NotFound(format!("Table {table} was not found")));
        }
        Ok(vec![ColumnSchema {
            name: "status".into(),
            data_type: "STRING".into(),
            mode: "NULLABLE".into(),
            description: String::new(),
        }])
    }
}
