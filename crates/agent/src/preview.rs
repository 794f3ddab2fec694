//! Step previews emitted while a turn runs.
//!
//! Every message the controller appends is offered to a [`TurnObserver`]
//! as one or more [`TurnEvent`]s. Observers get shared references only and
//! cannot steer the turn.

use datacopilot_core::message::{Message, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Width of the divider drawn around a rendered preview.
pub const PREVIEW_WIDTH: usize = 72;

/// One observable step of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// The user's question entered the transcript.
    Question { content: String },

    /// Text the model emitted alongside tool-call requests.
    Thought { content: String },

    /// The model asked for a tool.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// A tool finished.
    ToolResult {
        id: String,
        output: String,
        success: bool,
    },

    /// The model's final answer.
    Answer { content: String },

    /// The turn ended.
    Done { steps: u32, answered: bool },
}

impl TurnEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Question { .. } => "question",
            Self::Thought { .. } => "thought",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Answer { .. } => "answer",
            Self::Done { .. } => "done",
        }
    }

    /// Events describing an appended message.
    pub fn from_message(message: &Message) -> Vec<TurnEvent> {
        match message.role {
            Role::User => vec![Self::Question {
                content: message.content.clone(),
            }],
            Role::Agent if message.requests_tools() => {
                let mut events = Vec::with_capacity(message.tool_calls.len() + 1);
                if !message.content.trim().is_empty() {
                    events.push(Self::Thought {
                        content: message.content.clone(),
                    });
                }
                events.extend(message.tool_calls.iter().map(|tc| Self::ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    input: serde_json::from_str(&tc.arguments)
                        .unwrap_or_else(|_| serde_json::Value::String(tc.arguments.clone())),
                }));
                events
            }
            Role::Agent => vec![Self::Answer {
                content: message.content.clone(),
            }],
            Role::ToolResult => vec![Self::ToolResult {
                id: message.tool_call_id.clone().unwrap_or_default(),
                output: message.content.clone(),
                success: !message.content.starts_with("ERROR:"),
            }],
            Role::System => Vec::new(),
        }
    }

    /// Who the preview is attributed to.
    pub fn speaker(&self) -> &'static str {
        match self {
            Self::Question { .. } => "user",
            Self::ToolResult { .. } => "tool",
            _ => "agent",
        }
    }

    fn body(&self) -> String {
        match self {
            Self::Question { content } | Self::Thought { content } | Self::Answer { content } => {
                content.clone()
            }
            Self::ToolCall { name, input, .. } => format!("→ {name}({input})"),
            Self::ToolResult { output, .. } => output.clone(),
            Self::Done { steps, answered } => {
                let how = if *answered { "answered" } else { "stopped at step cap" };
                format!("turn {how} after {steps} steps")
            }
        }
    }
}

/// Render an event between two divider bars.
pub fn render_preview(event: &TurnEvent) -> String {
    let bar = "─".repeat(PREVIEW_WIDTH);
    format!("\n{bar}\n{}\n{}\n{bar}\n", event.speaker(), event.body())
}

/// Receives previews as the turn progresses.
pub trait TurnObserver: Send + Sync {
    fn on_event(&self, event: &TurnEvent);
}

/// Writes previews to the debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TurnObserver for TracingObserver {
    fn on_event(&self, event: &TurnEvent) {
        debug!(event = event.event_type(), "{}", render_preview(event));
    }
}
