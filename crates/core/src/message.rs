//! Message and Transcript domain types.
//!
//! These are the value objects threaded through every turn:
//! user asks a question → agent replies or requests tools → tool results come back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// The end user asking about the dataset
    User,
    /// The reasoning stage (LLM output)
    Agent,
    /// Output of a tool invocation
    ToolResult,
    /// Instruction prefix sent to the LLM; never stored in a transcript
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::ToolResult => "tool-result",
            Self::System => "system",
        }
    }
}

/// A single message in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the agent (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new agent message with final text content.
    pub fn agent(content: impl Into<String>) -> Self {
        Self::with_role(Role::Agent, content)
    }

    /// Create an agent message that requests tool invocations.
    pub fn agent_tool_calls(content: impl Into<String>, tool_calls: Vec<MessageToolCall>) -> Self {
        let mut msg = Self::with_role(Role::Agent, content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a system instruction message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::ToolResult, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// Whether this message asks for one or more tool invocations.
    pub fn requests_tools(&self) -> bool {
        self.role == Role::Agent && !self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an agent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

/// An ordered, append-only sequence of messages.
///
/// There is deliberately no way to remove or reorder messages; the only
/// mutation is [`Transcript::push`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Tool calls requested by the newest message that have no result yet.
    pub fn pending_tool_calls(&self) -> Vec<MessageToolCall> {
        let Some(last_request) = self.messages.iter().rposition(Message::requests_tools) else {
            return Vec::new();
        };
        let answered: Vec<&str> = self.messages[last_request + 1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        self.messages[last_request]
            .tool_calls
            .iter()
            .filter(|tc| !answered.contains(&tc.id.as_str()))
            .cloned()
            .collect()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> MessageToolCall {
        MessageToolCall {
            id: id.into(),
            name: "run_query".into(),
            arguments: "{}".into(),
        }
    }

    #[test]
    fn create_user_message() {
        let msg = Message::user("How many orders last week?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "How many orders last week?");
        assert!(msg.tool_calls.is_empty());
        assert!(!msg.requests_tools());
    }

    #[test]
    fn agent_tool_call_message_requests_tools() {
        let msg = Message::agent_tool_calls("", vec![call("a")]);
        assert_eq!(msg.role, Role::Agent);
        assert!(msg.requests_tools());
    }

    #[test]
    fn role_serializes_kebab_case() {
        let json = serde_json::to_string(&Role::ToolResult).unwrap();
        assert_eq!(json, r#""tool-result""#);
        assert_eq!(Role::ToolResult.as_str(), "tool-result");
    }

    #[test]
    fn transcript_appends_in_order() {
        let mut t = Transcript::new();
        t.push(Message::user("first"));
        t.push(Message::agent("second"));
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].content, "first");
        assert_eq!(t.last().unwrap().content, "second");
    }

    #[test]
    fn pending_tool_calls_tracks_unanswered_requests() {
        let mut t = Transcript::new();
        t.push(Message::user("q"));
        t.push(Message::agent_tool_calls("", vec![call("a"), call("b")]));
        assert_eq!(t.pending_tool_calls().len(), 2);

        t.push(Message::tool_result("a", "ok"));
        let pending = t.pending_tool_calls();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "b");

        t.push(Message::tool_result("b", "ok"));
        assert!(t.pending_tool_calls().is_empty());
    }

    #[test]
    fn transcript_serialization_roundtrip() {
        let mut t = Transcript::new();
        t.push(Message::user("Test message"));
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Transcript = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.messages()[0].role, Role::User);
    }
}
