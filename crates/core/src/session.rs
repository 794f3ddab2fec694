//! Session state: the per-question scratchpad threaded through a turn.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::message::{Message, Transcript};

/// Default number of reasoning cycles per turn.
pub const DEFAULT_ITERATION_BUDGET: u32 = 5;

/// Unique identifier for a conversation (one per caller).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-run configuration for a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Active dataset, formatted `project.dataset`
    pub dataset_id: String,

    /// Billing project (optional; defaults to the dataset's project)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Model identifier passed to the LLM capability
    pub model_id: String,

    /// Reasoning cycles allowed per turn
    #[serde(default = "default_iteration_budget")]
    pub iteration_budget: u32,
}

fn default_iteration_budget() -> u32 {
    DEFAULT_ITERATION_BUDGET
}

impl SessionConfig {
    pub fn new(dataset_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            project_id: None,
            model_id: model_id.into(),
            iteration_budget: DEFAULT_ITERATION_BUDGET,
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_iteration_budget(mut self, budget: u32) -> Self {
        self.iteration_budget = budget;
        self
    }

    /// Hard cap on reasoning + dispatch steps: `2 × budget + 1`.
    pub fn step_cap(&self) -> u32 {
        self.iteration_budget.saturating_mul(2).saturating_add(1)
    }
}

/// Transcript plus the read-only fields fixed at session creation.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: SessionId,
    question: String,
    dataset_id: String,
    project_id: Option<String>,
    model_id: String,
    summary: Option<String>,
    transcript: Transcript,
}

impl SessionState {
    /// Start a fresh session whose transcript holds only the question.
    pub fn new(question: impl Into<String>, config: &SessionConfig) -> Self {
        Self::resume(SessionId::new(), Transcript::new(), question, config)
    }

    /// Continue an earlier conversation: the question is appended after `history`.
    pub fn resume(
        id: SessionId,
        history: Transcript,
        question: impl Into<String>,
        config: &SessionConfig,
    ) -> Self {
        let question = question.into();
        let mut transcript = history;
        transcript.push(Message::user(question.clone()));
        Self {
            id,
            question,
            dataset_id: config.dataset_id.clone(),
            project_id: config.project_id.clone(),
            model_id: config.model_id.clone(),
            summary: None,
            transcript,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Append a message to the transcript.
    pub fn push(&mut self, message: Message) {
        self.transcript.push(message);
    }

    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn config() -> SessionConfig {
        SessionConfig::new("bigquery-public-data.thelook_ecommerce", "gemini-2.5-flash")
    }

    #[test]
    fn step_cap_is_twice_budget_plus_one() {
        assert_eq!(config().step_cap(), 11);
        assert_eq!(config().with_iteration_budget(2).step_cap(), 5);
        assert_eq!(config().with_iteration_budget(0).step_cap(), 1);
    }

    #[test]
    fn new_session_starts_with_the_question() {
        let state = SessionState::new("top products?", &config().with_project("my-proj"));
        assert_eq!(state.transcript().len(), 1);
        let first = &state.transcript().messages()[0];
        assert_eq!(first.role, Role::User);
        assert_eq!(first.content, "top products?");
        assert_eq!(state.project_id(), Some("my-proj"));
        assert_eq!(state.model_id(), "gemini-2.5-flash");
        assert!(state.summary().is_none());
    }

    #[test]
    fn resumed_session_appends_after_history() {
        let mut history = Transcript::new();
        history.push(Message::user("earlier"));
        history.push(Message::agent("earlier answer"));

        let id = SessionId::from("caller-42");
        let state = SessionState::resume(id.clone(), history, "follow-up", &config());
        assert_eq!(state.id(), &id);
        assert_eq!(state.transcript().len(), 3);
        assert_eq!(state.transcript().last().unwrap().content, "follow-up");
    }

    #[test]
    fn session_config_budget_defaults_when_missing() {
        let cfg: SessionConfig = serde_json::from_value(serde_json::json!({
            "dataset_id": "p.d",
            "model_id": "m"
        }))
        .unwrap();
        assert_eq!(cfg.iteration_budget, DEFAULT_ITERATION_BUDGET);
    }
}
