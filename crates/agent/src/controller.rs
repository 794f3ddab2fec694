//! The turn controller: the reason / dispatch cycle for one question.
//!
//! A turn alternates between the reasoning stage and the tool dispatcher:
//!
//! 1. **Reasoning**: the stage proposes the next agent message
//! 2. **Dispatching**: if that message requests tools, every request is
//!    executed and its result appended, then control returns to reasoning
//! 3. **Finalized**: a message without tool requests ends the turn
//!
//! Each transition into reasoning or dispatching consumes one step. When
//! the step cap (`2 × budget + 1`) is used up the turn stops with a notice
//! and no further LLM or tool calls are made.

use crate::graph::AgentGraph;
use crate::preview::{TurnEvent, TurnObserver};
use crate::session_store::SessionStore;
use chrono::Utc;
use datacopilot_core::error::Result;
use datacopilot_core::event::DomainEvent;
use datacopilot_core::message::Message;
use datacopilot_core::session::{SessionConfig, SessionId, SessionState};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shown when the step cap ends a turn.
pub const STEP_CAP_NOTICE: &str = "Stopped: maximum reasoning depth reached for this request.";

/// Shown when the model finishes with an empty message.
pub const EMPTY_ANSWER: &str = "No response was produced by the agent.";

const SUMMARY_CHARS: usize = 200;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a final message.
    Answer(String),

    /// The step cap was exhausted first.
    StepCapReached { steps: u32 },
}

impl TurnOutcome {
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer(_))
    }

    /// The text shown to the caller.
    pub fn into_text(self) -> String {
        match self {
            Self::Answer(text) => text,
            Self::StepCapReached { .. } => STEP_CAP_NOTICE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reasoning,
    Dispatching,
}

/// Runs turns against a shared orchestration graph.
pub struct TurnController {
    graph: Arc<AgentGraph>,
    observer: Option<Arc<dyn TurnObserver>>,
}

impl TurnController {
    pub fn new(graph: Arc<AgentGraph>) -> Self {
        Self {
            graph,
            observer: None,
        }
    }

    /// Receive a preview of every message appended during a turn.
    pub fn with_observer(mut self, observer: Arc<dyn TurnObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn graph(&self) -> &Arc<AgentGraph> {
        &self.graph
    }

    /// Answer a fresh question with no prior conversation.
    pub async fn run_turn(&self, question: &str, config: &SessionConfig) -> Result<TurnOutcome> {
        let mut state = SessionState::new(question, config);
        self.drive(&mut state, config).await
    }

    /// Answer a question as a continuation of the conversation `id` in `store`.
    ///
    /// The transcript is saved back only when the turn produced an answer.
    pub async fn run_turn_in_session(
        &self,
        store: &SessionStore,
        id: &SessionId,
        question: &str,
        config: &SessionConfig,
    ) -> Result<TurnOutcome> {
        let history = store.load(id).await;
        let mut state = SessionState::resume(id.clone(), history, question, config);
        let outcome = self.drive(&mut state, config).await?;
        if outcome.is_answer() {
            store.save(id, state.into_transcript()).await;
        } else {
            debug!(session_id = %id, "Turn unanswered; history left unchanged");
        }
        Ok(outcome)
    }

    /// Run the cycle on an already-initialized session.
    pub async fn drive(&self, state: &mut SessionState, config: &SessionConfig) -> Result<TurnOutcome> {
        let step_cap = config.step_cap();
        let session_id = state.id().to_string();
        let events = self.graph.event_bus();

        info!(session_id = %session_id, step_cap, "Turn started");
        events.publish(DomainEvent::TurnStarted {
            session_id: session_id.clone(),
            step_cap,
            timestamp: Utc::now(),
        });
        if let Some(question) = state.transcript().last() {
            self.observe(question);
        }

        let mut phase = Phase::Reasoning;
        let mut steps: u32 = 0;

        let outcome = loop {
            if steps >= step_cap {
                warn!(session_id = %session_id, steps, "Step cap reached");
                break TurnOutcome::StepCapReached { steps };
            }
            steps += 1;

            match phase {
                Phase::Reasoning => {
                    debug!(step = steps, "Reasoning");
                    let message = match self.graph.stage().propose(state).await {
                        Ok(message) => message,
                        Err(e) => {
                            error!(session_id = %session_id, step = steps, error = %e, "Turn failed");
                            events.publish(DomainEvent::ErrorOccurred {
                                context: format!("turn {session_id}, step {steps}"),
                                error_message: e.to_string(),
                                timestamp: Utc::now(),
                            });
                            return Err(e);
                        }
                    };
                    let requests_tools = message.requests_tools();
                    let content = message.content.clone();
                    self.append(state, message);

                    if requests_tools {
                        phase = Phase::Dispatching;
                    } else {
                        let answer = if content.trim().is_empty() {
                            EMPTY_ANSWER.to_string()
                        } else {
                            content
                        };
                        state.set_summary(summarize(&answer));
                        break TurnOutcome::Answer(answer);
                    }
                }
                Phase::Dispatching => {
                    let requests = state.transcript().pending_tool_calls();
                    debug!(step = steps, tool_count = requests.len(), "Dispatching");
                    for result in self.graph.dispatcher().dispatch(&requests).await {
                        self.append(state, result);
                    }
                    phase = Phase::Reasoning;
                }
            }
        };

        let answered = outcome.is_answer();
        info!(session_id = %session_id, steps, answered, "Turn finished");
        events.publish(DomainEvent::TurnFinished {
            session_id,
            steps,
            answered,
            timestamp: Utc::now(),
        });
        if let Some(observer) = &self.observer {
            observer.on_event(&TurnEvent::Done { steps, answered });
        }

        Ok(outcome)
    }

    fn append(&self, state: &mut SessionState, message: Message) {
        self.observe(&message);
        state.push(message);
    }

    fn observe(&self, message: &Message) {
        if let Some(observer) = &self.observer {
            for event in TurnEvent::from_message(message) {
                observer.on_event(&event);
            }
        }
    }
}

fn summarize(answer: &str) -> String {
    let flat = answer.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SUMMARY_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(SUMMARY_CHARS - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use crate::test_helpers::{
        CollectingObserver, EchoTool, ScriptedProvider, make_tool_call, text_response,
        tool_call_response,
    };
    use crate::prompt::PromptLoader;
    use crate::stage::AnalystStage;
    use datacopilot_core::event::EventBus;
    use datacopilot_core::message::Role;
    use datacopilot_core::tool::ToolRegistry;

    fn config(budget: u32) -> SessionConfig {
        SessionConfig::new("bigquery-public-data.thelook_ecommerce", "gemini-2.5-flash")
            .with_iteration_budget(budget)
    }

    fn controller(provider: Arc<ScriptedProvider>) -> TurnController {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::new("echo")));
        registry.register(Box::new(EchoTool::new("slow").with_delay_ms(20)));
        let tools = Arc::new(registry);
        let bus = Arc::new(EventBus::default());
        let stage: Arc<dyn Stage> = Arc::new(AnalystStage::new(
            provider,
            tools.clone(),
            PromptLoader::builtin(),
            bus.clone(),
        ));
        TurnController::new(Arc::new(AgentGraph::from_parts(stage, tools, bus)))
    }

    fn echo_round(id: &str) -> datacopilot_core::provider::ProviderResponse {
        tool_call_response(vec![make_tool_call(id, "echo", serde_json::json!({"text": id}))])
    }

    #[tokio::test]
    async fn plain_answer_finishes_in_one_step() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("There were 31,250 orders.")]));
        let outcome = controller(provider.clone()).run_turn("How many orders?", &config(5)).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Answer("There were 31,250 orders.".into()));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn tool_round_then_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![echo_round("c1"), text_response("done")]));
        let controller = controller(provider.clone());
        let mut state = SessionState::new("q", &config(5));
        let outcome = controller.drive(&mut state, &config(5)).await.unwrap();

        assert_eq!(outcome.into_text(), "done");
        let roles: Vec<Role> = state.transcript().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Agent, Role::ToolResult, Role::Agent]);
        assert_eq!(state.transcript().messages()[2].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(state.summary(), Some("done"));

        // The second LLM call saw the tool result
        let second = &provider.requests()[1];
        assert_eq!(second.messages.last().unwrap().role, Role::ToolResult);
    }

    #[tokio::test]
    async fn budget_two_stops_after_five_steps() {
        // The model never stops asking for tools
        let provider = Arc::new(ScriptedProvider::new(
            (0..10).map(|i| echo_round(&format!("c{i}"))).collect(),
        ));
        let controller = controller(provider.clone());
        let mut state = SessionState::new("loop forever", &config(2));
        let outcome = controller.drive(&mut state, &config(2)).await.unwrap();

        assert_eq!(outcome, TurnOutcome::StepCapReached { steps: 5 });
        assert_eq!(outcome.into_text(), STEP_CAP_NOTICE);
        assert_eq!(provider.call_count(), 3);
        let results = state
            .transcript()
            .iter()
            .filter(|m| m.role == Role::ToolResult)
            .count();
        assert_eq!(results, 2);
        assert!(state.summary().is_none());
    }

    #[tokio::test]
    async fn batch_results_keep_request_order() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_response(vec![
                make_tool_call("a", "slow", serde_json::json!({"text": "A"})),
                make_tool_call("b", "echo", serde_json::json!({"text": "B"})),
                make_tool_call("c", "slow", serde_json::json!({"text": "C"})),
            ]),
            text_response("ok"),
        ]));
        let controller = controller(provider);
        let mut state = SessionState::new("q", &config(5));
        controller.drive(&mut state, &config(5)).await.unwrap();

        let ids: Vec<_> = state
            .transcript()
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn stage_failure_is_fatal() {
        let provider = Arc::new(ScriptedProvider::new(vec![echo_round("c1")]));
        let controller = controller(provider.clone());
        let mut rx = controller.graph().event_bus().subscribe();

        let err = controller.run_turn("q", &config(5)).await.unwrap_err();
        assert!(matches!(err, datacopilot_core::Error::Provider(_)));
        assert_eq!(provider.call_count(), 2);

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            saw_error |= matches!(event.as_ref(), DomainEvent::ErrorOccurred { .. });
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn empty_answer_gets_fixed_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("  ")]));
        let outcome = controller(provider).run_turn("q", &config(5)).await.unwrap();
        assert_eq!(outcome.into_text(), EMPTY_ANSWER);
    }

    #[tokio::test]
    async fn observer_sees_every_appended_message() {
        let provider = Arc::new(ScriptedProvider::new(vec![echo_round("c1"), text_response("done")]));
        let observer = Arc::new(CollectingObserver::default());
        let controller = controller(provider).with_observer(observer.clone());
        controller.run_turn("q", &config(5)).await.unwrap();

        assert_eq!(
            observer.types(),
            vec!["question", "tool_call", "tool_result", "answer", "done"]
        );
    }

    #[tokio::test]
    async fn session_history_carries_into_next_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            text_response("first answer"),
            text_response("second answer"),
        ]));
        let controller = controller(provider.clone());
        let store = SessionStore::new();
        let id = SessionId::from("cli");

        controller.run_turn_in_session(&store, &id, "first", &config(5)).await.unwrap();
        controller.run_turn_in_session(&store, &id, "second", &config(5)).await.unwrap();

        // system + user + agent + user
        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 4);
        assert_eq!(second.messages[1].content, "first");
        assert_eq!(store.load(&id).await.len(), 4);
    }

    #[tokio::test]
    async fn unanswered_turn_is_not_saved() {
        let provider = Arc::new(ScriptedProvider::new(
            (0..5).map(|i| echo_round(&format!("c{i}"))).collect(),
        ));
        let controller = controller(provider);
        let store = SessionStore::new();
        let id = SessionId::from("cli");

        let outcome = controller
            .run_turn_in_session(&store, &id, "q", &config(1))
            .await
            .unwrap();
        assert!(!outcome.is_answer());
        assert!(store.is_empty().await);
    }

    #[test]
    fn summary_is_bounded() {
        let long = "word ".repeat(100);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), SUMMARY_CHARS);
        assert!(summary.ends_with('…'));
        assert_eq!(summarize("a\n  b"), "a b");
    }
}
