//! The reasoning stage: one LLM call per step.
//!
//! The stage sees the session, prepends the system instruction for the call
//! only, binds the tool definitions, and returns the model's next message.
//! It never writes to the session; the controller appends the result.

use crate::prompt::{ANALYSIS_TEMPLATE, PromptLoader};
use async_trait::async_trait;
use chrono::Utc;
use datacopilot_core::error::Result;
use datacopilot_core::event::{DomainEvent, EventBus};
use datacopilot_core::message::{Message, Role};
use datacopilot_core::provider::{Provider, ProviderRequest};
use datacopilot_core::session::SessionState;
use datacopilot_core::tool::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A reasoning step: session in, next message out.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Produce the next agent message. Either final text or tool-call requests.
    async fn propose(&self, state: &SessionState) -> Result<Message>;
}

/// The analyst persona over the configured LLM, with the data tools bound.
pub struct AnalystStage {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    prompts: PromptLoader,
    temperature: f32,
    max_tokens: Option<u32>,
    event_bus: Arc<EventBus>,
}

impl AnalystStage {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        prompts: PromptLoader,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            tools,
            prompts,
            temperature: 0.25,
            max_tokens: None,
            event_bus,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl Stage for AnalystStage {
    fn name(&self) -> &str {
        "analyst"
    }

    async fn propose(&self, state: &SessionState) -> Result<Message> {
        info!(session_id = %state.id(), "Analyst stage invoked");

        let system_prompt = self.prompts.render(ANALYSIS_TEMPLATE, state.dataset_id())?;

        let mut messages = Vec::with_capacity(state.transcript().len() + 1);
        messages.push(Message::system(system_prompt));
        messages.extend(state.transcript().iter().cloned());

        let request = ProviderRequest {
            model: state.model_id().to_string(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.tools.definitions(),
        };

        debug!(
            provider = self.provider.name(),
            model = %request.model,
            tools = request.tools.len(),
            "Dispatching transcript to LLM"
        );

        let response = self.provider.complete(request).await.map_err(|e| {
            error!(error = %e, "Analyst stage error");
            e
        })?;

        self.event_bus.publish(DomainEvent::ResponseGenerated {
            session_id: state.id().to_string(),
            model: response.model.clone(),
            tokens_used: response.usage.as_ref().map_or(0, |u| u.total_tokens),
            timestamp: Utc::now(),
        });

        let mut message = response.message;
        message.role = Role::Agent;
        message.tool_call_id = None;

        info!(
            tool_calls = message.tool_calls.len(),
            "Analyst stage completed"
        );
        Ok(message)
    }
}
