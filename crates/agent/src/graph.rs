//! The compiled orchestration graph and its process-wide registry.
//!
//! An [`AgentGraph`] bundles the reasoning stage, the tool registry, and the
//! dispatcher. It holds no per-turn state, so one instance serves every turn.

use crate::dispatcher::ToolDispatcher;
use crate::prompt::PromptLoader;
use crate::stage::{AnalystStage, Stage};
use datacopilot_config::AppConfig;
use datacopilot_core::engine::QueryEngine;
use datacopilot_core::error::Result;
use datacopilot_core::event::EventBus;
use datacopilot_core::provider::Provider;
use datacopilot_core::tool::ToolRegistry;
use datacopilot_warehouse::BigQueryEngine;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

pub struct AgentGraph {
    stage: Arc<dyn Stage>,
    tools: Arc<ToolRegistry>,
    dispatcher: ToolDispatcher,
    event_bus: Arc<EventBus>,
}

impl AgentGraph {
    /// Wire the analyst stage and the data tools over `provider` and `engine`.
    pub fn new(
        provider: Arc<dyn Provider>,
        engine: Arc<dyn QueryEngine>,
        config: &AppConfig,
    ) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let tools = Arc::new(datacopilot_tools::default_registry(engine, &config.guard));
        let prompts = match &config.agent.prompt_dir {
            Some(dir) => PromptLoader::from_dir(dir),
            None => PromptLoader::builtin(),
        };
        let stage = AnalystStage::new(provider, tools.clone(), prompts, event_bus.clone())
            .with_temperature(config.agent.temperature)
            .with_max_tokens(config.agent.max_tokens);

        info!(tools = ?tools.names(), "Orchestration graph composed");
        Self::from_parts(Arc::new(stage), tools, event_bus)
    }

    /// Assemble a graph from an existing stage and registry.
    pub fn from_parts(
        stage: Arc<dyn Stage>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let dispatcher = ToolDispatcher::new(tools.clone(), event_bus.clone());
        Self {
            stage,
            tools,
            dispatcher,
            event_bus,
        }
    }

    /// Build the production graph: Gemini with fallback over BigQuery.
    pub fn build(config: &AppConfig) -> Result<Self> {
        let provider = datacopilot_providers::build_from_config(config)?;
        let engine = BigQueryEngine::from_config(&config.bigquery)?;
        Ok(Self::new(provider, Arc::new(engine), config))
    }

    pub fn stage(&self) -> &dyn Stage {
        self.stage.as_ref()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

/// Builds the graph once and hands out shared references afterwards.
#[derive(Default)]
pub struct GraphRegistry {
    cell: OnceCell<Arc<AgentGraph>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph, if it has been built.
    pub fn get(&self) -> Option<Arc<AgentGraph>> {
        self.cell.get().cloned()
    }

    /// Return the graph, building it with `build` on first use.
    ///
    /// A failed build leaves the registry empty so a later call can retry.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Result<Arc<AgentGraph>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AgentGraph>>,
    {
        self.cell
            .get_or_try_init(|| async {
                info!("Constructing orchestration graph");
                build().await.map(Arc::new)
            })
            .await
            .cloned()
    }

    /// Return the production graph for `config`, building it on first use.
    pub async fn get_or_build_from_config(&self, config: &AppConfig) -> Result<Arc<AgentGraph>> {
        self.get_or_build(|| async { AgentGraph::build(config) }).await
    }
}
