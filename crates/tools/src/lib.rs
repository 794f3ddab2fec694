//! Data-access tools for Data Copilot.
//!
//! The agent gets exactly two capabilities over the warehouse:
//! - `run_query`: guarded, cost-checked SQL execution
//! - `inspect_schema`: column metadata for one table
//!
//! Every query goes through [`guard::QueryGuard`] first.

pub mod format;
pub mod guard;
pub mod inspect_schema;
pub mod run_query;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use guard::{GuardCaps, GuardOutcome, QueryGuard, Rejection};
pub use inspect_schema::InspectSchemaTool;
pub use run_query::RunQueryTool;

use datacopilot_config::GuardConfig;
use datacopilot_core::engine::QueryEngine;
use datacopilot_core::tool::ToolRegistry;
use std::sync::Arc;

/// Create the tool registry bound to `engine`.
pub fn default_registry(engine: Arc<dyn QueryEngine>, config: &GuardConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let guard = QueryGuard::new(engine.clone(), GuardCaps::from(config));
    registry.register(Box::new(RunQueryTool::new(guard, config.default_top_n_rows)));
    registry.register(Box::new(InspectSchemaTool::new(engine)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_helpers::MockEngine;

    #[test]
    fn registry_holds_both_tools() {
        let registry = default_registry(Arc::new(MockEngine::new()), &GuardConfig::default());
        assert_eq!(registry.names(), vec!["inspect_schema", "run_query"]);
    }
}
