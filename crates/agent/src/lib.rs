//! The Data Copilot turn loop.
//!
//! A question runs through a **Reason → Dispatch** cycle:
//!
//! 1. **Receive** the user's question into a fresh session
//! 2. **Reason**: send the transcript, prefixed with the analyst prompt, to the LLM
//! 3. **If tool calls**: run them through the guarded data tools, append the
//!    results, loop back to step 2
//! 4. **If text**: return it as the answer
//!
//! The loop ends when the LLM answers without tool calls or the step cap is
//! reached.

pub mod controller;
pub mod dispatcher;
pub mod graph;
pub mod preview;
pub mod prompt;
pub mod session_store;
pub mod stage;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use controller::{EMPTY_ANSWER, STEP_CAP_NOTICE, TurnController, TurnOutcome};
pub use dispatcher::ToolDispatcher;
pub use graph::{AgentGraph, GraphRegistry};
pub use preview::{PREVIEW_WIDTH, TracingObserver, TurnEvent, TurnObserver, render_preview};
pub use prompt::{ANALYSIS_TEMPLATE, PromptLoader};
pub use session_store::SessionStore;
pub use stage::{AnalystStage, Stage};
