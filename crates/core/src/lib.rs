//! # Data Copilot Core
//!
//! Domain types, traits, and error definitions for the Data Copilot agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that the provider, warehouse, tool, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: the LLM capability (transcript in, next message out)
//! - [`QueryEngine`]: the data warehouse (estimate, execute, schema)
//! - [`Tool`]: a typed function exposed to the LLM
//!
//! Implementations live in their respective crates, which keeps the turn
//! loop testable with scripted stand-ins.

pub mod engine;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use engine::{Cell, Column, ColumnKind, ColumnSchema, QueryEngine, TabularResult};
pub use error::{EngineError, Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role, Transcript};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use session::{SessionConfig, SessionId, SessionState};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
