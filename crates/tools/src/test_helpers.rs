//! Test helpers: a scripted in-memory query engine.

use async_trait::async_trait;
use datacopilot_core::engine::{Cell, Column, ColumnKind, ColumnSchema, QueryEngine, TabularResult};
use datacopilot_core::error::EngineError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An engine that returns canned answers and counts calls.
pub struct MockEngine {
    estimate: Result<u64, EngineError>,
    execute: Result<TabularResult, EngineError>,
    schemas: HashMap<String, Vec<ColumnSchema>>,
    estimate_calls: AtomicUsize,
    execute_calls: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        let mut result = TabularResult::new(vec![Column::new("id", ColumnKind::Integer)]);
        result.push_row(vec![Cell::Integer(1)]);
        Self {
            estimate: Ok(1024),
            execute: Ok(result),
            schemas: HashMap::new(),
            estimate_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_estimate(mut self, bytes: u64) -> Self {
        self.estimate = Ok(bytes);
        self
    }

    pub fn with_estimate_error(mut self, err: EngineError) -> Self {
        self.estimate = Err(err);
        self
    }

    pub fn with_result(mut self, result: TabularResult) -> Self {
        self.execute = Ok(result);
        self
    }

    pub fn with_execute_error(mut self, err: EngineError) -> Self {
        self.execute = Err(err);
        self
    }

    pub fn with_table(mut self, name: &str, columns: Vec<ColumnSchema>) -> Self {
        self.schemas.insert(name.to_string(), columns);
        self
    }

    pub fn estimate_calls(&self) -> usize {
        self.estimate_calls.load(Ordering::SeqCst)
    }

    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn estimate(&self, _sql: &str) -> Result<u64, EngineError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.estimate.clone()
    }

    async fn execute(&self, _sql: &str) -> Result<TabularResult, EngineError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.execute.clone()
    }

    async fn schema(&self, table: &str) -> Result<Vec<ColumnSchema>, EngineError> {
        self.schemas
            .get(table)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("Table {table} was not found")))
    }
}
