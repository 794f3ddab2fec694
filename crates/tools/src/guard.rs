//! Query guard: validates, bounds, and runs LLM-generated SQL.
//!
//! Every query passes three gates before it touches data:
//! 1. Shape: read-only `SELECT`, no `SELECT *`, a numeric `LIMIT` within the cap
//! 2. Cost: the engine's dry-run estimate must not exceed the scan cap
//! 3. Execution, then fixed-width formatting of the first `top_n_rows` rows
//!
//! Rejections are values, not errors. The caller turns them into tool-result
//! text so the LLM can correct itself.

use crate::format::render_table;
use datacopilot_config::GuardConfig;
use datacopilot_core::engine::QueryEngine;
use datacopilot_core::error::EngineError;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, info, warn};

static WILDCARD_SELECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"select\s+\*\s+from").expect("wildcard pattern is valid"));

static LIMIT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"limit\s+(\d+)").expect("limit pattern is valid"));

/// Hard bounds applied to every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardCaps {
    /// Largest LIMIT accepted
    pub row_limit_cap: u64,
    /// Largest dry-run estimate accepted, in bytes
    pub scan_cap_bytes: u64,
}

impl Default for GuardCaps {
    fn default() -> Self {
        Self::from(&GuardConfig::default())
    }
}

impl From<&GuardConfig> for GuardCaps {
    fn from(config: &GuardConfig) -> Self {
        Self {
            row_limit_cap: config.row_limit_cap,
            scan_cap_bytes: config.scan_cap_bytes,
        }
    }
}

/// Why a query was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotSelect,
    WildcardSelect,
    MissingLimit,
    /// `limit` is `None` when the literal does not fit in a `u64`
    LimitExceeded { limit: Option<u64>, literal: String, cap: u64 },
    ScanExceeded { bytes: u64, cap: u64 },
    /// The engine could not estimate the query (syntax error, unknown table, ...)
    EstimateFailed(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSelect => write!(f, "ERROR: Only read-only SELECT statements are allowed."),
            Self::WildcardSelect => write!(
                f,
                "ERROR: Avoid `SELECT *`. Specify the required columns explicitly."
            ),
            Self::MissingLimit => write!(f, "ERROR: Query must include a numeric LIMIT clause."),
            Self::LimitExceeded { limit: Some(limit), cap, .. } => {
                write!(f, "ERROR: LIMIT {limit} exceeds the maximum allowed {cap}.")
            }
            Self::LimitExceeded { literal, cap, .. } => {
                write!(f, "ERROR: LIMIT {literal} exceeds the maximum allowed {cap}.")
            }
            Self::ScanExceeded { bytes, cap } => write!(
                f,
                "ERROR: Query would scan {bytes} bytes, exceeding the cap of {cap}."
            ),
            Self::EstimateFailed(reason) => write!(f, "ERROR: Dry run failed: {reason}"),
        }
    }
}

/// The result of [`QueryGuard::guard_and_run`].
#[derive(Debug, Clone)]
pub enum GuardOutcome {
    /// Formatted result table
    Rows(String),
    /// Refused before execution
    Rejected(Rejection),
    /// Passed both gates but the engine failed while executing
    Failed(EngineError),
}

impl GuardOutcome {
    pub fn is_rows(&self) -> bool {
        matches!(self, Self::Rows(_))
    }

    /// Text handed back to the LLM.
    pub fn into_text(self) -> String {
        match self {
            Self::Rows(table) => table,
            Self::Rejected(rejection) => rejection.to_string(),
            Self::Failed(err) => format!("ERROR: {err}"),
        }
    }
}

/// Pure shape checks. Returns the accepted LIMIT value.
///
/// Matching runs on the left-trimmed, lowercased text. The first
/// `limit <digits>` occurrence is the one checked.
pub fn check_shape(sql: &str, caps: &GuardCaps) -> Result<u64, Rejection> {
    let normalized = sql.trim_start().to_lowercase();

    if !normalized.starts_with("select") {
        return Err(Rejection::NotSelect);
    }

    if WILDCARD_SELECT.is_match(&normalized) {
        return Err(Rejection::WildcardSelect);
    }

    let literal = LIMIT_CLAUSE
        .captures(&normalized)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(Rejection::MissingLimit)?;

    match literal.parse::<u64>() {
        Ok(limit) if limit <= caps.row_limit_cap => Ok(limit),
        parsed => Err(Rejection::LimitExceeded {
            limit: parsed.ok(),
            literal,
            cap: caps.row_limit_cap,
        }),
    }
}

/// Runs queries against an engine behind the shape and cost gates.
pub struct QueryGuard {
    engine: Arc<dyn QueryEngine>,
    caps: GuardCaps,
}

impl QueryGuard {
    pub fn new(engine: Arc<dyn QueryEngine>, caps: GuardCaps) -> Self {
        Self { engine, caps }
    }

    /// Validate, estimate, execute, and format `sql`.
    ///
    /// `execute` is never called unless both gates pass.
    pub async fn guard_and_run(&self, sql: &str, top_n_rows: usize) -> GuardOutcome {
        info!("Received SQL for execution");

        let limit = match check_shape(sql, &self.caps) {
            Ok(limit) => limit,
            Err(rejection) => {
                warn!(reason = %rejection, "Query rejected by shape check");
                return GuardOutcome::Rejected(rejection);
            }
        };
        debug!(limit, "Shape check passed");

        match self.engine.estimate(sql).await {
            Ok(bytes) if bytes > self.caps.scan_cap_bytes => {
                warn!(bytes, cap = self.caps.scan_cap_bytes, "Dry run indicates excessive scan");
                return GuardOutcome::Rejected(Rejection::ScanExceeded {
                    bytes,
                    cap: self.caps.scan_cap_bytes,
                });
            }
            Ok(bytes) => debug!(bytes, "Dry run OK"),
            Err(e) => {
                error!(error = %e, "Dry run failed");
                return GuardOutcome::Rejected(Rejection::EstimateFailed(e.to_string()));
            }
        }

        match self.engine.execute(sql).await {
            Ok(result) => {
                info!(rows = result.row_count(), "Execution complete");
                GuardOutcome::Rows(render_table(&result, top_n_rows))
            }
            Err(e) => {
                error!(error = %e, "Query execution failed");
                GuardOutcome::Failed(e)
            }
        }
    }
}
