//! Configuration loading, validation, and management for Data Copilot.
//!
//! Loads configuration from `settings/agent-settings.toml` (or an explicit
//! path), applies environment variable overrides, then CLI flags. CLI always
//! wins. Validates all settings before the first turn runs.

use datacopilot_core::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "settings/agent-settings.toml";

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Warehouse connection settings
    #[serde(default)]
    pub bigquery: WarehouseConfig,

    /// Reasoning loop and LLM settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Query guard caps
    #[serde(default)]
    pub guard: GuardConfig,

    /// Log level and log file
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Billing project for query jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Dataset to query, formatted `project.dataset`
    #[serde(default = "default_dataset_id")]
    pub dataset_id: String,

    /// Job location (e.g. "US")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// OAuth access token; usually supplied via `GOOGLE_OAUTH_ACCESS_TOKEN`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "default_bigquery_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_dataset_id() -> String {
    "bigquery-public-data.thelook_ecommerce".into()
}
fn default_bigquery_url() -> String {
    "https://bigquery.googleapis.com/bigquery/v2".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            dataset_id: default_dataset_id(),
            location: None,
            access_token: None,
            api_url: default_bigquery_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("project_id", &self.project_id)
            .field("dataset_id", &self.dataset_id)
            .field("location", &self.location)
            .field("access_token", &redact(&self.access_token))
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Model tried when the primary fails; `None` disables the fallback
    #[serde(default = "default_fallback_model")]
    pub fallback_llm_model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Reasoning cycles per turn; the step cap is `2 × max_iterations + 1`
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// LLM API key; usually supplied via `GOOGLE_API_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible endpoint of the LLM
    #[serde(default = "default_llm_url")]
    pub api_url: String,

    /// Directory holding prompt templates that override the built-in ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_dir: Option<PathBuf>,

    /// Per-model timeout in the fallback chain
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_fallback_model() -> Option<String> {
    Some("gemini-1.5-flash-8b".into())
}
fn default_temperature() -> f32 {
    0.25
}
fn default_max_iterations() -> u32 {
    datacopilot_core::session::DEFAULT_ITERATION_BUDGET
}
fn default_llm_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".into()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            llm_model: default_llm_model(),
            fallback_llm_model: default_fallback_model(),
            temperature: default_temperature(),
            max_tokens: None,
            max_iterations: default_max_iterations(),
            api_key: None,
            api_url: default_llm_url(),
            prompt_dir: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for AgentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSettings")
            .field("llm_model", &self.llm_model)
            .field("fallback_llm_model", &self.fallback_llm_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_iterations", &self.max_iterations)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("prompt_dir", &self.prompt_dir)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Largest LIMIT a generated query may carry
    #[serde(default = "default_row_limit_cap")]
    pub row_limit_cap: u64,

    /// Largest estimated scan a query may perform, in bytes
    #[serde(default = "default_scan_cap_bytes")]
    pub scan_cap_bytes: u64,

    /// Rows rendered when the LLM does not ask for a count
    #[serde(default = "default_top_n_rows")]
    pub default_top_n_rows: usize,
}

fn default_row_limit_cap() -> u64 {
    1000
}
fn default_scan_cap_bytes() -> u64 {
    1024 * 1024 * 1024
}
fn default_top_n_rows() -> usize {
    50
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            row_limit_cap: default_row_limit_cap(),
            scan_cap_bytes: default_scan_cap_bytes(),
            default_top_n_rows: default_top_n_rows(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level when neither `--verbose` nor `--debug` is given
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file that always receives output
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_log_file() -> PathBuf {
    PathBuf::from("logs/app.log")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Values supplied on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub project: Option<String>,
    pub dataset: Option<String>,
    pub model: Option<String>,
    pub verbose: bool,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from `path`, or from the default settings path.
    ///
    /// Environment variables fill in what the file leaves empty:
    /// - `GOOGLE_API_KEY` → `agent.api_key`
    /// - `GOOGLE_OAUTH_ACCESS_TOKEN` → `bigquery.access_token`
    /// - `DATACOPILOT_MODEL` → `agent.llm_model` (always overrides)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No settings file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::info!("Settings loaded from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` as the variable source.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.agent.api_key.is_none() {
            self.agent.api_key = lookup("GOOGLE_API_KEY");
        }
        if self.bigquery.access_token.is_none() {
            self.bigquery.access_token = lookup("GOOGLE_OAUTH_ACCESS_TOKEN");
        }
        if let Some(model) = lookup("DATACOPILOT_MODEL") {
            self.agent.llm_model = model;
        }
    }

    /// Merge CLI flags into a copy of this configuration. CLI takes precedence.
    pub fn merge_cli(&self, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let mut merged = self.clone();
        if let Some(project) = &overrides.project {
            merged.bigquery.project_id = Some(project.clone());
        }
        if let Some(dataset) = &overrides.dataset {
            merged.bigquery.dataset_id = dataset.clone();
        }
        if let Some(model) = &overrides.model {
            merged.agent.llm_model = model.clone();
        }
        if overrides.debug {
            merged.logging.level = "debug".into();
        } else if overrides.verbose {
            merged.logging.level = "info".into();
        }
        merged.validate()?;
        tracing::debug!("Settings merge complete");
        Ok(merged)
    }

    /// The per-turn session configuration derived from these settings.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            dataset_id: self.bigquery.dataset_id.clone(),
            project_id: self.bigquery.project_id.clone(),
            model_id: self.agent.llm_model.clone(),
            iteration_budget: self.agent.max_iterations,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        match self.bigquery.dataset_id.trim().split_once('.') {
            Some((project, dataset))
                if !project.is_empty() && !dataset.is_empty() && !dataset.contains('.') => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "bigquery.dataset_id must be formatted 'project.dataset', got '{}'",
                    self.bigquery.dataset_id
                )));
            }
        }

        if self.guard.row_limit_cap == 0 || self.guard.default_top_n_rows == 0 {
            return Err(ConfigError::ValidationError(
                "guard.row_limit_cap and guard.default_top_n_rows must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default settings TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse settings file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for datacopilot_core::Error {
    fn from(err: ConfigError) -> Self {
        datacopilot_core::Error::Config {
            message: err.to_string(),
        }
    }
}
