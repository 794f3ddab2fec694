//! Model fallback: an ordered retry chain with per-entry timeouts.
//!
//! When the primary model fails (timeout, rate limit, error), the next entry
//! in the chain answers the same request. An entry may pin its own model so
//! that one endpoint can back itself up with a cheaper model.

use async_trait::async_trait;
use datacopilot_core::error::ProviderError;
use datacopilot_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that wraps an ordered list of providers and falls back on failure.
pub struct FallbackProvider {
    name: String,
    chain: Vec<FallbackEntry>,
}

/// A single entry in the fallback chain.
struct FallbackEntry {
    provider: Arc<dyn datacopilot_core::Provider>,
    /// Replaces `request.model` for this entry when set
    model: Option<String>,
    timeout: Duration,
}

impl FallbackProvider {
    /// Create a new fallback provider with no entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a provider that answers with the requested model.
    pub fn add(mut self, provider: Arc<dyn datacopilot_core::Provider>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry {
            provider,
            model: None,
            timeout,
        });
        self
    }

    /// Add a provider that always answers with `model`.
    pub fn add_model(
        mut self,
        provider: Arc<dyn datacopilot_core::Provider>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        self.chain.push(FallbackEntry {
            provider,
            model: Some(model.into()),
            timeout,
        });
        self
    }

    /// Add a provider with the default timeout (120s).
    pub fn add_default(self, provider: Arc<dyn datacopilot_core::Provider>) -> Self {
        self.add(provider, Duration::from_secs(120))
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl datacopilot_core::Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut last_error = ProviderError::NotConfigured("No providers in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let provider_name = entry.provider.name().to_string();
            let mut attempt = request.clone();
            if let Some(model) = &entry.model {
                attempt.model = model.clone();
            }

            info!(
                provider = %provider_name,
                model = %attempt.model,
                attempt = i + 1,
                total = self.chain.len(),
                "Fallback: trying provider"
            );

            match tokio::time::timeout(entry.timeout, entry.provider.complete(attempt)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    warn!(
                        provider = %provider_name,
                        error = %e,
                        "Fallback: provider failed, trying next"
                    );
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        provider = %provider_name,
                        timeout_secs = entry.timeout.as_secs(),
                        "Fallback: provider timed out, trying next"
                    );
                    last_error = ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {}s",
                        provider_name,
                        entry.timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        for entry in &self.chain {
            if let Ok(true) = entry.provider.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
