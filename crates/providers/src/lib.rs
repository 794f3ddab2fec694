//! LLM Provider implementations for Data Copilot.
//!
//! All providers implement the `datacopilot_core::Provider` trait.
//! [`build_from_config`] assembles the primary model and its fallback.

pub mod fallback;
pub mod openai_compat;

pub use fallback::FallbackProvider;
pub use openai_compat::OpenAiCompatProvider;

use datacopilot_config::AppConfig;
use datacopilot_core::error::ProviderError;
use datacopilot_core::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Build the LLM capability described by `config`.
///
/// With a fallback model configured, the primary model is tried first and
/// the fallback model answers when it fails; otherwise the bare client is
/// returned.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .agent
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured("GOOGLE_API_KEY is not set and agent.api_key is empty".into())
        })?;

    let timeout = Duration::from_secs(config.agent.timeout_secs);
    let client: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::with_timeout(
        "gemini",
        config.agent.api_url.clone(),
        api_key,
        timeout,
    ));

    let Some(fallback_model) = config
        .agent
        .fallback_llm_model
        .clone()
        .filter(|m| !m.is_empty() && *m != config.agent.llm_model)
    else {
        return Ok(client);
    };

    tracing::debug!(
        primary = %config.agent.llm_model,
        fallback = %fallback_model,
        "Configured model fallback"
    );

    Ok(Arc::new(
        FallbackProvider::new("gemini-with-fallback")
            .add(client.clone(), timeout)
            .add_model(client, fallback_model, timeout),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_not_configured() {
        let config = AppConfig::default();
        match build_from_config(&config) {
            Err(ProviderError::NotConfigured(msg)) => assert!(msg.contains("GOOGLE_API_KEY")),
            Err(other) => panic!("Expected NotConfigured, got: {other:?}"),
            Ok(_) => panic!("Expected an error without an API key"),
        }
    }

    #[test]
    fn fallback_chain_wraps_primary() {
        let mut config = AppConfig::default();
        config.agent.api_key = Some("key".into());
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "gemini-with-fallback");
    }

    #[test]
    fn no_fallback_model_returns_bare_client() {
        let mut config = AppConfig::default();
        config.agent.api_key = Some("key".into());
        config.agent.fallback_llm_model = None;
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "gemini");
    }
}
