//! LLM provider layer
//!
//! A provider-neutral completion interface with OpenAI and Anthropic
//! backends, plus a retrying decorator for transient failures.

pub mod anthropic;
pub mod openai;
pub mod retry;
pub mod types;

use std::sync::Arc;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use retry::{Retrying, RetryConfig};
pub use types::{ChatMessage, CompletionRequest, CompletionResponse, Provider, Role, Usage};

use crate::config::Settings;
use crate::error::Result;

/// Build a provider from the configured credentials.
///
/// Prefers OpenAI when both keys are present, matching the lookup order
/// of the configuration. Returns None when no key is configured; the
/// service still runs, with LLM-backed tools reporting failures.
pub fn provider_from_settings(settings: &Settings) -> Result<Option<Arc<dyn Provider>>> {
    if let Some(key) = &settings.openai_api_key {
        let provider = Retrying::new(OpenAiProvider::new(key.clone())?, RetryConfig::default());
        tracing::info!(model = %provider.model(), "Using OpenAI provider");
        return Ok(Some(Arc::new(provider)));
    }
    if let Some(key) = &settings.anthropic_api_key {
        let provider = Retrying::new(AnthropicProvider::new(key.clone())?, RetryConfig::default());
        tracing::info!(model = %provider.model(), "Using Anthropic provider");
        return Ok(Some(Arc::new(provider)));
    }

    tracing::warn!("No LLM API key configured; LLM-backed tools will be unavailable");
    Ok(None)
}
