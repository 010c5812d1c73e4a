//! The three service agents
//!
//! Each submodule assembles one agent: its role, its system prompt, and
//! its tool set. Tools that need the LLM hold a provider handle injected
//! at construction; when none is configured they fail at dispatch time
//! and the rest of the agent keeps working.

pub mod ceo;
pub mod ouroboros;
pub mod polymath;

use std::sync::Arc;

use crate::llm::{CompletionRequest, Provider};

/// Run one completion for a tool prompt, failing when no provider is set.
pub(crate) async fn complete_text(
    provider: &Option<Arc<dyn Provider>>,
    prompt: String,
    temperature: f32,
) -> anyhow::Result<String> {
    let provider = provider
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no LLM provider configured"))?;

    let request = CompletionRequest::from_user(prompt).with_temperature(temperature);
    let response = provider.complete(request).await?;
    Ok(response.content)
}
