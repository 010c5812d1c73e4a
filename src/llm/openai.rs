//! OpenAI API client
//!
//! Direct HTTP client for the OpenAI Chat Completions API, translating
//! between the service's provider-neutral types and the OpenAI format.
//!
//! # Authentication
//!
//! Uses an OpenAI API key (set via `OPENAI_API_KEY` environment variable
//! or passed directly).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::types::{CompletionRequest, CompletionResponse, Provider, Role, Usage};
use crate::error::{AgentError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI Chat Completions provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

// ============================================================================
// OpenAI-specific request/response types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    // Null when the model replies with something other than text
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAiProvider {
    /// Create a new provider with an explicit API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::new();
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Create a provider from the OPENAI_API_KEY environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Config("OPENAI_API_KEY not set".to_string()))?;
        Self::new(api_key)
    }

    /// Override the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn convert_messages(request: &CompletionRequest) -> Vec<OpenAiMessage> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        // OpenAI carries the system prompt as a leading message
        if let Some(system) = &request.system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        for msg in &request.messages {
            messages.push(OpenAiMessage {
                role: match msg.role {
                    Role::User => "user".to_string(),
                    Role::Assistant => "assistant".to_string(),
                },
                content: msg.content.clone(),
            });
        }

        messages
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = OpenAiRequest {
            model: self.model.clone(),
            messages: Self::convert_messages(&request),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(model = %self.model, "Sending OpenAI completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Provider(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(|v| format!(", retry-after: {}", v))
                .unwrap_or_default();
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!(
                "OpenAI API error {}{}: {}",
                status, retry_after, text
            )));
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("failed to parse OpenAI response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("OpenAI response had no choices".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: parsed.model,
            usage: parsed.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[test]
    fn test_convert_messages_places_system_first() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")],
            system: Some("You are terse.".to_string()),
            temperature: 0.2,
            max_tokens: 100,
        };

        let messages = OpenAiProvider::convert_messages(&request);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
    }

    #[test]
    fn test_builder_overrides() {
        let provider = OpenAiProvider::new("sk-test")
            .unwrap()
            .with_model("gpt-4o-mini")
            .with_api_base("http://localhost:9999/v1");
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.api_base, "http://localhost:9999/v1");
    }
}
