//! Service configuration
//!
//! Settings are loaded once at startup from environment variables, with
//! `.env` support via dotenvy. The resulting struct is passed by reference
//! and never mutated afterwards.

use std::path::PathBuf;

use crate::error::{AgentError, Result};

/// Default port for the HTTP server
const DEFAULT_PORT: u16 = 8000;

/// Runtime settings for the whole service
#[derive(Debug, Clone)]
pub struct Settings {
    /// OpenAI API key, if configured
    pub openai_api_key: Option<String>,
    /// Anthropic API key, if configured
    pub anthropic_api_key: Option<String>,
    /// Root of the workspace directory tree
    pub workspace_path: PathBuf,
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Timeout for a single agent run, in seconds
    pub task_timeout_secs: u64,
    /// Maximum number of tasks executing concurrently
    pub max_concurrent_tasks: usize,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// Reads `./.env` first (existing variables are never overwritten),
    /// then resolves each setting from its `TRINITY_*` variable or default.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let port = match std::env::var("TRINITY_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AgentError::Config(format!("invalid TRINITY_PORT: {}", raw)))?,
            Err(_) => DEFAULT_PORT,
        };

        let task_timeout_secs = parse_or_default("TRINITY_TASK_TIMEOUT_SECS", 300)?;
        let max_concurrent_tasks = parse_or_default("TRINITY_MAX_CONCURRENT_TASKS", 5)?;

        Ok(Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            workspace_path: std::env::var("TRINITY_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./workspace")),
            bind_addr: std::env::var("TRINITY_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            task_timeout_secs,
            max_concurrent_tasks,
        })
    }

    /// Whether any LLM provider credential is available
    pub fn has_llm_credentials(&self) -> bool {
        self.openai_api_key.is_some() || self.anthropic_api_key.is_some()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            workspace_path: PathBuf::from("./workspace"),
            bind_addr: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            task_timeout_secs: 300,
            max_concurrent_tasks: 5,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AgentError::Config(format!("invalid {}: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.task_timeout_secs, 300);
        assert_eq!(settings.max_concurrent_tasks, 5);
        assert!(!settings.has_llm_credentials());
    }

    #[test]
    fn test_llm_credentials() {
        let settings = Settings {
            openai_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(settings.has_llm_credentials());
    }
}
