//! Retrying provider decorator
//!
//! Wraps any provider with bounded exponential backoff. Only transient
//! failures (rate limits and 5xx-class responses) are retried; a
//! Retry-After hint in the error text overrides the computed delay.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{CompletionRequest, CompletionResponse, Provider};
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Provider wrapper that retries transient failures
pub struct Retrying<P: Provider> {
    inner: P,
    config: RetryConfig,
}

impl<P: Provider> Retrying<P> {
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn is_retryable(error_msg: &str) -> bool {
        let lower = error_msg.to_lowercase();
        lower.contains("429")
            || lower.contains("rate limit")
            || lower.contains("500")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("504")
            || lower.contains("overloaded")
            || lower.contains("server error")
            || lower.contains("bad gateway")
            || lower.contains("service unavailable")
            || lower.contains("gateway timeout")
    }

    fn parse_retry_after(error_msg: &str) -> Option<u64> {
        let lower = error_msg.to_lowercase();
        let pos = lower.find("retry-after")?;
        let after = &error_msg[pos..];
        for word in after.split_whitespace().skip(1) {
            let cleaned = word.trim_end_matches(|c: char| !c.is_ascii_digit());
            if let Ok(secs) = cleaned.parse::<u64>() {
                return Some(secs * 1000);
            }
        }
        None
    }

    fn compute_delay(&self, attempt: u32) -> u64 {
        let base = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        let jitter = (base * 0.1 * rand_jitter(attempt)) as u64;
        let delay = (base as u64).saturating_add(jitter);
        delay.min(self.config.max_delay_ms)
    }
}

/// Simple deterministic jitter based on attempt number (no rand crate needed).
fn rand_jitter(attempt: u32) -> f64 {
    let x = attempt.wrapping_mul(2654435761);
    (x % 100) as f64 / 100.0
}

#[async_trait]
impl<P: Provider> Provider for Retrying<P> {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let error_msg = e.to_string();

                    if attempt == self.config.max_retries || !Self::is_retryable(&error_msg) {
                        return Err(e);
                    }

                    let delay = Self::parse_retry_after(&error_msg)
                        .unwrap_or_else(|| self.compute_delay(attempt));

                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay,
                        error = %error_msg,
                        "Retrying LLM request"
                    );

                    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.expect("at least one attempt was made"))
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;

    struct DummyProvider;

    #[async_trait]
    impl Provider for DummyProvider {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: "dummy".to_string(),
                model: "dummy".to_string(),
                usage: None,
            })
        }
        fn model(&self) -> &str {
            "dummy"
        }
    }

    #[test]
    fn test_default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retryable_error_detection() {
        assert!(Retrying::<DummyProvider>::is_retryable(
            "OpenAI API error 429 Too Many Requests: rate limit exceeded"
        ));
        assert!(Retrying::<DummyProvider>::is_retryable(
            "Anthropic API error 500 Internal Server Error"
        ));
        assert!(Retrying::<DummyProvider>::is_retryable(
            "503 Service Unavailable"
        ));
        assert!(!Retrying::<DummyProvider>::is_retryable(
            "API error 401 Unauthorized"
        ));
        assert!(!Retrying::<DummyProvider>::is_retryable(
            "Invalid request: missing model field"
        ));
    }

    #[test]
    fn test_parse_retry_after_from_error() {
        let msg = "429 Too Many Requests, retry-after: 5";
        assert_eq!(Retrying::<DummyProvider>::parse_retry_after(msg), Some(5000));
        assert_eq!(Retrying::<DummyProvider>::parse_retry_after("no hint"), None);
    }

    #[test]
    fn test_compute_delay_respects_max() {
        let retrying = Retrying {
            inner: DummyProvider,
            config: RetryConfig {
                max_retries: 5,
                initial_delay_ms: 500,
                max_delay_ms: 2000,
                backoff_multiplier: 10.0,
            },
        };
        assert!(retrying.compute_delay(5) <= 2000);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        struct AlwaysUnauthorized;

        #[async_trait]
        impl Provider for AlwaysUnauthorized {
            async fn complete(&self, _r: CompletionRequest) -> Result<CompletionResponse> {
                Err(AgentError::Provider("API error 401 Unauthorized".into()))
            }
            fn model(&self) -> &str {
                "x"
            }
        }

        let retrying = Retrying::new(AlwaysUnauthorized, RetryConfig::default());
        let err = retrying
            .complete(CompletionRequest::from_user("hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
