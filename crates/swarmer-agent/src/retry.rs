use crate::backends::LlmBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swarmer_core::{Message, SwarmError, SwarmResult};
use tracing::{info, warn};

/// Retry behaviour for transient provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub backoff_base_ms: u64,
    /// Cap for the exponential backoff, in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
        }
    }
}

/// Whether an error is transient and worth retrying.
///
/// Rate limits, timeouts and 5xx responses are retried; client errors such
/// as 400 and 401 are not.
pub fn is_retryable(err: &SwarmError) -> bool {
    if !matches!(err, SwarmError::Http(_)) {
        return false;
    }
    let lower = err.to_string().to_lowercase();
    if lower.contains("400") || lower.contains("401") || lower.contains("403") {
        return false;
    }
    lower.contains("429")
        || lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection")
        || lower.contains("500")
        || lower.contains("502")
        || lower.contains("503")
        || lower.contains("504")
        || lower.contains("529")
}

/// `backoff_base_ms * 2^attempt`, capped at `backoff_max_ms`.
pub fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> u64 {
    let delay = policy
        .backoff_base_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    delay.min(policy.backoff_max_ms)
}

/// Wraps a backend and retries transient failures with exponential backoff.
pub struct RetryingBackend {
    inner: Box<dyn LlmBackend>,
    policy: RetryPolicy,
}

impl RetryingBackend {
    pub fn new(inner: Box<dyn LlmBackend>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LlmBackend for RetryingBackend {
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> SwarmResult<String> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(system_prompt, messages).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.policy.max_retries && is_retryable(&e) => {
                    let delay = compute_backoff(&self.policy, attempt);
                    info!(attempt, delay_ms = delay, error = %e, "Retryable error, backing off");
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 0 {
                        warn!(attempts = attempt + 1, error = %e, "Giving up after retries");
                    }
                    return Err(e);
                }
            }
        }
    }
}
