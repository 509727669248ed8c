use crate::backends::claude::ClaudeBackend;
use crate::backends::openai::OpenAiBackend;
use crate::backends::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use crate::retry::RetryingBackend;
use swarmer_core::{Message, SwarmResult};

/// Provider-agnostic completion client shared by the generator and planner.
///
/// Wraps the provider backend in a [`RetryingBackend`] when the model config
/// carries a retry policy.
pub struct LlmClient {
    backend: Box<dyn LlmBackend>,
}

impl LlmClient {
    /// Build the backend for `config.provider`.
    pub fn new(config: ModelConfig) -> Self {
        let policy = config.retry_policy.clone();
        let provider: Box<dyn LlmBackend> = match config.provider {
            LlmProvider::Claude => Box::new(ClaudeBackend::new(config)),
            // OpenRouter and Groq speak the OpenAI chat completions dialect.
            LlmProvider::OpenAi | LlmProvider::OpenRouter | LlmProvider::Groq => {
                Box::new(OpenAiBackend::new(config))
            }
        };
        let backend: Box<dyn LlmBackend> = match policy {
            Some(policy) => Box::new(RetryingBackend::new(provider, policy)),
            None => provider,
        };
        Self { backend }
    }

    /// Wrap an existing backend, e.g. a scripted one in tests.
    pub fn from_backend(backend: Box<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// One-shot completion over `messages`.
    pub async fn complete(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> SwarmResult<String> {
        self.backend.complete(system_prompt, messages).await
    }
}
