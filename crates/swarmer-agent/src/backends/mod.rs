pub mod claude;
pub mod openai;

use async_trait::async_trait;
use swarmer_core::{Message, SwarmResult};

/// Trait for LLM provider backends.
///
/// Each provider implements this to handle its wire format. To add one:
/// create a module in `backends/`, add the variant to `LlmProvider` in
/// `config.rs` and wire it up in `LlmClient::new()` in `llm.rs`.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Non-streaming completion returning the reply text.
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> SwarmResult<String>;
}
