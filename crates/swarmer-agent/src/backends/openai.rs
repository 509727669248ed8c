use super::LlmBackend;
use crate::config::{LlmProvider, ModelConfig};
use async_trait::async_trait;
use swarmer_core::{Message, Role, SwarmError, SwarmResult};

/// OpenAI-compatible chat completions backend.
///
/// Works with OpenAI, OpenRouter, Groq, Ollama, and any other provider
/// that implements the chat completions API.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_messages(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> Vec<serde_json::Value> {
        let mut api_messages: Vec<serde_json::Value> = Vec::new();

        if let Some(sys) = system_prompt {
            api_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }

        for m in messages {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => continue,
            };
            api_messages.push(serde_json::json!({
                "role": role,
                "content": m.content
            }));
        }

        api_messages
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter asks clients to identify themselves
        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request.header("X-Title", "swarmer")
        } else {
            request
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> SwarmResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": self.build_messages(system_prompt, messages),
        });

        let resp = self
            .add_provider_headers(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SwarmError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SwarmError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(SwarmError::Http(format!(
                "OpenAI API error {status}: {resp_body}"
            )));
        }

        parse_openai_response(&resp_body)
    }
}

/// Extract the first choice's message content.
pub fn parse_openai_response(body: &serde_json::Value) -> SwarmResult<String> {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| SwarmError::Generation("Missing content in chat completion".into()))?;
    Ok(content.to_string())
}
