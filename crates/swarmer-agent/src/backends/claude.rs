use super::LlmBackend;
use crate::config::ModelConfig;
use async_trait::async_trait;
use serde::Serialize;
use swarmer_core::{Message, Role, SwarmError, SwarmResult};

/// Claude (Anthropic) Messages API backend.
pub struct ClaudeBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl ClaudeBackend {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmBackend for ClaudeBackend {
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        messages: &[Message],
    ) -> SwarmResult<String> {
        let url = format!("{}/v1/messages", self.config.base_url());

        let api_messages: Vec<ClaudeMessage> = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => return None,
                };
                Some(ClaudeMessage {
                    role,
                    content: &m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": api_messages,
        });

        if let Some(sys) = system_prompt {
            body["system"] = serde_json::json!(sys);
        }

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
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
                "Claude API error {status}: {resp_body}"
            )));
        }

        parse_claude_response(&resp_body)
    }
}

// -- Claude wire types --

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Concatenate the text blocks of a Messages API response.
pub fn parse_claude_response(body: &serde_json::Value) -> SwarmResult<String> {
    let content = body["content"]
        .as_array()
        .ok_or_else(|| SwarmError::Generation("Missing content in Claude response".into()))?;

    let text_parts: Vec<&str> = content
        .iter()
        .filter(|block| block["type"].as_str() == Some("text"))
        .filter_map(|block| block["text"].as_str())
        .collect();

    if text_parts.is_empty() {
        return Err(SwarmError::Generation(
            "Claude response contained no text".into(),
        ));
    }
    Ok(text_parts.join("\n"))
}
