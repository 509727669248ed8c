use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use swarmer_core::{SwarmError, SwarmResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Claude,
    OpenAi,
    OpenRouter,
    /// Groq cloud inference, OpenAI-compatible API.
    Groq,
}

impl LlmProvider {
    /// Environment variable consulted when no key is configured.
    pub fn default_key_env(&self) -> &'static str {
        match self {
            LlmProvider::Claude => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
            LlmProvider::Groq => "GROQ_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: LlmProvider,
    pub model_id: String,
    /// Left empty to read the key from `api_key_env`.
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's default key variable.
    #[serde(default)]
    pub api_key_env: Option<String>,
    pub api_base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Messages kept per agent conversation.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_history_limit() -> usize {
    20
}

impl ModelConfig {
    pub fn new(provider: LlmProvider, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            api_key: String::new(),
            api_key_env: None,
            api_base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            history_limit: default_history_limit(),
            retry_policy: None,
        }
    }

    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url
        } else {
            match self.provider {
                LlmProvider::Claude => "https://api.anthropic.com",
                LlmProvider::OpenAi => "https://api.openai.com",
                LlmProvider::OpenRouter => "https://openrouter.ai/api",
                LlmProvider::Groq => "https://api.groq.com/openai",
            }
        }
    }

    /// Name of the environment variable holding the API key.
    pub fn key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_key_env())
    }

    /// Fill `api_key` from the environment when it is empty.
    ///
    /// A missing key is a configuration error: the swarm cannot run without
    /// its text-generation capability.
    pub fn resolve_api_key(&mut self) -> SwarmResult<()> {
        if !self.api_key.trim().is_empty() {
            return Ok(());
        }
        let var = self.key_env().to_string();
        match std::env::var(&var) {
            Ok(key) if !key.trim().is_empty() => {
                self.api_key = key.trim().to_string();
                Ok(())
            }
            _ => Err(SwarmError::Config(format!(
                "no API key configured and {var} is not set"
            ))),
        }
    }

    pub fn validate(&self) -> SwarmResult<()> {
        if self.model_id.trim().is_empty() {
            return Err(SwarmError::Config("model_id is empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SwarmError::Config(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(SwarmError::Config("max_tokens must be > 0".into()));
        }
        if self.history_limit == 0 {
            return Err(SwarmError::Config("history_limit must be > 0".into()));
        }
        Ok(())
    }
}
