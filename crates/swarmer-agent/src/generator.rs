use crate::config::ModelConfig;
use crate::context::ContextWindow;
use crate::llm::LlmClient;
use async_trait::async_trait;
use std::collections::HashMap;
use swarmer_core::{AgentProfile, Message, SwarmError, SwarmResult, TextGenerator};
use tokio::sync::Mutex;
use tracing::debug;

const SWARM_SYSTEM_PROMPT: &str = "You coordinate a swarm of specialist agents working on a \
shared project. Answer concisely and only with what was asked.";

/// `TextGenerator` backed by an LLM provider.
///
/// Every agent gets its own conversation: a system prompt built from its
/// profile plus a bounded history of earlier exchanges. Identities that were
/// never registered (such as the swarm coordinator) get a generic prompt.
pub struct LlmTextGenerator {
    client: LlmClient,
    contexts: Mutex<HashMap<String, ContextWindow>>,
    history_limit: usize,
}

impl LlmTextGenerator {
    pub fn new(config: ModelConfig) -> Self {
        let history_limit = config.history_limit;
        Self::from_client(LlmClient::new(config), history_limit)
    }

    pub fn from_client(client: LlmClient, history_limit: usize) -> Self {
        Self {
            client,
            contexts: Mutex::new(HashMap::new()),
            history_limit,
        }
    }

    /// Messages currently retained for `agent_id`.
    pub async fn history_len(&self, agent_id: &str) -> usize {
        self.contexts
            .lock()
            .await
            .get(agent_id)
            .map_or(0, |c| c.messages().len())
    }

    fn fresh_context(&self) -> ContextWindow {
        let mut window = ContextWindow::new(self.history_limit);
        window.set_system_prompt(SWARM_SYSTEM_PROMPT);
        window
    }
}

/// System prompt introducing an agent to the model.
pub fn agent_system_prompt(profile: &AgentProfile) -> String {
    let mut prompt = format!(
        "You are {}, a {} in a swarm of collaborating agents.",
        profile.id, profile.role
    );
    if !profile.specialties.is_empty() {
        prompt.push_str(&format!(
            " Your specialties: {}.",
            profile.specialties.join(", ")
        ));
    }
    prompt.push_str(&format!(
        " You are responsible for tasks related to {}.",
        profile.role
    ));
    if !profile.overview.trim().is_empty() {
        prompt.push_str(&format!("\n\nProject overview: {}", profile.overview.trim()));
    }
    prompt
}

#[async_trait]
impl TextGenerator for LlmTextGenerator {
    async fn generate(&self, agent_id: &str, prompt: &str) -> SwarmResult<String> {
        let user = Message::user(prompt, agent_id);
        let (system, mut history) = {
            let mut contexts = self.contexts.lock().await;
            let window = contexts
                .entry(agent_id.to_string())
                .or_insert_with(|| self.fresh_context());
            (
                window.system_prompt().map(str::to_string),
                window.messages().to_vec(),
            )
        };
        history.push(user.clone());

        // The lock is not held across the call so agents run concurrently.
        let reply = self
            .client
            .complete(system.as_deref(), &history)
            .await
            .map_err(|e| match e {
                SwarmError::Generation(_) => e,
                other => SwarmError::Generation(format!("{agent_id}: {other}")),
            })?;

        let mut contexts = self.contexts.lock().await;
        if let Some(window) = contexts.get_mut(agent_id) {
            window.push(user);
            window.push(Message::assistant(reply.clone(), agent_id));
            debug!(
                agent = %agent_id,
                messages = window.messages().len(),
                tokens = window.estimated_tokens(),
                "Conversation updated"
            );
        }
        Ok(reply)
    }

    async fn register_agent(&self, profile: &AgentProfile) -> SwarmResult<()> {
        let mut window = ContextWindow::new(self.history_limit);
        window.set_system_prompt(agent_system_prompt(profile));
        self.contexts.lock().await.insert(profile.id.clone(), window);
        Ok(())
    }
}
