//! Interfaces to the external capabilities the scheduler invokes and awaits.
//!
//! None of these carry scheduling logic. Implementations live in
//! `swarmer-agent` (model calls), `swarmer-memory` (knowledge) and
//! `swarmer-builtins` (artifacts); tests substitute scripted mocks.

use crate::error::SwarmResult;
use crate::record::Plan;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a text generator needs to know to speak as an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Agent id (its name).
    pub id: String,
    /// Primary role.
    pub role: String,
    /// Specialties at registration time.
    pub specialties: Vec<String>,
    /// Project overview the agent works within.
    pub overview: String,
}

/// `GenerateText(agentId, prompt)`.
///
/// Used for task execution, collaborative contributions, specialization
/// suggestions and role determination. Timeouts are the implementation's
/// concern; any error is treated as a dispatch failure by the caller.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a response as `agent_id` to `prompt`.
    async fn generate(&self, agent_id: &str, prompt: &str) -> SwarmResult<String>;

    /// Prime the generator with an agent's identity before its first call.
    async fn register_agent(&self, _profile: &AgentProfile) -> SwarmResult<()> {
        Ok(())
    }
}

/// `GenerateTasksAndAgents(goal, overview)`.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Decompose a goal into structured task and agent records.
    async fn generate_plan(&self, goal: &str, overview: &str) -> SwarmResult<Plan>;
}

/// `StoreKnowledge(text)` / `RetrieveKnowledge(query)`.
///
/// Best effort: callers log failures and carry on.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Store a piece of text.
    async fn store(&self, text: &str) -> SwarmResult<()>;

    /// Retrieve text relevant to `query`; empty when nothing matches.
    async fn retrieve(&self, query: &str) -> SwarmResult<String>;
}

/// `PersistFile(name, content)` / `ReadFile(name)` / `ListFiles()`.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write (or overwrite) a named artifact.
    async fn persist(&self, name: &str, content: &str) -> SwarmResult<()>;

    /// Read a named artifact.
    async fn read(&self, name: &str) -> SwarmResult<String>;

    /// List artifact names, sorted.
    async fn list(&self) -> SwarmResult<Vec<String>>;
}
