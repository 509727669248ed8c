use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of the participant that authored a [`Message`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The scheduler speaking on behalf of the swarm.
    User,
    /// The model answering as an agent.
    Assistant,
    /// A system-level instruction or prompt.
    System,
}

/// A single message in an agent's conversation with the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub id: Uuid,
    /// The role of the message author.
    pub role: Role,
    /// The textual content of the message.
    pub content: String,
    /// Agent whose conversation this message belongs to.
    pub agent_id: String,
    /// UTC timestamp of when the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a new message with the given role, content, and agent.
    pub fn new(role: Role, content: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a new message with [`Role::User`].
    pub fn user(content: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self::new(Role::User, content, agent_id)
    }

    /// Creates a new message with [`Role::Assistant`].
    pub fn assistant(content: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, agent_id)
    }

    /// Creates a new message with [`Role::System`].
    pub fn system(content: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self::new(Role::System, content, agent_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Draft the schema", "alice");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Draft the schema");
        assert_eq!(msg.agent_id, "alice");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
