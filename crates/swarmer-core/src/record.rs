use crate::error::AdmissionError;
use serde::{Deserialize, Serialize};

/// A structured task description as produced by a plan generator or a user.
///
/// Records are validated at the schema boundary before they reach the backlog;
/// the scheduler never interprets free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique task id (e.g. `T1`).
    pub id: String,
    /// What needs to be done.
    pub description: String,
    /// Role or specialty required of the agent.
    pub role: String,
    /// Base priority, 1 is highest.
    pub priority: u32,
    /// Ids of tasks that must complete first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Whether the task needs a collaboration group.
    #[serde(default)]
    pub collaborative: bool,
}

impl TaskRecord {
    /// Create a solo task record with no dependencies.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        role: impl Into<String>,
        priority: u32,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            role: role.into(),
            priority,
            dependencies: Vec::new(),
            collaborative: false,
        }
    }

    /// Set the dependency list.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the task as collaborative.
    pub fn collaborative(mut self) -> Self {
        self.collaborative = true;
        self
    }

    /// Check the record's own fields. Graph checks happen at admission.
    pub fn validate(&self) -> Result<(), AdmissionError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(AdmissionError::malformed("<missing>", "task id is empty"));
        }
        if self.description.trim().is_empty() {
            return Err(AdmissionError::malformed(id, "description is empty"));
        }
        if self.role.trim().is_empty() {
            return Err(AdmissionError::malformed(id, "role is empty"));
        }
        if self.priority == 0 {
            return Err(AdmissionError::malformed(id, "priority must be >= 1"));
        }
        if self.dependencies.iter().any(|d| d.trim().is_empty()) {
            return Err(AdmissionError::malformed(id, "empty dependency id"));
        }
        Ok(())
    }
}

/// A structured agent description as produced by a plan generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Unique agent name, doubles as its id.
    pub name: String,
    /// Primary role.
    pub role: String,
    /// Additional specialties.
    #[serde(default)]
    pub specialties: Vec<String>,
}

impl AgentRecord {
    /// Create an agent record.
    pub fn new<I, S>(name: impl Into<String>, role: impl Into<String>, specialties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            role: role.into(),
            specialties: specialties.into_iter().map(Into::into).collect(),
        }
    }

    /// Reject records with an empty name or role.
    pub fn validate(&self) -> Result<(), AdmissionError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AdmissionError::malformed("<missing>", "agent name is empty"));
        }
        if self.role.trim().is_empty() {
            return Err(AdmissionError::malformed(name, "agent role is empty"));
        }
        Ok(())
    }
}

/// The output of goal decomposition: tasks plus the agents to work on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Task records, in the order they should be admitted.
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    /// Agent records, in registration order.
    #[serde(default)]
    pub agents: Vec<AgentRecord>,
}
