use std::fmt;
use thiserror::Error;

/// A convenience `Result` alias using [`SwarmError`].
pub type SwarmResult<T> = Result<T, SwarmError>;

/// Top-level error type for the swarmer workspace.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Error, Debug)]
pub enum SwarmError {
    /// A task was rejected before entering the backlog.
    #[error("Admission error: {0}")]
    Admission(#[from] AdmissionError),

    /// An agent with the same id is already registered.
    #[error("Duplicate agent: {0}")]
    DuplicateAgent(String),

    /// No agent with this id is registered.
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// No task with this id was ever admitted.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// The agent already holds a task.
    #[error("Agent {agent} is busy with task {task}")]
    AgentBusy {
        /// Agent holding the task.
        agent: String,
        /// Task currently held.
        task: String,
    },

    /// The text-generation capability failed or timed out.
    #[error("Generation error: {0}")]
    Generation(String),

    /// The knowledge side channel failed.
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Artifact storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a task could not be admitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// A task with this id is already in the backlog, completed log, or failed log.
    #[error("task id '{0}' is already present")]
    DuplicateId(String),

    /// A dependency edge is unusable.
    #[error("task '{task}' has invalid dependency '{dependency}': {fault}")]
    InvalidDependency {
        /// The task being admitted.
        task: String,
        /// The offending dependency id.
        dependency: String,
        /// What is wrong with it.
        fault: DependencyFault,
    },

    /// The record itself is malformed (empty fields, zero priority, unparseable plan).
    #[error("malformed record '{id}': {reason}")]
    MalformedRecord {
        /// Record id, or a placeholder when the id itself is missing.
        id: String,
        /// Human-readable description of the problem.
        reason: String,
    },
}

/// The kind of problem found on a dependency edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyFault {
    /// The dependency id is neither pending nor completed.
    Unknown,
    /// The task depends on itself.
    SelfReference,
    /// Admitting the task would close a cycle; holds the cycle path.
    Cycle(Vec<String>),
    /// The dependency already failed terminally and can never complete.
    Failed,
}

impl fmt::Display for DependencyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyFault::Unknown => write!(f, "unknown task"),
            DependencyFault::SelfReference => write!(f, "self reference"),
            DependencyFault::Cycle(path) => write!(f, "cycle {}", path.join(" -> ")),
            DependencyFault::Failed => write!(f, "dependency failed terminally"),
        }
    }
}

impl AdmissionError {
    /// Shorthand for an [`AdmissionError::InvalidDependency`].
    pub fn invalid_dependency(
        task: impl Into<String>,
        dependency: impl Into<String>,
        fault: DependencyFault,
    ) -> Self {
        Self::InvalidDependency {
            task: task.into(),
            dependency: dependency.into(),
            fault,
        }
    }

    /// Shorthand for an [`AdmissionError::MalformedRecord`].
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
