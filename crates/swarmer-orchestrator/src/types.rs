use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swarmer_core::{AgentRecord, TaskRecord};

/// Lifecycle state of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the backlog.
    Pending,
    /// Bound to one agent or a collaboration group for the current round.
    Assigned,
    /// Terminal: moved to the completed log.
    Completed,
    /// Terminal: retry ceiling reached.
    Failed {
        /// Last dispatch error.
        reason: String,
    },
}

/// A task in the backlog, completed log, or failed log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub role: String,
    /// 1 is highest. Immutable after admission.
    pub base_priority: u32,
    /// Recomputed every round; never used across rounds.
    pub effective_priority: f64,
    pub dependencies: Vec<String>,
    pub collaborative: bool,
    pub state: TaskState,
    /// Rounds spent Pending since admission.
    pub rounds_waited: u32,
    /// Dispatch failures so far.
    pub failures: u32,
    /// Agents holding the task while Assigned.
    pub assignees: Vec<String>,
    /// Output of the successful dispatch.
    pub output: Option<String>,
    /// Admission sequence number, the tie-break for equal priorities.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a Pending task from a validated record.
    pub fn from_record(record: TaskRecord, seq: u64) -> Self {
        let mut dependencies: Vec<String> = Vec::with_capacity(record.dependencies.len());
        for dep in record.dependencies {
            let dep = dep.trim().to_string();
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }
        Self {
            id: record.id.trim().to_string(),
            description: record.description,
            role: record.role.trim().to_string(),
            base_priority: record.priority,
            effective_priority: f64::from(record.priority),
            dependencies,
            collaborative: record.collaborative,
            state: TaskState::Pending,
            rounds_waited: 0,
            failures: 0,
            assignees: Vec::new(),
            output: None,
            seq,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == TaskState::Pending
    }
}

/// A worker in the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique name, doubles as id.
    pub id: String,
    pub role: String,
    /// Grows over the agent's lifetime.
    pub specialties: Vec<String>,
    /// Id of the held task; the task itself stays owned by the task store.
    pub current_task: Option<String>,
    pub completed_count: u32,
    /// Descriptions of completed tasks, oldest first.
    pub completed_descriptions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn new<I, S>(id: impl Into<String>, role: impl Into<String>, specialties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            role: role.into(),
            specialties: specialties.into_iter().map(Into::into).collect(),
            current_task: None,
            completed_count: 0,
            completed_descriptions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn from_record(record: AgentRecord) -> Self {
        Self::new(
            record.name.trim(),
            record.role.trim(),
            record
                .specialties
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        )
    }

    /// True iff the agent holds no task.
    pub fn is_available(&self) -> bool {
        self.current_task.is_none()
    }

    /// Whether this agent may take a task requiring `role`.
    pub fn can_take(&self, role: &str) -> bool {
        capability_matches(&self.role, &self.specialties, role)
    }
}

/// Pure role/specialty check: case-insensitive, whitespace-trimmed equality
/// of `required` against the role or any specialty.
pub fn capability_matches(role: &str, specialties: &[String], required: &str) -> bool {
    let required = required.trim();
    if required.is_empty() {
        return false;
    }
    std::iter::once(role)
        .chain(specialties.iter().map(String::as_str))
        .any(|have| have.trim().eq_ignore_ascii_case(required))
}

/// Agents jointly bound to one collaborative task for a single round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaborationGroup {
    pub task_id: String,
    pub members: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_from_record_dedups_dependencies() {
        let record = TaskRecord::new("T3", "Integrate", "dev", 2).with_dependencies(["T1", " T1", "T2"]);
        let task = Task::from_record(record, 7);
        assert_eq!(task.dependencies, vec!["T1".to_string(), "T2".to_string()]);
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.seq, 7);
        assert!((task.effective_priority - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_capability_matches_role_or_specialty() {
        let specialties = vec!["Testing".to_string(), "ci".to_string()];
        assert!(capability_matches("Developer", &specialties, "developer"));
        assert!(capability_matches("Developer", &specialties, " testing "));
        assert!(capability_matches("Developer", &specialties, "CI"));
        assert!(!capability_matches("Developer", &specialties, "design"));
        assert!(!capability_matches("Developer", &specialties, ""));
    }

    #[test]
    fn test_agent_availability() {
        let mut agent = Agent::new("alice", "dev", ["rust"]);
        assert!(agent.is_available());
        agent.current_task = Some("T1".into());
        assert!(!agent.is_available());
    }

    #[test]
    fn test_agent_from_record_drops_blank_specialties() {
        let agent = Agent::from_record(AgentRecord::new(" bob ", "qa", ["", " fuzzing "]));
        assert_eq!(agent.id, "bob");
        assert_eq!(agent.specialties, vec!["fuzzing".to_string()]);
    }

    #[test]
    fn test_task_state_serialization() {
        let state = TaskState::Failed {
            reason: "timeout".to_string(),
        };
        let json = serde_json::to_string(&state).unwrap_or_default();
        assert!(json.contains("timeout"));
    }
}
