use crate::registry::AgentRegistry;
use crate::task_store::TaskStore;
use crate::types::CollaborationGroup;
use serde::{Deserialize, Serialize};
use swarmer_core::SwarmResult;

/// A task bound to its agents for the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task_id: String,
    pub description: String,
    /// Role the task required.
    pub role: String,
    /// One agent for solo tasks, `group_size` agents for collaborative ones.
    pub agents: Vec<String>,
    pub collaborative: bool,
}

impl Assignment {
    /// The collaboration group, if this is a collaborative assignment.
    pub fn group(&self) -> Option<CollaborationGroup> {
        self.collaborative.then(|| CollaborationGroup {
            task_id: self.task_id.clone(),
            members: self.agents.clone(),
        })
    }
}

/// Why a ready task stayed Pending this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DeferReason {
    /// No available agent matches the role.
    NoEligibleAgent,
    /// Too few matching agents are free to form a group.
    InsufficientCollaborators { available: usize, required: usize },
}

/// A ready task skipped this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deferral {
    pub task_id: String,
    #[serde(flatten)]
    pub reason: DeferReason,
}

/// Result of one matching pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub assignments: Vec<Assignment>,
    pub deferred: Vec<Deferral>,
}

/// Single-pass assignment of ready tasks to available agents.
#[derive(Debug, Clone)]
pub struct Matcher {
    group_size: usize,
}

impl Default for Matcher {
    fn default() -> Self {
        Self { group_size: 2 }
    }
}

impl Matcher {
    pub fn new(group_size: usize) -> Self {
        Self {
            group_size: group_size.max(2),
        }
    }

    /// Walk the ready set in priority order and bind each task to the
    /// least-loaded matching agents. Booked agents leave the available pool
    /// for the rest of the pass.
    pub fn assign(
        &self,
        store: &mut TaskStore,
        registry: &mut AgentRegistry,
    ) -> SwarmResult<MatchOutcome> {
        let ready: Vec<(String, String, String, bool)> = store
            .ready_tasks()
            .into_iter()
            .map(|t| {
                (
                    t.id.clone(),
                    t.description.clone(),
                    t.role.clone(),
                    t.collaborative,
                )
            })
            .collect();

        let mut outcome = MatchOutcome::default();
        for (task_id, description, role, collaborative) in ready {
            let picked = if collaborative {
                self.pick_group(registry, &role)
            } else {
                Self::pick_solo(registry, &role)
            };

            let agents = match picked {
                Ok(agents) => agents,
                Err(reason) => {
                    tracing::debug!(task_id = %task_id, ?reason, "Task deferred");
                    outcome.deferred.push(Deferral { task_id, reason });
                    continue;
                }
            };

            registry.assign_all(&agents, &task_id)?;
            if !store.mark_assigned(&task_id, agents.clone()) {
                for agent in &agents {
                    registry.release(agent)?;
                }
                continue;
            }
            tracing::info!(
                task_id = %task_id,
                agents = ?agents,
                collaborative,
                "Task assigned"
            );
            outcome.assignments.push(Assignment {
                task_id,
                description,
                role,
                agents,
                collaborative,
            });
        }
        Ok(outcome)
    }

    fn pick_solo(registry: &AgentRegistry, role: &str) -> Result<Vec<String>, DeferReason> {
        let candidates = registry.available_for(role);
        registry
            .least_loaded(&candidates)
            .map(|agent| vec![agent.id.clone()])
            .ok_or(DeferReason::NoEligibleAgent)
    }

    /// The `group_size` least-loaded candidates; never a partial group.
    fn pick_group(&self, registry: &AgentRegistry, role: &str) -> Result<Vec<String>, DeferReason> {
        let mut candidates = registry.available_for(role);
        if candidates.len() < self.group_size {
            return Err(DeferReason::InsufficientCollaborators {
                available: candidates.len(),
                required: self.group_size,
            });
        }
        // Stable sort keeps registration order among equal loads.
        candidates.sort_by_key(|a| a.completed_count);
        Ok(candidates
            .into_iter()
            .take(self.group_size)
            .map(|a| a.id.clone())
            .collect())
    }
}
