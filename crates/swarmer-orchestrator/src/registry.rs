use crate::types::Agent;
use swarmer_core::{SwarmError, SwarmResult};

/// Tracks every agent in the pool, in registration order.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    /// Agents with completions since the last `take_newly_completed`.
    newly_completed: Vec<String>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent. Fails on id collision.
    pub fn register(&mut self, agent: Agent) -> SwarmResult<()> {
        if self.contains(&agent.id) {
            return Err(SwarmError::DuplicateAgent(agent.id));
        }
        tracing::info!(agent = %agent.id, role = %agent.role, "Agent registered");
        self.agents.push(agent);
        Ok(())
    }

    /// Remove an idle agent. An agent holding a task is never removed.
    pub fn deregister(&mut self, id: &str) -> SwarmResult<Agent> {
        let idx = self
            .agents
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| SwarmError::UnknownAgent(id.to_string()))?;
        if let Some(task) = &self.agents[idx].current_task {
            return Err(SwarmError::AgentBusy {
                agent: id.to_string(),
                task: task.clone(),
            });
        }
        self.newly_completed.retain(|a| a != id);
        let agent = self.agents.remove(idx);
        tracing::info!(agent = %agent.id, "Agent removed");
        Ok(agent)
    }

    /// All agents whose role or specialties match `role`, busy or not.
    pub fn find_by_role(&self, role: &str) -> Vec<&Agent> {
        self.agents.iter().filter(|a| a.can_take(role)).collect()
    }

    /// Available agents matching `role`, in registration order.
    pub fn available_for(&self, role: &str) -> Vec<&Agent> {
        self.agents
            .iter()
            .filter(|a| a.is_available() && a.can_take(role))
            .collect()
    }

    /// The candidate with the fewest completions; first registered wins ties.
    pub fn least_loaded<'a>(&self, candidates: &[&'a Agent]) -> Option<&'a Agent> {
        let mut best: Option<&'a Agent> = None;
        for agent in &self.agents {
            if let Some(candidate) = candidates.iter().find(|c| c.id == agent.id) {
                if best.map_or(true, |b| candidate.completed_count < b.completed_count) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Bind a task to an idle agent.
    pub fn assign(&mut self, agent_id: &str, task_id: &str) -> SwarmResult<()> {
        let agent = self.get_mut(agent_id)?;
        if let Some(held) = &agent.current_task {
            return Err(SwarmError::AgentBusy {
                agent: agent_id.to_string(),
                task: held.clone(),
            });
        }
        agent.current_task = Some(task_id.to_string());
        Ok(())
    }

    /// Bind a task to every agent in `agent_ids`, or to none of them.
    pub fn assign_all(&mut self, agent_ids: &[String], task_id: &str) -> SwarmResult<()> {
        for (bound, agent_id) in agent_ids.iter().enumerate() {
            if let Err(e) = self.assign(agent_id, task_id) {
                for earlier in &agent_ids[..bound] {
                    self.release(earlier)?;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Clear an agent's task without crediting it.
    pub fn release(&mut self, agent_id: &str) -> SwarmResult<()> {
        self.get_mut(agent_id)?.current_task = None;
        Ok(())
    }

    /// Credit a completed task and free the agent.
    pub fn record_completion(&mut self, agent_id: &str, description: &str) -> SwarmResult<()> {
        let agent = self.get_mut(agent_id)?;
        agent.current_task = None;
        agent.completed_count += 1;
        agent.completed_descriptions.push(description.to_string());
        if !self.newly_completed.iter().any(|a| a == agent_id) {
            self.newly_completed.push(agent_id.to_string());
        }
        Ok(())
    }

    /// Agents that completed work since the previous call, in completion order.
    pub fn take_newly_completed(&mut self) -> Vec<String> {
        std::mem::take(&mut self.newly_completed)
    }

    /// Append a specialty unless already present (case-insensitive).
    pub fn add_specialty(&mut self, agent_id: &str, specialty: &str) -> SwarmResult<bool> {
        let agent = self.get_mut(agent_id)?;
        let specialty = specialty.trim();
        if specialty.is_empty()
            || agent.role.eq_ignore_ascii_case(specialty)
            || agent
                .specialties
                .iter()
                .any(|s| s.eq_ignore_ascii_case(specialty))
        {
            return Ok(false);
        }
        agent.specialties.push(specialty.to_string());
        Ok(true)
    }

    /// Release every busy agent, e.g. after a cancelled round.
    pub fn release_all(&mut self) -> Vec<String> {
        let mut released = Vec::new();
        for agent in &mut self.agents {
            if agent.current_task.take().is_some() {
                released.push(agent.id.clone());
            }
        }
        released
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: &str) -> SwarmResult<&mut Agent> {
        self.agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| SwarmError::UnknownAgent(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.iter().any(|a| a.id == id)
    }

    /// All agents in registration order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn available(&self) -> Vec<&Agent> {
        self.agents.iter().filter(|a| a.is_available()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
