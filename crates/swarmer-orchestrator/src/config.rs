use crate::priority::PriorityWeights;
use serde::{Deserialize, Serialize};
use swarmer_core::{SwarmError, SwarmResult};

/// Tunables for the round scheduler, loaded from the `[scheduler]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Dispatch failures before a task becomes terminally `Failed`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_wait_bonus")]
    pub wait_bonus: f64,
    #[serde(default = "default_dependency_penalty")]
    pub dependency_penalty: f64,
    /// Agents per collaboration group.
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    /// Grow when `backlog > grow_factor * agents`.
    #[serde(default = "default_grow_factor")]
    pub grow_factor: usize,
    /// Shrink when `backlog < agents / shrink_divisor`.
    #[serde(default = "default_shrink_divisor")]
    pub shrink_divisor: usize,
    #[serde(default = "default_min_agents")]
    pub min_agents: usize,
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Per-call limit on external generation during dispatch.
    #[serde(default)]
    pub dispatch_timeout_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub evolve_specialties: bool,
    #[serde(default = "default_true")]
    pub share_knowledge: bool,
    #[serde(default = "default_true")]
    pub persist_outputs: bool,
    /// Register a coordinator agent before planning.
    #[serde(default = "default_true")]
    pub seed_coordinator: bool,
}

fn default_max_retries() -> u32 {
    3
}
fn default_wait_bonus() -> f64 {
    0.1
}
fn default_dependency_penalty() -> f64 {
    0.05
}
fn default_group_size() -> usize {
    2
}
fn default_grow_factor() -> usize {
    2
}
fn default_shrink_divisor() -> usize {
    2
}
fn default_min_agents() -> usize {
    1
}
fn default_max_agents() -> usize {
    16
}
fn default_max_rounds() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            wait_bonus: default_wait_bonus(),
            dependency_penalty: default_dependency_penalty(),
            group_size: default_group_size(),
            grow_factor: default_grow_factor(),
            shrink_divisor: default_shrink_divisor(),
            min_agents: default_min_agents(),
            max_agents: default_max_agents(),
            max_rounds: default_max_rounds(),
            dispatch_timeout_secs: None,
            evolve_specialties: true,
            share_knowledge: true,
            persist_outputs: true,
            seed_coordinator: true,
        }
    }
}

impl SchedulerConfig {
    pub fn weights(&self) -> PriorityWeights {
        PriorityWeights {
            wait_bonus: self.wait_bonus,
            dependency_penalty: self.dependency_penalty,
        }
    }

    /// Reject settings the scheduler cannot honor.
    pub fn validate(&self) -> SwarmResult<()> {
        if self.max_retries == 0 {
            return Err(SwarmError::Config("max_retries must be >= 1".into()));
        }
        if self.group_size < 2 {
            return Err(SwarmError::Config("group_size must be >= 2".into()));
        }
        if !self.wait_bonus.is_finite() || !self.dependency_penalty.is_finite() {
            return Err(SwarmError::Config("priority weights must be finite".into()));
        }
        if self.wait_bonus < 0.0 {
            return Err(SwarmError::Config("wait_bonus must be >= 0".into()));
        }
        if self.grow_factor == 0 || self.shrink_divisor == 0 {
            return Err(SwarmError::Config(
                "grow_factor and shrink_divisor must be >= 1".into(),
            ));
        }
        if self.min_agents == 0 {
            return Err(SwarmError::Config("min_agents must be >= 1".into()));
        }
        if self.max_agents < self.min_agents {
            return Err(SwarmError::Config(format!(
                "max_agents ({}) is below min_agents ({})",
                self.max_agents, self.min_agents
            )));
        }
        if self.dispatch_timeout_secs == Some(0) {
            return Err(SwarmError::Config("dispatch_timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}
