use crate::config::SchedulerConfig;
use crate::registry::AgentRegistry;
use serde::{Deserialize, Serialize};

/// What the pool sizer wants done this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolDecision {
    /// Add one agent.
    Grow,
    /// Remove this idle agent.
    Shrink(String),
    Hold,
}

/// What actually happened to the pool, as reported per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PoolAction {
    Grew { agent: String, role: String },
    Shrank { agent: String },
    /// Growth was wanted but the role call failed.
    GrowthSkipped { reason: String },
    Held,
}

/// Compares backlog depth to pool size. At most one action per round.
#[derive(Debug, Clone)]
pub struct PoolSizer {
    grow_factor: usize,
    shrink_divisor: usize,
    min_agents: usize,
    max_agents: usize,
}

impl Default for PoolSizer {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl PoolSizer {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            grow_factor: config.grow_factor,
            shrink_divisor: config.shrink_divisor.max(1),
            min_agents: config.min_agents.max(1),
            max_agents: config.max_agents,
        }
    }

    /// Grow when `backlog > grow_factor * agents`, shrink when
    /// `backlog < agents / shrink_divisor` (integer division).
    pub fn evaluate(&self, backlog_len: usize, registry: &AgentRegistry) -> PoolDecision {
        let agents = registry.len();
        if backlog_len > self.grow_factor.saturating_mul(agents) {
            if agents < self.max_agents {
                return PoolDecision::Grow;
            }
            tracing::debug!(agents, max = self.max_agents, "Pool at capacity");
            return PoolDecision::Hold;
        }
        if backlog_len < agents / self.shrink_divisor && agents > self.min_agents {
            let idle = registry.available();
            if let Some(victim) = registry.least_loaded(&idle) {
                return PoolDecision::Shrink(victim.id.clone());
            }
        }
        PoolDecision::Hold
    }
}

/// First free `Agent_<n>` name with `n` starting at pool size + 1.
pub fn next_agent_name(registry: &AgentRegistry) -> String {
    let mut n = registry.len() + 1;
    loop {
        let name = format!("Agent_{n}");
        if !registry.contains(&name) {
            return name;
        }
        n += 1;
    }
}

/// Strip a role reply down to its first non-empty line.
pub fn parse_role(reply: &str) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;
    let role = line
        .trim_start_matches(|c: char| c == '-' || c == '*' || c == '#')
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
        .trim();
    (!role.is_empty()).then(|| role.to_string())
}
