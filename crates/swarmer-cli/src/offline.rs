//! Capabilities for `swarmer validate`, which never contacts a model.

use async_trait::async_trait;
use std::sync::Mutex;
use swarmer_core::{Plan, PlanGenerator, SwarmError, SwarmResult, TextGenerator};

/// Hands out one pre-parsed plan.
pub struct StaticPlanner {
    plan: Mutex<Option<Plan>>,
}

impl StaticPlanner {
    pub fn new(plan: Plan) -> Self {
        Self {
            plan: Mutex::new(Some(plan)),
        }
    }
}

#[async_trait]
impl PlanGenerator for StaticPlanner {
    async fn generate_plan(&self, _goal: &str, _overview: &str) -> SwarmResult<Plan> {
        self.plan
            .lock()
            .map_err(|_| SwarmError::Generation("plan lock poisoned".into()))?
            .take()
            .ok_or_else(|| SwarmError::Generation("plan already consumed".into()))
    }
}

/// Refuses every generation request.
pub struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
    async fn generate(&self, agent_id: &str, _prompt: &str) -> SwarmResult<String> {
        Err(SwarmError::Generation(format!(
            "{agent_id}: text generation is unavailable offline"
        )))
    }
}
