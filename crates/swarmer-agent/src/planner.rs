use crate::config::ModelConfig;
use crate::llm::LlmClient;
use async_trait::async_trait;
use std::time::Duration;
use swarmer_core::{AdmissionError, Message, Plan, PlanGenerator, SwarmError, SwarmResult};
use tracing::{info, warn};

const PLANNER_SYSTEM_PROMPT: &str =
    "You are a project planner. You answer with a single JSON object and nothing else.";
const PLANNER_IDENTITY: &str = "planner";

/// `PlanGenerator` that asks the model for a JSON plan and validates it.
///
/// Malformed replies are retried up to `max_attempts` times; the last schema
/// failure is surfaced as [`AdmissionError::MalformedRecord`].
pub struct LlmPlanner {
    client: LlmClient,
    max_attempts: u32,
    retry_delay: Duration,
}

impl LlmPlanner {
    /// Planner for the given model, three attempts one second apart.
    pub fn new(config: ModelConfig) -> Self {
        Self::from_client(LlmClient::new(config))
    }

    /// Planner over a pre-built client.
    pub fn from_client(client: LlmClient) -> Self {
        Self {
            client,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Number of attempts before giving up (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

/// Instructions for decomposing `goal` into tasks and agents.
pub fn plan_prompt(goal: &str, overview: &str) -> String {
    format!(
        r#"Project overview: {overview}

Goal: {goal}

Break the goal down into 3-5 tasks and propose 2-3 agents to carry them out.
Respond with JSON in exactly this shape:
{{
  "tasks": [
    {{"id": "T1", "description": "...", "role": "...", "priority": 1, "dependencies": [], "collaborative": false}}
  ],
  "agents": [
    {{"name": "...", "role": "...", "specialties": ["..."]}}
  ]
}}
Priority 1 is the most urgent. Dependencies list the ids of tasks that must finish first.
Mark a task collaborative only if it needs several agents at once."#
    )
}

/// Extract and validate a plan from a model reply.
///
/// Tolerates prose or code fences around the JSON object.
pub fn parse_plan(text: &str) -> Result<Plan, AdmissionError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(AdmissionError::malformed("plan", "no JSON object in reply")),
    };
    let plan: Plan = serde_json::from_str(json)
        .map_err(|e| AdmissionError::malformed("plan", e.to_string()))?;
    if plan.tasks.is_empty() {
        return Err(AdmissionError::malformed("plan", "plan contains no tasks"));
    }
    for task in &plan.tasks {
        task.validate()?;
    }
    for agent in &plan.agents {
        agent.validate()?;
    }
    Ok(plan)
}

#[async_trait]
impl PlanGenerator for LlmPlanner {
    async fn generate_plan(&self, goal: &str, overview: &str) -> SwarmResult<Plan> {
        let messages = [Message::user(plan_prompt(goal, overview), PLANNER_IDENTITY)];
        let mut last_error = SwarmError::Generation("planner made no attempt".into());

        for attempt in 1..=self.max_attempts {
            let result = match self
                .client
                .complete(Some(PLANNER_SYSTEM_PROMPT), &messages)
                .await
            {
                Ok(reply) => parse_plan(&reply).map_err(SwarmError::from),
                Err(e) => Err(e),
            };
            match result {
                Ok(plan) => {
                    info!(
                        attempt,
                        tasks = plan.tasks.len(),
                        agents = plan.agents.len(),
                        "Plan generated"
                    );
                    return Ok(plan);
                }
                Err(e) => {
                    warn!(attempt, max = self.max_attempts, error = %e, "Plan attempt failed");
                    last_error = e;
                }
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(last_error)
    }
}
