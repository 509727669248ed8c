use crate::config::SchedulerConfig;
use crate::evolution::{evolve_specialties, SpecialtyGain};
use crate::matcher::{Assignment, Deferral, Matcher};
use crate::pool::{next_agent_name, parse_role, PoolAction, PoolDecision, PoolSizer};
use crate::priority::PriorityEngine;
use crate::prompts;
use crate::registry::AgentRegistry;
use crate::task_store::TaskStore;
use crate::types::Agent;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use swarmer_core::{
    AgentProfile, AgentRecord, FileStore, KnowledgeStore, PlanGenerator, SwarmError, SwarmResult,
    TaskRecord, TextGenerator,
};
use tracing::{error, info, warn};

/// Where the round state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Idle,
    Prioritizing,
    Matching,
    Dispatching,
    Reconciling,
    /// The backlog was empty at round start.
    Done,
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundPhase::Idle => write!(f, "idle"),
            RoundPhase::Prioritizing => write!(f, "prioritizing"),
            RoundPhase::Matching => write!(f, "matching"),
            RoundPhase::Dispatching => write!(f, "dispatching"),
            RoundPhase::Reconciling => write!(f, "reconciling"),
            RoundPhase::Done => write!(f, "done"),
        }
    }
}

/// A dispatch that did not produce output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub task_id: String,
    pub agents: Vec<String>,
    /// Failures recorded for the task so far, including this one.
    pub attempt: u32,
    pub message: String,
    /// The task reached the retry ceiling and is now `Failed`.
    pub terminal: bool,
}

/// Summary of one scheduling round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    pub phase_reached: RoundPhase,
    pub assigned: Vec<Assignment>,
    pub deferred: Vec<Deferral>,
    /// Ids of tasks completed this round.
    pub completed: Vec<String>,
    pub failures: Vec<DispatchFailure>,
    /// Ids of tasks that became terminally `Failed` this round.
    pub terminal_failures: Vec<String>,
    pub specialties_gained: Vec<SpecialtyGain>,
    pub pool_action: PoolAction,
    pub backlog_remaining: usize,
    /// No work remains.
    pub done: bool,
}

impl RoundReport {
    fn empty(round: u32, phase_reached: RoundPhase) -> Self {
        Self {
            round,
            phase_reached,
            assigned: Vec::new(),
            deferred: Vec::new(),
            completed: Vec::new(),
            failures: Vec::new(),
            terminal_failures: Vec::new(),
            specialties_gained: Vec::new(),
            pool_action: PoolAction::Held,
            backlog_remaining: 0,
            done: false,
        }
    }
}

/// Result of swarm initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitSummary {
    pub coordinator_seeded: bool,
    /// Agents registered from the plan, in registration order.
    pub agents: Vec<String>,
    pub tasks_admitted: usize,
}

/// The scheduler aggregate: backlog, agent pool and the capabilities each
/// round calls out to.
///
/// Rounds are strictly serialized through `&mut self`; only the dispatch
/// phase runs concurrently, and it touches neither the store nor the
/// registry until every call has resolved.
pub struct Scheduler {
    config: SchedulerConfig,
    store: TaskStore,
    registry: AgentRegistry,
    priority: PriorityEngine,
    matcher: Matcher,
    sizer: PoolSizer,
    generator: Arc<dyn TextGenerator>,
    knowledge: Option<Arc<dyn KnowledgeStore>>,
    files: Option<Arc<dyn FileStore>>,
    overview: String,
    phase: RoundPhase,
    round: u32,
}

impl Scheduler {
    /// Create a scheduler with an empty backlog and pool.
    pub fn new(config: SchedulerConfig, generator: Arc<dyn TextGenerator>) -> SwarmResult<Self> {
        config.validate()?;
        Ok(Self {
            priority: PriorityEngine::new(config.weights()),
            matcher: Matcher::new(config.group_size),
            sizer: PoolSizer::from_config(&config),
            config,
            store: TaskStore::new(),
            registry: AgentRegistry::new(),
            generator,
            knowledge: None,
            files: None,
            overview: String::new(),
            phase: RoundPhase::Idle,
            round: 0,
        })
    }

    /// Attach a knowledge store for the side channel.
    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Attach a file store for task outputs.
    pub fn with_files(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = Some(files);
        self
    }

    /// Set the project overview given to agents at registration.
    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = overview.into();
        self
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Rounds started so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Seed the coordinator, request a plan for `goal`, register its agents
    /// and admit its tasks.
    ///
    /// The plan is checked in full before anything is applied: duplicate
    /// agents or an invalid task graph leave the scheduler unchanged.
    pub async fn initialize(
        &mut self,
        planner: &dyn PlanGenerator,
        goal: &str,
        overview: &str,
    ) -> SwarmResult<InitSummary> {
        self.overview = overview.to_string();

        let mut coordinator_seeded = false;
        if self.config.seed_coordinator && !self.registry.contains(prompts::COORDINATOR_NAME) {
            self.register_agent(AgentRecord::new(
                prompts::COORDINATOR_NAME,
                prompts::COORDINATOR_ROLE,
                prompts::COORDINATOR_SPECIALTIES.iter().copied(),
            ))
            .await?;
            coordinator_seeded = true;
        }

        info!(goal = %goal, "Requesting plan");
        let plan = planner.generate_plan(goal, overview).await?;

        let mut seen: Vec<String> = Vec::with_capacity(plan.agents.len());
        for record in &plan.agents {
            record.validate()?;
            let name = record.name.trim().to_string();
            if self.registry.contains(&name) || seen.contains(&name) {
                return Err(SwarmError::DuplicateAgent(name));
            }
            seen.push(name);
        }

        let descriptions: Vec<String> = plan.tasks.iter().map(|t| t.description.clone()).collect();
        let tasks_admitted = self.store.admit_batch(plan.tasks)?;
        for description in &descriptions {
            self.share(&prompts::new_task_note(description)).await;
        }

        for record in plan.agents {
            self.register_agent(record).await?;
        }

        info!(
            agents = self.registry.len(),
            tasks = tasks_admitted,
            "Swarm initialized"
        );
        Ok(InitSummary {
            coordinator_seeded,
            agents: seen,
            tasks_admitted,
        })
    }

    /// Admit one task into the backlog.
    pub async fn add_task(&mut self, record: TaskRecord) -> SwarmResult<()> {
        let note = prompts::new_task_note(&record.description);
        self.store.admit(record)?;
        self.share(&note).await;
        Ok(())
    }

    /// Validate and register an agent, then prime the generator with it.
    pub async fn register_agent(&mut self, record: AgentRecord) -> SwarmResult<()> {
        record.validate()?;
        let agent = Agent::from_record(record);
        let profile = AgentProfile {
            id: agent.id.clone(),
            role: agent.role.clone(),
            specialties: agent.specialties.clone(),
            overview: self.overview.clone(),
        };
        self.registry.register(agent)?;
        if let Err(e) = self.generator.register_agent(&profile).await {
            warn!(agent = %profile.id, error = %e, "Agent context setup failed");
        }
        Ok(())
    }

    /// Run rounds until the backlog is empty or `max_rounds` have run.
    pub async fn run(&mut self, max_rounds: u32) -> SwarmResult<Vec<RoundReport>> {
        let mut reports = Vec::new();
        for _ in 0..max_rounds {
            let report = self.run_round().await?;
            let done = report.done;
            reports.push(report);
            if done {
                return Ok(reports);
            }
        }
        if !self.store.is_empty() {
            warn!(
                max_rounds,
                remaining = self.store.backlog_len(),
                "Round limit reached with work remaining"
            );
        }
        Ok(reports)
    }

    /// Drive one round: prioritize, match, dispatch, reconcile.
    ///
    /// Dispatch failures are reported, never returned. An `Err` here means
    /// the scheduler's own bookkeeping was inconsistent.
    ///
    /// If the previous round was dropped before reaching `Idle`, its
    /// in-flight tasks are reset first so they are matched again.
    pub async fn run_round(&mut self) -> SwarmResult<RoundReport> {
        if !matches!(self.phase, RoundPhase::Idle | RoundPhase::Done) {
            warn!(phase = %self.phase, "Previous round did not finish, recovering");
            self.recover_in_flight();
        }
        self.round += 1;
        let round = self.round;

        if self.store.is_empty() {
            self.phase = RoundPhase::Done;
            info!(round, "Backlog empty");
            let mut report = RoundReport::empty(round, RoundPhase::Done);
            report.done = true;
            return Ok(report);
        }

        self.enter(RoundPhase::Prioritizing);
        self.priority.reprioritize(&mut self.store);

        self.enter(RoundPhase::Matching);
        let outcome = self.matcher.assign(&mut self.store, &mut self.registry)?;

        self.enter(RoundPhase::Dispatching);
        let results = self.dispatch(&outcome.assignments).await;

        self.enter(RoundPhase::Reconciling);
        let mut report = RoundReport::empty(round, RoundPhase::Reconciling);
        for (assignment, result) in outcome.assignments.iter().zip(results) {
            match result {
                Ok(output) => self.reconcile_success(assignment, output, &mut report).await?,
                Err(e) => self.reconcile_failure(assignment, e, &mut report)?,
            }
        }

        let contributors = self.registry.take_newly_completed();
        if self.config.evolve_specialties && !contributors.is_empty() {
            report.specialties_gained =
                evolve_specialties(self.generator.as_ref(), &mut self.registry, &contributors)
                    .await;
        }
        if self.config.share_knowledge {
            for id in &contributors {
                if let Some(agent) = self.registry.get(id) {
                    let note = prompts::shareable_knowledge(&agent.id, &agent.specialties);
                    self.share(&note).await;
                }
            }
        }

        report.pool_action = self.resize().await;
        self.priority.age(&mut self.store);

        report.assigned = outcome.assignments;
        report.deferred = outcome.deferred;
        report.backlog_remaining = self.store.backlog_len();
        report.done = self.store.is_empty();
        self.phase = RoundPhase::Idle;
        info!(
            round,
            completed = report.completed.len(),
            failed = report.failures.len(),
            remaining = report.backlog_remaining,
            "Round complete"
        );
        Ok(report)
    }

    /// Undo the effects of a round abandoned mid-dispatch: Assigned tasks
    /// return to Pending and their agents are freed. Returns the reset ids.
    pub fn recover_in_flight(&mut self) -> Vec<String> {
        let tasks = self.store.reset_in_flight();
        let agents = self.registry.release_all();
        if !tasks.is_empty() {
            warn!(tasks = ?tasks, agents = ?agents, "Recovered in-flight tasks");
        }
        self.phase = RoundPhase::Idle;
        tasks
    }

    fn enter(&mut self, phase: RoundPhase) {
        self.phase = phase;
        info!(round = self.round, phase = %phase, "Entering phase");
    }

    /// Fan out one future per assignment and wait for all of them.
    async fn dispatch(&self, assignments: &[Assignment]) -> Vec<SwarmResult<String>> {
        let jobs = assignments.iter().map(|assignment| {
            let members: Vec<(String, String)> = assignment
                .agents
                .iter()
                .map(|id| {
                    let role = self
                        .registry
                        .get(id)
                        .map(|a| a.role.clone())
                        .unwrap_or_else(|| assignment.role.clone());
                    (id.clone(), role)
                })
                .collect();
            self.run_assignment(assignment, members)
        });
        join_all(jobs).await
    }

    async fn run_assignment(
        &self,
        assignment: &Assignment,
        members: Vec<(String, String)>,
    ) -> SwarmResult<String> {
        let context = self.context_for(&assignment.description).await;
        let context = context.as_deref();

        if !assignment.collaborative {
            let (agent, role) = members
                .first()
                .ok_or_else(|| SwarmError::Generation("assignment has no agent".into()))?;
            let prompt = prompts::task_prompt(role, &assignment.description, context);
            return self.generate(agent, &prompt).await;
        }

        let calls = members.iter().map(|(agent, role)| {
            let prompt = prompts::collaborative_prompt(role, &assignment.description, context);
            async move {
                self.generate(agent, &prompt)
                    .await
                    .map(|out| format!("{agent}: {}", out.trim()))
            }
        });
        let parts = join_all(calls)
            .await
            .into_iter()
            .collect::<SwarmResult<Vec<String>>>()?;
        Ok(parts.join("\n"))
    }

    /// One generation call, bounded by the configured timeout.
    async fn generate(&self, agent: &str, prompt: &str) -> SwarmResult<String> {
        match self.config.dispatch_timeout_secs {
            Some(secs) => {
                tokio::time::timeout(Duration::from_secs(secs), self.generator.generate(agent, prompt))
                    .await
                    .map_err(|_| SwarmError::Generation(format!("timed out after {secs}s")))?
            }
            None => self.generator.generate(agent, prompt).await,
        }
    }

    /// Retrieval context for a task description, if any.
    async fn context_for(&self, query: &str) -> Option<String> {
        if !self.config.share_knowledge {
            return None;
        }
        let knowledge = self.knowledge.as_ref()?;
        match knowledge.retrieve(query).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Knowledge retrieval failed");
                None
            }
        }
    }

    async fn share(&self, text: &str) {
        if !self.config.share_knowledge {
            return;
        }
        if let Some(knowledge) = &self.knowledge {
            if let Err(e) = knowledge.store(text).await {
                warn!(error = %e, "Knowledge store failed");
            }
        }
    }

    async fn reconcile_success(
        &mut self,
        assignment: &Assignment,
        output: String,
        report: &mut RoundReport,
    ) -> SwarmResult<()> {
        let task_id = assignment.task_id.as_str();
        if self.config.persist_outputs {
            if let Some(files) = &self.files {
                let name = format!("{task_id}.md");
                if let Err(e) = files.persist(&name, &output).await {
                    warn!(task_id = %task_id, error = %e, "Failed to persist task output");
                }
            }
        }

        self.store.complete(task_id, Some(output))?;
        for agent in &assignment.agents {
            self.registry
                .record_completion(agent, &assignment.description)?;
        }
        info!(task_id = %task_id, agents = ?assignment.agents, "Task completed");
        report.completed.push(task_id.to_string());
        Ok(())
    }

    fn reconcile_failure(
        &mut self,
        assignment: &Assignment,
        e: SwarmError,
        report: &mut RoundReport,
    ) -> SwarmResult<()> {
        let task_id = assignment.task_id.as_str();
        for agent in &assignment.agents {
            self.registry.release(agent)?;
        }
        let message = e.to_string();
        let outcome = self
            .store
            .record_failure(task_id, &message, self.config.max_retries)?;
        if outcome.terminal {
            error!(
                task_id = %task_id,
                attempts = outcome.attempts,
                error = %message,
                "Task failed permanently"
            );
            report.terminal_failures.push(task_id.to_string());
        } else {
            warn!(
                task_id = %task_id,
                attempt = outcome.attempts,
                error = %message,
                "Dispatch failed, task returned to backlog"
            );
        }
        report.failures.push(DispatchFailure {
            task_id: task_id.to_string(),
            agents: assignment.agents.clone(),
            attempt: outcome.attempts,
            message,
            terminal: outcome.terminal,
        });
        Ok(())
    }

    /// Apply the pool sizer's decision for this round.
    async fn resize(&mut self) -> PoolAction {
        match self.sizer.evaluate(self.store.backlog_len(), &self.registry) {
            PoolDecision::Hold => PoolAction::Held,
            PoolDecision::Shrink(id) => match self.registry.deregister(&id) {
                Ok(agent) => {
                    info!(agent = %agent.id, "Agent removed due to low workload");
                    PoolAction::Shrank { agent: agent.id }
                }
                Err(e) => {
                    warn!(agent = %id, error = %e, "Shrink skipped");
                    PoolAction::Held
                }
            },
            PoolDecision::Grow => self.grow().await,
        }
    }

    async fn grow(&mut self) -> PoolAction {
        let current: Vec<String> = self.registry.agents().iter().map(|a| a.role.clone()).collect();
        let needed: Vec<String> = self.store.backlog().iter().map(|t| t.role.clone()).collect();
        let prompt = prompts::needed_role_prompt(&current, &needed);

        let role = match self.generate(prompts::SWARM_IDENTITY, &prompt).await {
            Ok(reply) => parse_role(&reply),
            Err(e) => {
                warn!(error = %e, "Role determination failed, pool not grown");
                return PoolAction::GrowthSkipped {
                    reason: e.to_string(),
                };
            }
        };
        let Some(role) = role else {
            warn!("Role determination returned nothing, pool not grown");
            return PoolAction::GrowthSkipped {
                reason: "empty role".into(),
            };
        };

        let name = next_agent_name(&self.registry);
        match self
            .register_agent(AgentRecord::new(&name, &role, Vec::<String>::new()))
            .await
        {
            Ok(()) => {
                info!(agent = %name, role = %role, "Agent added due to high workload");
                PoolAction::Grew { agent: name, role }
            }
            Err(e) => {
                warn!(agent = %name, error = %e, "Growth skipped");
                PoolAction::GrowthSkipped {
                    reason: e.to_string(),
                }
            }
        }
    }
}
