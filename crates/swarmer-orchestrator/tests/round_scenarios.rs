//! End-to-end round scenarios.
//!
//! Drives the scheduler through whole rounds with scripted generators and
//! in-memory side channels. Checks: dependency ordering, admission
//! rejection, wait-bonus tie breaking, collaboration groups, and the retry
//! ceiling.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use swarmer_core::{
    AdmissionError, AgentRecord, DependencyFault, FileStore, KnowledgeStore, Plan,
    PlanGenerator, SwarmError, SwarmResult, TaskRecord, TextGenerator,
};
use swarmer_orchestrator::*;

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

/// Succeeds with a fixed reply unless the prompt mentions a failing keyword.
#[derive(Default)]
struct ScriptedGenerator {
    fail_on: Option<&'static str>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    fn failing_on(keyword: &'static str) -> Self {
        Self {
            fail_on: Some(keyword),
            ..Self::default()
        }
    }

    fn prompts_for(&self, agent: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == agent)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, agent_id: &str, prompt: &str) -> SwarmResult<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((agent_id.to_string(), prompt.to_string()));
        if let Some(keyword) = self.fail_on {
            if prompt.contains(keyword) {
                return Err(SwarmError::Generation(format!("refused: {keyword}")));
            }
        }
        Ok(format!("{agent_id} finished"))
    }
}

#[derive(Default)]
struct RecordingKnowledge {
    stored: Mutex<Vec<String>>,
}

#[async_trait]
impl KnowledgeStore for RecordingKnowledge {
    async fn store(&self, text: &str) -> SwarmResult<()> {
        self.stored.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn retrieve(&self, _query: &str) -> SwarmResult<String> {
        Ok(self.stored.lock().unwrap().join("\n"))
    }
}

#[derive(Default)]
struct RecordingFiles {
    written: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl FileStore for RecordingFiles {
    async fn persist(&self, name: &str, content: &str) -> SwarmResult<()> {
        self.written
            .lock()
            .unwrap()
            .push((name.to_string(), content.to_string()));
        Ok(())
    }

    async fn read(&self, name: &str) -> SwarmResult<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| SwarmError::Storage(format!("no such file: {name}")))
    }

    async fn list(&self) -> SwarmResult<Vec<String>> {
        Ok(self
            .written
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }
}

struct FixedPlan(Plan);

#[async_trait]
impl PlanGenerator for FixedPlan {
    async fn generate_plan(&self, _goal: &str, _overview: &str) -> SwarmResult<Plan> {
        Ok(self.0.clone())
    }
}

fn plain_config() -> SchedulerConfig {
    SchedulerConfig {
        evolve_specialties: false,
        share_knowledge: false,
        persist_outputs: false,
        seed_coordinator: false,
        ..SchedulerConfig::default()
    }
}

async fn scheduler_with(
    generator: Arc<ScriptedGenerator>,
    agents: &[(&str, &str)],
) -> Scheduler {
    let mut scheduler = Scheduler::new(plain_config(), generator).unwrap();
    for (name, role) in agents {
        scheduler
            .register_agent(AgentRecord::new(*name, *role, Vec::<String>::new()))
            .await
            .unwrap();
    }
    scheduler
}

fn assigned_ids(report: &RoundReport) -> Vec<&str> {
    report.assigned.iter().map(|a| a.task_id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_dependent_task_waits_for_its_prerequisite() {
    let mut scheduler = scheduler_with(Arc::default(), &[("dev1", "dev")]).await;
    scheduler
        .add_task(TaskRecord::new("T1", "Lay foundations", "dev", 1))
        .await
        .unwrap();
    scheduler
        .add_task(TaskRecord::new("T2", "Build walls", "dev", 1).with_dependencies(["T1"]))
        .await
        .unwrap();

    let first = scheduler.run_round().await.unwrap();
    assert_eq!(assigned_ids(&first), vec!["T1"]);
    assert_eq!(first.completed, vec!["T1".to_string()]);
    assert!(!first.done);

    let second = scheduler.run_round().await.unwrap();
    assert_eq!(assigned_ids(&second), vec!["T2"]);
    assert!(second.done);

    let third = scheduler.run_round().await.unwrap();
    assert_eq!(third.phase_reached, RoundPhase::Done);
    assert_eq!(scheduler.registry().get("dev1").unwrap().completed_count, 2);
}

#[tokio::test]
async fn test_unknown_dependency_rejected_at_admission() {
    let mut scheduler = scheduler_with(Arc::default(), &[("dev1", "dev")]).await;
    scheduler
        .add_task(TaskRecord::new("T1", "Existing", "dev", 1))
        .await
        .unwrap();

    let err = scheduler
        .add_task(TaskRecord::new("T2", "Orphan", "dev", 1).with_dependencies(["Tx"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SwarmError::Admission(AdmissionError::InvalidDependency {
            fault: DependencyFault::Unknown,
            ..
        })
    ));
    let backlog: Vec<&str> = scheduler
        .store()
        .backlog()
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(backlog, vec!["T1"]);
}

#[tokio::test]
async fn test_wait_bonus_breaks_equal_base_priority() {
    let mut scheduler = scheduler_with(Arc::default(), &[("dev1", "dev")]).await;
    for id in ["T1", "T2"] {
        scheduler
            .add_task(TaskRecord::new(id, format!("Job {id}"), "dev", 2))
            .await
            .unwrap();
    }

    let first = scheduler.run_round().await.unwrap();
    assert_eq!(assigned_ids(&first), vec!["T1"]);
    assert_eq!(first.deferred.len(), 1);
    assert_eq!(scheduler.store().get("T2").unwrap().rounds_waited, 1);

    // T3 arrives fresh; T2 has already waited a round.
    scheduler
        .add_task(TaskRecord::new("T3", "Job T3", "dev", 2))
        .await
        .unwrap();

    let second = scheduler.run_round().await.unwrap();
    assert_eq!(assigned_ids(&second), vec!["T3"]);
    let t2 = scheduler.store().get("T2").unwrap();
    assert!((t2.effective_priority - 2.1).abs() < 1e-9);

    let third = scheduler.run_round().await.unwrap();
    assert_eq!(assigned_ids(&third), vec!["T2"]);
    assert!(third.done);
}

#[tokio::test]
async fn test_equal_priority_batch_drains_in_admission_order() {
    let config = SchedulerConfig {
        max_agents: 1,
        ..plain_config()
    };
    let mut scheduler = Scheduler::new(config, Arc::new(ScriptedGenerator::default())).unwrap();
    scheduler
        .register_agent(AgentRecord::new("dev1", "dev", Vec::<String>::new()))
        .await
        .unwrap();
    let plan = Plan {
        tasks: ["T1", "T2", "T3"]
            .into_iter()
            .map(|id| TaskRecord::new(id, format!("Job {id}"), "dev", 2))
            .collect(),
        agents: Vec::new(),
    };
    let summary = scheduler
        .initialize(&FixedPlan(plan), "Ship it", "")
        .await
        .unwrap();
    assert_eq!(summary.tasks_admitted, 3);

    let mut order = Vec::new();
    for round in 1..=3 {
        let report = scheduler.run_round().await.unwrap();
        assert_eq!(report.assigned.len(), 1, "round {round}");
        order.extend(report.completed);
        if round == 1 {
            for id in ["T2", "T3"] {
                assert_eq!(scheduler.store().get(id).unwrap().rounds_waited, 1);
            }
        }
    }
    assert_eq!(order, vec!["T1", "T2", "T3"]);
    assert!(scheduler.store().is_empty());
    assert_eq!(scheduler.registry().len(), 1);
}

#[tokio::test]
async fn test_collaborative_task_waits_for_second_agent() {
    let generator = Arc::new(ScriptedGenerator::default());
    let mut scheduler = scheduler_with(generator.clone(), &[("a", "dev"), ("b", "dev")]).await;
    scheduler
        .add_task(TaskRecord::new("T0", "Solo warmup", "dev", 1))
        .await
        .unwrap();
    scheduler
        .add_task(TaskRecord::new("T1", "Pair on design", "dev", 2).collaborative())
        .await
        .unwrap();

    let first = scheduler.run_round().await.unwrap();
    assert_eq!(assigned_ids(&first), vec!["T0"]);
    assert_eq!(
        first.deferred,
        vec![Deferral {
            task_id: "T1".into(),
            reason: DeferReason::InsufficientCollaborators {
                available: 1,
                required: 2
            }
        }]
    );
    assert_eq!(scheduler.store().get("T1").unwrap().state, TaskState::Pending);

    let second = scheduler.run_round().await.unwrap();
    let assignment = &second.assigned[0];
    assert_eq!(assignment.task_id, "T1");
    // b has done less work, so it leads the group.
    assert_eq!(assignment.agents, vec!["b".to_string(), "a".to_string()]);
    assert_eq!(second.completed, vec!["T1".to_string()]);

    let output = scheduler.store().get("T1").unwrap().output.clone().unwrap();
    assert_eq!(output, "b: b finished\na: a finished");
    assert_eq!(generator.prompts_for("b").len(), 1);
    assert_eq!(generator.prompts_for("a").len(), 2);
}

#[tokio::test]
async fn test_repeated_dispatch_failure_becomes_terminal() {
    let generator = Arc::new(ScriptedGenerator::failing_on("flaky"));
    let mut scheduler = scheduler_with(generator, &[("dev1", "dev")]).await;
    scheduler
        .add_task(TaskRecord::new("T1", "Run the flaky job", "dev", 1))
        .await
        .unwrap();

    for attempt in 1..=2 {
        let report = scheduler.run_round().await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].attempt, attempt);
        assert!(!report.failures[0].terminal);
        assert!(report.terminal_failures.is_empty());
        assert!(scheduler.registry().get("dev1").unwrap().is_available());
    }

    let last = scheduler.run_round().await.unwrap();
    assert!(last.failures[0].terminal);
    assert_eq!(last.terminal_failures, vec!["T1".to_string()]);
    assert!(last.done);
    assert_eq!(scheduler.store().failed().len(), 1);

    let after = scheduler.run_round().await.unwrap();
    assert!(after.assigned.is_empty());
    assert_eq!(after.phase_reached, RoundPhase::Done);
}

#[tokio::test]
async fn test_failure_does_not_abort_sibling_dispatches() {
    let generator = Arc::new(ScriptedGenerator::failing_on("flaky"));
    let mut scheduler = scheduler_with(generator, &[("a", "dev"), ("b", "dev")]).await;
    scheduler
        .add_task(TaskRecord::new("T1", "flaky step", "dev", 1))
        .await
        .unwrap();
    scheduler
        .add_task(TaskRecord::new("T2", "steady step", "dev", 1))
        .await
        .unwrap();

    let report = scheduler.run_round().await.unwrap();
    assert_eq!(report.assigned.len(), 2);
    assert_eq!(report.completed, vec!["T2".to_string()]);
    assert_eq!(report.failures[0].task_id, "T1");
}

// ---------------------------------------------------------------------------
// Side channels
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_knowledge_and_outputs_flow_through_side_channels() {
    let generator = Arc::new(ScriptedGenerator::default());
    let knowledge = Arc::new(RecordingKnowledge::default());
    let files = Arc::new(RecordingFiles::default());
    let config = SchedulerConfig {
        share_knowledge: true,
        persist_outputs: true,
        ..plain_config()
    };
    let mut scheduler = Scheduler::new(config, generator.clone())
        .unwrap()
        .with_knowledge(knowledge.clone())
        .with_files(files.clone());
    scheduler
        .register_agent(AgentRecord::new("dev1", "dev", ["rust"]))
        .await
        .unwrap();
    scheduler
        .add_task(TaskRecord::new("T1", "Write the lexer", "dev", 1))
        .await
        .unwrap();

    let report = scheduler.run_round().await.unwrap();
    assert!(report.done);

    let prompt = generator.prompts_for("dev1").remove(0);
    assert!(prompt.contains("Relevant project knowledge"));
    assert!(prompt.contains("New task: Write the lexer"));

    let stored = knowledge.stored.lock().unwrap().clone();
    assert_eq!(
        stored,
        vec![
            "New task: Write the lexer".to_string(),
            "Shareable knowledge from dev1: rust".to_string(),
        ]
    );

    assert_eq!(files.list().await.unwrap(), vec!["T1.md".to_string()]);
    assert_eq!(files.read("T1.md").await.unwrap(), "dev1 finished");
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_completion_order_respects_dependencies() {
    let agents = [("a", "dev"), ("b", "dev"), ("c", "qa")];
    let mut scheduler = scheduler_with(Arc::default(), &agents).await;
    let tasks = vec![
        TaskRecord::new("T1", "Schema", "dev", 3),
        TaskRecord::new("T2", "Parser", "dev", 1),
        TaskRecord::new("T3", "Codegen", "dev", 2).with_dependencies(["T1", "T2"]),
        TaskRecord::new("T4", "Smoke test", "qa", 1).with_dependencies(["T2"]),
        TaskRecord::new("T5", "Release", "qa", 1).with_dependencies(["T3", "T4"]),
    ];
    for record in tasks {
        scheduler.add_task(record).await.unwrap();
    }
    assert_eq!(scheduler.store().backlog_len(), 5);

    let reports = scheduler.run(10).await.unwrap();
    assert!(reports.last().unwrap().done);

    let completed: Vec<&Task> = scheduler.store().completed().iter().collect();
    assert_eq!(completed.len(), 5);
    for (pos, task) in completed.iter().enumerate() {
        for dep in &task.dependencies {
            let dep_pos = completed.iter().position(|t| &t.id == dep).unwrap();
            assert!(dep_pos < pos, "{} completed before its dependency {dep}", task.id);
        }
    }

    for report in &reports {
        let mut booked: Vec<&String> = report.assigned.iter().flat_map(|a| &a.agents).collect();
        let total = booked.len();
        booked.sort();
        booked.dedup();
        assert_eq!(booked.len(), total, "agent double-booked in round {}", report.round);
    }
}
