//! Dependency-aware round scheduler for a pool of agents.
//!
//! Each round recomputes task priorities, matches ready tasks to available
//! agents (forming collaboration groups where a task asks for one),
//! dispatches the work concurrently through a [`swarmer_core::TextGenerator`],
//! then reconciles results and resizes the pool.
//!
//! # Main types
//!
//! - [`Scheduler`]: Owns the backlog and pool and drives rounds.
//! - [`TaskStore`]: Backlog, completed and failed logs with admission checks.
//! - [`AgentRegistry`]: Agents, availability and workload history.
//! - [`Matcher`]: Single-pass task-to-agent assignment.
//! - [`PoolSizer`]: Grow/shrink decisions from backlog depth.
//! - [`SchedulerConfig`]: Tunables loaded from the `[scheduler]` table.

/// Scheduler configuration.
pub mod config;
/// Round orchestration.
pub mod engine;
/// Specialization evolution.
pub mod evolution;
/// Task-to-agent matching.
pub mod matcher;
/// Adaptive pool sizing.
pub mod pool;
/// Effective priority computation.
pub mod priority;
/// Prompt text for generation calls.
pub mod prompts;
/// Agent registry.
pub mod registry;
/// Backlog and completion logs.
pub mod task_store;
/// Task and agent state.
pub mod types;

pub use config::SchedulerConfig;
pub use engine::{DispatchFailure, InitSummary, RoundPhase, RoundReport, Scheduler};
pub use evolution::SpecialtyGain;
pub use matcher::{Assignment, DeferReason, Deferral, MatchOutcome, Matcher};
pub use pool::{PoolAction, PoolDecision, PoolSizer};
pub use priority::{effective_priority, PriorityEngine, PriorityWeights};
pub use registry::AgentRegistry;
pub use task_store::{FailureOutcome, TaskStore};
pub use types::{capability_matches, Agent, CollaborationGroup, Task, TaskState};
