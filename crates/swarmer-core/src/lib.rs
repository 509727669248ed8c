//! Core types and error definitions for the swarmer workspace.
//!
//! This crate provides the foundational types shared across all swarmer crates:
//! the error taxonomy, the structured plan records that cross the schema
//! boundary, and the capability traits the scheduler calls out to.
//!
//! # Main types
//!
//! - [`SwarmError`]: Unified error enum for all swarmer subsystems.
//! - [`AdmissionError`]: Why a task was rejected before entering the backlog.
//! - [`TaskRecord`] / [`AgentRecord`] / [`Plan`]: Structured plan records.
//! - [`TextGenerator`], [`PlanGenerator`], [`KnowledgeStore`], [`FileStore`]: External capabilities.

/// External capability interfaces.
pub mod capability;
/// Error types.
pub mod error;
/// Conversation messages.
pub mod message;
/// Structured task and agent records.
pub mod record;

pub use capability::{AgentProfile, FileStore, KnowledgeStore, PlanGenerator, TextGenerator};
pub use error::{AdmissionError, DependencyFault, SwarmError, SwarmResult};
pub use message::{Message, Role};
pub use record::{AgentRecord, Plan, TaskRecord};
