//! Model-backed capabilities for the swarmer scheduler.
//!
//! Provides the [`TextGenerator`](swarmer_core::TextGenerator) and
//! [`PlanGenerator`](swarmer_core::PlanGenerator) implementations that talk
//! to LLM providers over HTTP.
//!
//! # Main types
//!
//! - [`LlmTextGenerator`]: Per-agent conversations over any configured provider.
//! - [`LlmPlanner`]: Goal decomposition into validated plan records.
//! - [`LlmClient`]: Provider-agnostic completion client.
//! - [`ModelConfig`]: Provider, model and credentials.
//! - [`RetryPolicy`]: Backoff for transient provider errors.

/// Provider-specific HTTP backends.
pub mod backends;
/// Model configuration.
pub mod config;
/// Bounded per-agent conversation history.
pub mod context;
/// Text generation as individual agents.
pub mod generator;
/// Provider dispatch.
pub mod llm;
/// Plan generation and parsing.
pub mod planner;
/// Retry with exponential backoff.
pub mod retry;

pub use backends::LlmBackend;
pub use config::{LlmProvider, ModelConfig};
pub use context::ContextWindow;
pub use generator::LlmTextGenerator;
pub use llm::LlmClient;
pub use planner::{parse_plan, LlmPlanner};
pub use retry::{RetryPolicy, RetryingBackend};
