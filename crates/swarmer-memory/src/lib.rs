//! Keyword-indexed knowledge store for the swarm's shared side channel.
//!
//! Agents store short notes (new tasks, shared specialties) and retrieve the
//! ones most relevant to the task they are about to work on.
//!
//! # Main types
//!
//! - [`KeywordIndex`]: BM25 inverted index over stored notes.
//! - [`InMemoryKnowledgeStore`]: Bounded `KnowledgeStore` backed by the index.
//! - [`KnowledgeEntry`]: A stored note.

/// BM25 keyword index.
pub mod index;
/// `KnowledgeStore` implementation.
pub mod store;

pub use index::KeywordIndex;
pub use store::{InMemoryKnowledgeStore, KnowledgeEntry, DEFAULT_CAPACITY, DEFAULT_TOP_K};
