//! Built-in capability implementations that need no external service.
//!
//! # Main types
//!
//! - [`LocalFileStore`]: `FileStore` writing task artifacts into one directory.

/// Directory-backed artifact storage.
pub mod file_store;

pub use file_store::{validate_name, LocalFileStore, MAX_ARTIFACT_SIZE};
