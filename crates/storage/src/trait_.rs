//! Storage trait abstraction.

use std::path::PathBuf;

use async_trait::async_trait;
use goaltrack_core::{GoalName, GoalSpec, ObservedEntry, ObservedLog};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored log line could not be read back
    #[error("{}:{line}: {source}", .path.display())]
    Corrupt {
        /// File holding the bad line
        path: PathBuf,
        /// One-based line number
        line: usize,
        /// Parse failure
        source: serde_json::Error,
    },
}

/// Storage abstraction for goal definitions and their progress logs.
///
/// A goal's log is append-only: backends never rewrite or drop entries.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Goal definitions ===

    /// Save a goal definition (create or replace).
    async fn save_goal(&mut self, goal: &GoalSpec) -> Result<()>;

    /// Load a goal definition by name.
    async fn load_goal(&self, name: &GoalName) -> Result<Option<GoalSpec>>;

    /// List every goal definition, ordered by name.
    async fn list_goals(&self) -> Result<Vec<GoalSpec>>;

    // === Progress logs ===

    /// Load the whole log of a goal. A goal with no history has an empty log.
    async fn load_log(&self, name: &GoalName) -> Result<ObservedLog>;

    /// Append one entry to a goal's log and persist it.
    async fn append_entry(&mut self, name: &GoalName, entry: &ObservedEntry) -> Result<()>;
}
