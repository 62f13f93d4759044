//! In-memory storage backend.

use std::collections::BTreeMap;

use goaltrack_core::{GoalName, GoalSpec, ObservedEntry, ObservedLog};

use super::{Result, Storage};

/// Storage that keeps everything in process memory.
///
/// Nothing survives the process; used by tests and by callers that load
/// goals from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    goals: BTreeMap<GoalName, GoalSpec>,
    logs: BTreeMap<GoalName, ObservedLog>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a goal together with its existing history.
    pub fn with_goal(mut self, goal: GoalSpec, log: ObservedLog) -> Self {
        self.logs.insert(goal.shortname().clone(), log);
        self.goals.insert(goal.shortname().clone(), goal);
        self
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn save_goal(&mut self, goal: &GoalSpec) -> Result<()> {
        self.goals.insert(goal.shortname().clone(), goal.clone());
        Ok(())
    }

    async fn load_goal(&self, name: &GoalName) -> Result<Option<GoalSpec>> {
        Ok(self.goals.get(name).cloned())
    }

    async fn list_goals(&self) -> Result<Vec<GoalSpec>> {
        Ok(self.goals.values().cloned().collect())
    }

    async fn load_log(&self, name: &GoalName) -> Result<ObservedLog> {
        Ok(self.logs.get(name).cloned().unwrap_or_default())
    }

    async fn append_entry(&mut self, name: &GoalName, entry: &ObservedEntry) -> Result<()> {
        self.logs.entry(name.clone()).or_default().push(*entry);
        Ok(())
    }
}
