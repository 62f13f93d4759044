//! JSON file storage implementation.
//!
//! Goal definitions live in `goals/<name>.json`. Logs live in
//! `logs/<name>.jsonl`, one entry per line, so recording progress only ever
//! appends to the file.

use std::path::{Path, PathBuf};

use goaltrack_core::{GoalName, GoalSpec, ObservedEntry, ObservedLog};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::{Result, Storage, StorageError};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Open storage rooted at `root`, creating the `goals/` and `logs/`
    /// subdirectories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("goals")).await?;
        fs::create_dir_all(root.join("logs")).await?;

        Ok(Self { root })
    }

    /// Directory this storage writes to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn goal_path(&self, name: &GoalName) -> PathBuf {
        self.root.join("goals").join(format!("{}.json", name))
    }

    fn log_path(&self, name: &GoalName) -> PathBuf {
        self.root.join("logs").join(format!("{}.jsonl", name))
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_goal(&mut self, goal: &GoalSpec) -> Result<()> {
        let path = self.goal_path(goal.shortname());
        let json = serde_json::to_string_pretty(goal)?;
        fs::write(&path, json.as_bytes()).await?;
        debug!("Saved goal {} to {}", goal.shortname(), path.display());
        Ok(())
    }

    async fn load_goal(&self, name: &GoalName) -> Result<Option<GoalSpec>> {
        let path = self.goal_path(name);
        match read_json::<GoalSpec>(&path).await? {
            Some(goal) if goal.shortname() != name => {
                warn!("Ignoring {}: defines goal {}", path.display(), goal.shortname());
                Ok(None)
            }
            loaded => Ok(loaded),
        }
    }

    async fn list_goals(&self) -> Result<Vec<GoalSpec>> {
        let mut goals = Vec::new();
        for (path, goal) in list_dir::<GoalSpec>(&self.root.join("goals")).await? {
            let stem = path.file_stem().and_then(|s| s.to_str());
            if stem != Some(goal.shortname().as_str()) {
                warn!(
                    "Skipping {}: defines goal {} under another file name",
                    path.display(),
                    goal.shortname()
                );
                continue;
            }
            goals.push(goal);
        }
        goals.sort_by(|a, b| a.shortname().cmp(b.shortname()));
        Ok(goals)
    }

    async fn load_log(&self, name: &GoalName) -> Result<ObservedLog> {
        let path = self.log_path(name);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No log for {} at {}, starting empty", name, path.display());
                return Ok(ObservedLog::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut log = ObservedLog::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: ObservedEntry =
                serde_json::from_str(line).map_err(|source| StorageError::Corrupt {
                    path: path.clone(),
                    line: idx + 1,
                    source,
                })?;
            log.push(entry);
        }
        Ok(log)
    }

    async fn append_entry(&mut self, name: &GoalName, entry: &ObservedEntry) -> Result<()> {
        let path = self.log_path(name);
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<(PathBuf, T)>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path).await {
            Ok(Some(item)) => items.push((path, item)),
            Ok(None) => {}
            Err(e) => warn!("Skipping unreadable definition {}: {}", path.display(), e),
        }
    }
    Ok(items)
}
