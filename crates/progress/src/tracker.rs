//! Goal tracking service - the review engine and fitter over stored goals.

use goaltrack_core::{GoalName, GoalSpec, ObservedEntry, ObservedLog, Time, TrackError};
use goaltrack_storage::{Storage, StorageError};
use tracing::{debug, info, warn};

use crate::fit::CurveFitter;
use crate::review::{ReviewConfig, ReviewEngine, StatusReport};
use crate::trajectory::Polynomial;

/// Error type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur while tracking a goal.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The goal's own computation failed
    #[error(transparent)]
    Goal(#[from] TrackError),

    /// Loading or saving failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// No goal with this name
    #[error("unknown goal: {0}")]
    UnknownGoal(GoalName),

    /// A goal with this name already exists
    #[error("goal already exists: {0}")]
    DuplicateGoal(GoalName),
}

/// Review outcome of one goal in a batch.
#[derive(Debug)]
pub struct GoalReview {
    /// Goal that was reviewed
    pub goal: GoalSpec,
    /// Its report, or why there is none
    pub outcome: Result<StatusReport>,
}

/// Tracks goals kept in a [`Storage`] backend.
pub struct GoalTracker<S: Storage> {
    storage: S,
    engine: ReviewEngine,
    fitter: CurveFitter,
}

impl<S: Storage> GoalTracker<S> {
    /// Create a tracker over a storage backend.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            engine: ReviewEngine::default(),
            fitter: CurveFitter::new(),
        }
    }

    /// Set the review configuration.
    pub fn with_config(mut self, config: ReviewConfig) -> Self {
        self.engine = self.engine.with_config(config);
        self
    }

    /// Review engine in use.
    pub fn engine(&self) -> &ReviewEngine {
        &self.engine
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Register a new goal. Names are unique.
    pub async fn create_goal(&mut self, goal: GoalSpec) -> Result<()> {
        if self.storage.load_goal(goal.shortname()).await?.is_some() {
            return Err(TrackerError::DuplicateGoal(goal.shortname().clone()));
        }
        self.storage.save_goal(&goal).await?;
        info!("Created goal {}", goal.shortname());
        Ok(())
    }

    /// Every goal, ordered by name.
    pub async fn goals(&self) -> Result<Vec<GoalSpec>> {
        Ok(self.storage.list_goals().await?)
    }

    /// Load one goal.
    pub async fn goal(&self, name: &GoalName) -> Result<GoalSpec> {
        self.storage
            .load_goal(name)
            .await?
            .ok_or_else(|| TrackerError::UnknownGoal(name.clone()))
    }

    /// Load a goal's log.
    pub async fn log(&self, name: &GoalName) -> Result<ObservedLog> {
        self.goal(name).await?;
        Ok(self.storage.load_log(name).await?)
    }

    /// Log progress for a goal and persist it. Returns the new cumulative
    /// total.
    pub async fn record(&mut self, name: &GoalName, timestamp: Time, delta: f64) -> Result<f64> {
        let mut log = self.log(name).await?;
        let entry = *log.append(timestamp, delta);
        self.storage.append_entry(name, &entry).await?;

        let total = log.cumulative_progress();
        info!("Recorded {} for {} (total {})", delta, name, total);
        Ok(total)
    }

    /// Most recent entry of a goal; [`TrackError::EmptyLog`] if none.
    pub async fn last_entry(&self, name: &GoalName) -> Result<ObservedEntry> {
        let log = self.log(name).await?;
        Ok(*log.last_entry_required()?)
    }

    /// Review one goal.
    pub async fn review(&self, name: &GoalName, as_of: Time) -> Result<StatusReport> {
        let goal = self.goal(name).await?;
        self.review_goal(&goal, as_of).await
    }

    /// Review every goal. A goal that fails is reported and skipped; only a
    /// failure to list the goals aborts the batch.
    pub async fn review_all(&self, as_of: Time) -> Result<Vec<GoalReview>> {
        let goals = self.goals().await?;
        let mut reviews = Vec::with_capacity(goals.len());

        for goal in goals {
            let outcome = self.review_goal(&goal, as_of).await;
            if let Err(e) = &outcome {
                warn!("Review of {} failed: {}", goal.shortname(), e);
            }
            reviews.push(GoalReview { goal, outcome });
        }

        Ok(reviews)
    }

    async fn review_goal(&self, goal: &GoalSpec, as_of: Time) -> Result<StatusReport> {
        let log = self.storage.load_log(goal.shortname()).await?;
        Ok(self.engine.review(goal, &log, as_of)?)
    }

    /// Fit the goal's trajectory to its logged history.
    pub async fn refit(&self, name: &GoalName) -> Result<Polynomial> {
        let goal = self.goal(name).await?;
        let log = self.storage.load_log(name).await?;
        Ok(self.fitter.refit(&goal, &log)?)
    }

    /// Replace a goal's rate schedule with its fitted one, keeping its log.
    pub async fn adopt_refit(&mut self, name: &GoalName) -> Result<GoalSpec> {
        let goal = self.goal(name).await?;
        let log = self.storage.load_log(name).await?;
        let fitted = self.fitter.refit(&goal, &log)?;

        debug!("Dropping intercept {} of fitted {}", fitted.coefficients()[0], name);
        let adopted = goal.with_rate_coefficients(fitted.rate_coefficients(goal.period()))?;
        self.storage.save_goal(&adopted).await?;
        info!(
            "Adopted fitted rates {:?} for {} (was {:?})",
            adopted.rate_coefficients(),
            name,
            goal.rate_coefficients()
        );
        Ok(adopted)
    }

    /// Entries of a goal logged at or after `since`.
    pub async fn tail(&self, name: &GoalName, since: Time) -> Result<Vec<ObservedEntry>> {
        let log = self.log(name).await?;
        Ok(log.entries_since(since).copied().collect())
    }
}
