//! Errors raised by goal computations.

use chrono::NaiveDate;

use crate::Time;

/// Result alias for goal computations.
pub type Result<T> = std::result::Result<T, TrackError>;

/// Failures of a single goal's computation.
///
/// None of these are retried: every operation that produces them is a pure
/// function of data that is already in memory.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    /// Malformed goal definition
    #[error("invalid goal specification: {0}")]
    InvalidSpec(String),

    /// Moment before the goal's start date
    #[error("{as_of} precedes goal start date {start}")]
    InvalidRange {
        /// Declared start of the goal
        start: NaiveDate,
        /// Moment that was queried
        as_of: Time,
    },

    /// The trajectory never meets the current progress.
    ///
    /// Carries the parts of the review that could still be computed.
    #[error(
        "trajectory never reaches current progress (differential {progress_differential:+.2}, rate {progress_rate:.2}/period)"
    )]
    NoEqualizationPoint {
        /// Actual minus expected progress
        progress_differential: f64,
        /// Expected rate at the time of review
        progress_rate: f64,
    },

    /// Too few observations for a least-squares fit
    #[error("need at least {required} observations to fit, have {available}")]
    InsufficientData {
        /// Observations needed for the fit degree
        required: usize,
        /// Observations available
        available: usize,
    },

    /// Nothing has been logged yet
    #[error("no progress has been logged")]
    EmptyLog,
}
