//! goaltrack core data models.
//!
//! This crate defines the goal definitions, observed progress logs and the
//! error taxonomy shared by the trajectory and review services.

#![warn(missing_docs)]

mod error;
mod goal;
mod id;
mod log;

pub use error::{Result, TrackError};
pub use goal::{midnight_utc, validate_schedule, GoalSpec, DEFAULT_LEEWAY_FACTOR};
pub use id::GoalName;
pub use log::{ObservedEntry, ObservedLog};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
