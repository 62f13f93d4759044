//! Goal Progress (Layer 2)
//!
//! Trajectories, the period clock, reviews, and curve refits.

#![warn(missing_docs)]

pub mod clock;
pub mod fit;
pub mod review;
pub mod tracker;
pub mod trajectory;

pub use clock::{elapsed_periods, PeriodClock};
pub use fit::{refit, CurveFitter};
pub use review::{review, LeewayBand, ReviewConfig, ReviewEngine, Standing, StatusReport};
pub use tracker::{GoalReview, GoalTracker, TrackerError};
pub use trajectory::{Polynomial, DEFAULT_ROOT_TOLERANCE};
