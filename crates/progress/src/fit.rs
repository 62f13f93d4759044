//! Curve fitting - re-estimate a trajectory from logged history.

use goaltrack_core::{GoalSpec, ObservedLog, Result, TrackError};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::clock::PeriodClock;
use crate::trajectory::Polynomial;

/// Singular values below this are treated as zero.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Least-squares fitter for goal trajectories.
///
/// Fits a polynomial of the goal's degree, intercept included, to the points
/// (elapsed periods at each entry, cumulative progress after that entry).
/// The result is indexed like [`Polynomial::trajectory`]; adopting it as a
/// new goal is up to the caller.
#[derive(Debug, Clone, Default)]
pub struct CurveFitter;

impl CurveFitter {
    /// Create a fitter.
    pub fn new() -> Self {
        Self
    }

    /// Fit the goal's degree to its whole log.
    ///
    /// Needs at least `degree + 1` entries falling in as many distinct
    /// periods, otherwise fails with [`TrackError::InsufficientData`].
    pub fn refit(&self, goal: &GoalSpec, log: &ObservedLog) -> Result<Polynomial> {
        let terms = goal.degree() + 1;
        if log.len() < terms {
            return Err(TrackError::InsufficientData {
                required: terms,
                available: log.len(),
            });
        }

        let clock = PeriodClock::for_goal(goal);
        let points = log
            .running_totals()
            .map(|(timestamp, total)| Ok((clock.elapsed_periods(timestamp)?, total)))
            .collect::<Result<Vec<(f64, f64)>>>()?;

        let mut indices: Vec<f64> = points.iter().map(|&(t, _)| t).collect();
        indices.sort_by(f64::total_cmp);
        indices.dedup();
        if indices.len() < terms {
            return Err(TrackError::InsufficientData {
                required: terms,
                available: indices.len(),
            });
        }

        // Fit against t / scale to keep the Vandermonde matrix well conditioned.
        let scale = indices.iter().fold(1.0_f64, |m, t| m.max(t.abs()));
        let design = DMatrix::from_fn(points.len(), terms, |i, k| {
            (points[i].0 / scale).powi(k as i32)
        });
        let observed = DVector::from_iterator(points.len(), points.iter().map(|&(_, y)| y));

        let solution = design
            .svd(true, true)
            .solve(&observed, SINGULAR_EPSILON)
            .map_err(|_| TrackError::InsufficientData {
                required: terms,
                available: indices.len(),
            })?;

        let coefficients: Vec<f64> = solution
            .iter()
            .enumerate()
            .map(|(k, c)| c / scale.powi(k as i32))
            .collect();
        let fitted = Polynomial::new(coefficients);
        debug!(goal = %goal.shortname(), points = points.len(), %fitted, "Refit trajectory");
        Ok(fitted)
    }
}

/// Fit the goal's degree to its whole log.
pub fn refit(goal: &GoalSpec, log: &ObservedLog) -> Result<Polynomial> {
    CurveFitter::new().refit(goal, log)
}
