//! Period clock - maps calendar moments onto the trajectory's time axis.

use chrono::{Duration, NaiveDate};
use goaltrack_core::{midnight_utc, GoalSpec, Result, Time, TrackError};

const SECONDS_PER_DAY: i64 = 86_400;

/// Counts elapsed periods since a goal's start date.
///
/// Period boundaries fall at midnight UTC of `start + k * period` days. A
/// moment maps to the index of the boundary at or immediately after it: a
/// moment exactly on boundary `k` is `k`, and anything later within the
/// following period is already `k + 1`, the quota that is currently due.
///
/// The anchor is always the declared start date, never the first log entry,
/// so gaps before the first entry do not shift the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodClock {
    start_date: NaiveDate,
    period: u32,
}

impl PeriodClock {
    /// Clock for a start date and a period length in days.
    pub fn new(start_date: NaiveDate, period: u32) -> Result<Self> {
        if period == 0 {
            return Err(TrackError::InvalidSpec("period must be positive".to_string()));
        }
        Ok(Self { start_date, period })
    }

    /// Clock of a goal.
    pub fn for_goal(goal: &GoalSpec) -> Self {
        Self {
            start_date: goal.start_date(),
            period: goal.period(),
        }
    }

    /// Moment of boundary `index`.
    pub fn boundary(&self, index: i64) -> Time {
        self.start() + Duration::days(index * i64::from(self.period))
    }

    /// Elapsed-period index of `as_of`.
    ///
    /// Fails with [`TrackError::InvalidRange`] before the start date.
    pub fn elapsed_periods(&self, as_of: Time) -> Result<f64> {
        let start = self.start();
        if as_of < start {
            return Err(TrackError::InvalidRange {
                start: self.start_date,
                as_of,
            });
        }

        let period_seconds = i64::from(self.period) * SECONDS_PER_DAY;
        let whole = (as_of - start).num_seconds() / period_seconds;
        let index = if as_of > self.boundary(whole) {
            whole + 1
        } else {
            whole
        };
        Ok(index as f64)
    }

    fn start(&self) -> Time {
        midnight_utc(self.start_date)
    }
}

/// Elapsed-period index of `as_of` for a goal starting on `start_date`.
pub fn elapsed_periods(start_date: NaiveDate, period: u32, as_of: Time) -> Result<f64> {
    PeriodClock::new(start_date, period)?.elapsed_periods(as_of)
}
