//! Progress review - how far ahead or behind the trajectory a goal is.

use goaltrack_core::{GoalSpec, ObservedLog, Result, Time, TrackError, DEFAULT_LEEWAY_FACTOR};
use serde::Serialize;
use tracing::debug;

use crate::clock::PeriodClock;
use crate::trajectory::{Polynomial, DEFAULT_ROOT_TOLERANCE};

/// Configuration for the review engine.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Width of one leeway band in multiples of the base rate per day
    pub leeway_factor: f64,
    /// Relative imaginary part below which a root counts as real
    pub root_tolerance: f64,
    /// Day counts this close to an integer are snapped to it before flooring
    pub day_snap_tolerance: f64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            leeway_factor: DEFAULT_LEEWAY_FACTOR,
            root_tolerance: DEFAULT_ROOT_TOLERANCE,
            day_snap_tolerance: 1e-9,
        }
    }
}

impl ReviewConfig {
    /// Set the leeway factor.
    pub fn with_leeway_factor(mut self, leeway_factor: f64) -> Self {
        self.leeway_factor = leeway_factor;
        self
    }

    /// Set the real-root tolerance.
    pub fn with_root_tolerance(mut self, root_tolerance: f64) -> Self {
        self.root_tolerance = root_tolerance;
        self
    }

    /// Set how close to a whole day a count must be to snap to it.
    pub fn with_day_snap_tolerance(mut self, day_snap_tolerance: f64) -> Self {
        self.day_snap_tolerance = day_snap_tolerance;
        self
    }
}

/// Outcome of reviewing one goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    /// Actual minus expected progress; positive is ahead
    pub progress_differential: f64,

    /// Days until the trajectory meets current progress, assuming nothing
    /// more is logged. Negative when behind: the days of catch-up owed.
    pub days_to_equalize: i64,

    /// Expected rate right now, in units per period
    pub progress_rate: f64,
}

impl StatusReport {
    /// Ahead, on track or behind.
    pub fn standing(&self) -> Standing {
        Standing::of(self.progress_differential)
    }
}

/// Sign of the progress differential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Standing {
    /// More done than expected
    Ahead,
    /// Exactly on the trajectory
    OnTrack,
    /// Less done than expected
    Behind,
}

impl Standing {
    /// Classify a progress differential.
    pub fn of(progress_differential: f64) -> Self {
        if progress_differential > 0.0 {
            Standing::Ahead
        } else if progress_differential < 0.0 {
            Standing::Behind
        } else {
            Standing::OnTrack
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Standing::Ahead => "ahead",
            Standing::OnTrack => "on track",
            Standing::Behind => "behind",
        }
    }
}

/// How far the differential strays from the trajectory, in leeway widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LeewayBand {
    /// Within one leeway
    Within,
    /// Between one and two
    Warning,
    /// Between two and three
    Danger,
    /// Further than three
    Outside,
}

impl LeewayBand {
    /// Classify a differential against a leeway width.
    pub fn classify(progress_differential: f64, leeway: f64) -> Self {
        let distance = progress_differential.abs();
        let width = leeway.abs();
        if distance <= width {
            LeewayBand::Within
        } else if distance <= 2.0 * width {
            LeewayBand::Warning
        } else if distance <= 3.0 * width {
            LeewayBand::Danger
        } else {
            LeewayBand::Outside
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeewayBand::Within => "within leeway",
            LeewayBand::Warning => "warning",
            LeewayBand::Danger => "danger",
            LeewayBand::Outside => "off the chart",
        }
    }
}

/// Compares observed progress with a goal's trajectory.
#[derive(Debug, Clone, Default)]
pub struct ReviewEngine {
    config: ReviewConfig,
}

impl ReviewEngine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ReviewConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Review a goal's log as of a given moment.
    ///
    /// The equalization point is the largest real `t` with `P(t)` equal to
    /// current progress; its distance from now, in days, is floored. Fails
    /// with [`TrackError::NoEqualizationPoint`] when no such `t` exists.
    pub fn review(&self, goal: &GoalSpec, log: &ObservedLog, as_of: Time) -> Result<StatusReport> {
        let t_now = PeriodClock::for_goal(goal).elapsed_periods(as_of)?;
        let trajectory = Polynomial::for_goal(goal);

        let expected = trajectory.evaluate(t_now);
        let actual = log.cumulative_progress();
        let progress_differential = actual - expected;
        let progress_rate = trajectory.evaluate_derivative(t_now);

        let roots = trajectory.real_roots_with_tolerance(actual, self.config.root_tolerance);
        debug!(
            goal = %goal.shortname(),
            t_now, expected, actual, ?roots,
            "Reviewed trajectory"
        );

        let Some(crossing) = roots.into_iter().reduce(f64::max) else {
            return Err(TrackError::NoEqualizationPoint {
                progress_differential,
                progress_rate,
            });
        };

        let days = (crossing - t_now) * f64::from(goal.period());
        Ok(StatusReport {
            progress_differential,
            days_to_equalize: floor_days(days, self.config.day_snap_tolerance),
            progress_rate,
        })
    }

    /// Leeway band of a report for the goal it was computed for.
    pub fn leeway_band(&self, goal: &GoalSpec, report: &StatusReport) -> LeewayBand {
        LeewayBand::classify(
            report.progress_differential,
            goal.leeway(self.config.leeway_factor),
        )
    }
}

/// Review a goal with the default configuration.
pub fn review(goal: &GoalSpec, log: &ObservedLog, as_of: Time) -> Result<StatusReport> {
    ReviewEngine::default().review(goal, log, as_of)
}

/// Floor a day count, first snapping values within `tolerance` of an integer
/// so solver noise around an exact crossing cannot cost a whole day.
fn floor_days(days: f64, tolerance: f64) -> i64 {
    let nearest = days.round();
    let snapped = if (days - nearest).abs() <= tolerance * nearest.abs().max(1.0) {
        nearest
    } else {
        days
    };
    snapped.floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, TimeZone, Utc};
    use goaltrack_core::GoalName;

    fn goal(period: u32, rates: Vec<f64>) -> GoalSpec {
        GoalSpec::new(
            GoalName::new("pushups").unwrap(),
            "pushups every morning",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            period,
            rates,
        )
        .unwrap()
    }

    fn day(d: u32) -> Time {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_log_is_behind_by_whole_trajectory() {
        let goal = goal(1, vec![20.0, 1.0]);
        let log = ObservedLog::new();
        let as_of = day(4);

        let t_now = PeriodClock::for_goal(&goal).elapsed_periods(as_of).unwrap();
        assert_eq!(t_now, 3.0);

        let report = review(&goal, &log, as_of).unwrap();
        let p3 = Polynomial::for_goal(&goal).evaluate(3.0);
        assert_relative_eq!(p3, 64.5);
        assert_relative_eq!(report.progress_differential, -p3);
        assert_eq!(report.standing(), Standing::Behind);
        // 0.5 t^2 + 20 t = 0 at t = 0 and t = -40; the larger is 3 periods back
        assert_eq!(report.days_to_equalize, -3);
        assert_relative_eq!(report.progress_rate, 23.0);
    }

    #[test]
    fn test_ahead_after_one_period() {
        let goal = goal(1, vec![20.0, 1.0]);
        let mut log = ObservedLog::new();
        log.append(Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap(), 25.0);

        let report = review(&goal, &log, day(2)).unwrap();
        assert_relative_eq!(report.progress_differential, 4.5);
        assert_eq!(report.standing(), Standing::Ahead);
        // crossing at -20 + sqrt(450) = 1.2132 periods
        assert_eq!(report.days_to_equalize, 0);
        assert_relative_eq!(report.progress_rate, 21.0);
    }

    #[test]
    fn test_slack_scales_with_period() {
        let goal = goal(7, vec![70.0]);
        let mut log = ObservedLog::new();
        log.append(day(2), 250.0);

        // t_now = 1 on the 8th; 10 t = 250 at t = 25, 24 periods ahead
        let report = review(&goal, &log, day(8)).unwrap();
        assert_relative_eq!(report.progress_differential, 240.0);
        assert_eq!(report.days_to_equalize, 24 * 7);
        assert_relative_eq!(report.progress_rate, 10.0);
    }

    #[test]
    fn test_linear_goal_behind() {
        let goal = goal(1, vec![10.0]);
        let mut log = ObservedLog::new();
        log.append(day(2), 15.0);

        // t_now = 5, expected 50, crossing at 1.5: 3.5 periods behind
        let report = review(&goal, &log, day(6)).unwrap();
        assert_relative_eq!(report.progress_differential, -35.0);
        assert_eq!(report.days_to_equalize, -4);
    }

    #[test]
    fn test_on_track() {
        let goal = goal(1, vec![10.0]);
        let mut log = ObservedLog::new();
        log.append(day(2), 20.0);
        log.append(day(3), 10.0);

        let report = review(&goal, &log, day(4)).unwrap();
        assert_eq!(report.progress_differential, 0.0);
        assert_eq!(report.standing(), Standing::OnTrack);
        assert_eq!(report.days_to_equalize, 0);
    }

    #[test]
    fn test_no_equalization_point() {
        // falling trajectory: 10 t - 0.5 t^2 peaks at 50
        let goal = goal(1, vec![10.0, -1.0]);
        let mut log = ObservedLog::new();
        log.append(day(2), 80.0);

        match review(&goal, &log, day(3)) {
            Err(TrackError::NoEqualizationPoint {
                progress_differential,
                progress_rate,
            }) => {
                assert_relative_eq!(progress_differential, 80.0 - 18.0);
                assert_relative_eq!(progress_rate, 8.0);
            }
            other => panic!("expected no equalization point, got {other:?}"),
        }
    }

    #[test]
    fn test_review_before_start_is_invalid_range() {
        let goal = goal(1, vec![20.0]);
        let as_of = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            review(&goal, &ObservedLog::new(), as_of),
            Err(TrackError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_gap_before_first_entry_does_not_move_anchor() {
        let goal = goal(1, vec![10.0]);
        let mut log = ObservedLog::new();
        log.append(day(9), 30.0);

        // anchored at the 1st, not the 9th: t_now = 9
        let report = review(&goal, &log, day(10)).unwrap();
        assert_relative_eq!(report.progress_differential, 30.0 - 90.0);
    }

    #[test]
    fn test_config_builders() {
        let config = ReviewConfig::default()
            .with_leeway_factor(2.0)
            .with_root_tolerance(1e-8)
            .with_day_snap_tolerance(0.25);
        assert_eq!(config.leeway_factor, 2.0);
        assert_eq!(config.root_tolerance, 1e-8);
        assert_eq!(config.day_snap_tolerance, 0.25);

        // 39 logged against 10 a day: crossing at 3.9, 2.9 days ahead
        let goal = goal(1, vec![10.0]);
        let mut log = ObservedLog::new();
        log.append(day(1), 39.0);

        let strict = review(&goal, &log, day(2)).unwrap();
        assert_eq!(strict.days_to_equalize, 2);
        let loose = ReviewEngine::new().with_config(config);
        assert_eq!(loose.review(&goal, &log, day(2)).unwrap().days_to_equalize, 3);
    }

    #[test]
    fn test_floor_days_boundaries() {
        assert_eq!(floor_days(-3.0000000000004, 1e-9), -3);
        assert_eq!(floor_days(2.9999999999996, 1e-9), 3);
        assert_eq!(floor_days(-2.5, 1e-9), -3);
        assert_eq!(floor_days(0.2132, 1e-9), 0);
        assert_eq!(floor_days(-0.001, 1e-9), -1);
    }

    #[test]
    fn test_leeway_band() {
        let goal = goal(1, vec![20.0, 1.0]);
        let engine = ReviewEngine::new();
        let report = |d: f64| StatusReport {
            progress_differential: d,
            days_to_equalize: 0,
            progress_rate: 20.0,
        };
        // leeway is 3 * 20 / 1 = 60
        assert_eq!(engine.leeway_band(&goal, &report(-59.0)), LeewayBand::Within);
        assert_eq!(engine.leeway_band(&goal, &report(61.0)), LeewayBand::Warning);
        assert_eq!(engine.leeway_band(&goal, &report(-150.0)), LeewayBand::Danger);
        assert_eq!(engine.leeway_band(&goal, &report(181.0)), LeewayBand::Outside);

        let narrow =
            ReviewEngine::new().with_config(ReviewConfig::default().with_leeway_factor(1.0));
        assert_eq!(narrow.leeway_band(&goal, &report(-59.0)), LeewayBand::Danger);
    }
}
