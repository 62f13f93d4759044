//! Goal model - a quantitative target with a rate schedule.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::id::GoalName;
use crate::Time;

/// Default width of one leeway band, in multiples of the base rate per day.
pub const DEFAULT_LEEWAY_FACTOR: f64 = 3.0;

/// A goal you want to pursue, e.g. "20 pushups a day, one more every day".
///
/// `rate_coefficients[0]` is the base amount per period; each further entry is
/// the per-period increment of the next order. `[20.0, 1.0]` with a period of
/// one day starts at 20 a day and adds one each day.
///
/// Immutable once built. Adopting a re-fitted trajectory creates a new value
/// through [`GoalSpec::with_rate_coefficients`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GoalSpecRecord")]
pub struct GoalSpec {
    shortname: GoalName,
    description: String,
    start_date: NaiveDate,
    period: u32,
    rate_coefficients: Vec<f64>,
}

/// Unvalidated shape of a stored goal definition.
#[derive(Deserialize)]
struct GoalSpecRecord {
    shortname: GoalName,
    #[serde(default)]
    description: String,
    start_date: NaiveDate,
    period: u32,
    rate_coefficients: Vec<f64>,
}

impl TryFrom<GoalSpecRecord> for GoalSpec {
    type Error = TrackError;

    fn try_from(r: GoalSpecRecord) -> Result<Self> {
        GoalSpec::new(r.shortname, r.description, r.start_date, r.period, r.rate_coefficients)
    }
}

impl GoalSpec {
    /// Create a goal, checking that the period is positive and that there is
    /// at least one finite rate coefficient.
    pub fn new(
        shortname: GoalName,
        description: impl Into<String>,
        start_date: NaiveDate,
        period: u32,
        rate_coefficients: Vec<f64>,
    ) -> Result<Self> {
        validate_schedule(period, &rate_coefficients)?;
        Ok(Self {
            shortname,
            description: description.into(),
            start_date,
            period,
            rate_coefficients,
        })
    }

    /// Same goal with a different rate schedule, e.g. after a re-fit.
    pub fn with_rate_coefficients(&self, rate_coefficients: Vec<f64>) -> Result<Self> {
        validate_schedule(self.period, &rate_coefficients)?;
        Ok(Self {
            rate_coefficients,
            ..self.clone()
        })
    }

    /// Unique short name.
    pub fn shortname(&self) -> &GoalName {
        &self.shortname
    }

    /// Free-text description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared start date; elapsed periods are counted from its midnight.
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Start of the goal as a UTC timestamp.
    pub fn start_time(&self) -> Time {
        midnight_utc(self.start_date)
    }

    /// Length of one tracking cycle in days.
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Rate schedule, base rate first.
    pub fn rate_coefficients(&self) -> &[f64] {
        &self.rate_coefficients
    }

    /// Degree of the trajectory polynomial.
    pub fn degree(&self) -> usize {
        self.rate_coefficients.len()
    }

    /// Base amount expected per period.
    pub fn base_rate(&self) -> f64 {
        self.rate_coefficients[0]
    }

    /// Width of one leeway band around the trajectory.
    pub fn leeway(&self, factor: f64) -> f64 {
        factor * self.base_rate() / f64::from(self.period)
    }
}

/// Midnight UTC at the beginning of `date`.
pub fn midnight_utc(date: NaiveDate) -> Time {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Check a rate schedule: positive period, at least one coefficient, all
/// finite.
pub fn validate_schedule(period: u32, rate_coefficients: &[f64]) -> Result<()> {
    if period == 0 {
        return Err(TrackError::InvalidSpec("period must be positive".to_string()));
    }
    if rate_coefficients.is_empty() {
        return Err(TrackError::InvalidSpec(
            "at least one rate coefficient is required".to_string(),
        ));
    }
    if let Some(bad) = rate_coefficients.iter().find(|c| !c.is_finite()) {
        return Err(TrackError::InvalidSpec(format!(
            "rate coefficient {bad} is not finite"
        )));
    }
    Ok(())
}
