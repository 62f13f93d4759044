//! Observed progress log - what was actually done, and when.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::Time;

/// One logged progress increment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedEntry {
    /// When it was logged
    pub timestamp: Time,

    /// Amount added; negative values are corrections
    pub delta: f64,
}

impl ObservedEntry {
    /// Create an entry.
    pub fn new(timestamp: Time, delta: f64) -> Self {
        Self { timestamp, delta }
    }
}

/// Append-only log of a goal's progress.
///
/// Entries keep insertion order and are never re-sorted, edited or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedLog {
    entries: Vec<ObservedEntry>,
}

impl ObservedLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an increment. Any value is accepted.
    pub fn append(&mut self, timestamp: Time, delta: f64) -> &ObservedEntry {
        self.push(ObservedEntry::new(timestamp, delta))
    }

    /// Add an already built entry.
    pub fn push(&mut self, entry: ObservedEntry) -> &ObservedEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[ObservedEntry] {
        &self.entries
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ObservedEntry> {
        self.entries.iter()
    }

    /// Sum of every delta; zero for an empty log.
    pub fn cumulative_progress(&self) -> f64 {
        self.entries.iter().map(|e| e.delta).sum()
    }

    /// Most recent entry, if any.
    pub fn last_entry(&self) -> Option<&ObservedEntry> {
        self.entries.last()
    }

    /// Most recent entry, or [`TrackError::EmptyLog`].
    pub fn last_entry_required(&self) -> Result<&ObservedEntry> {
        self.last_entry().ok_or(TrackError::EmptyLog)
    }

    /// Entries logged at or after `since`, in original order.
    ///
    /// The iterator is lazy and can be cloned to restart it.
    pub fn entries_since(
        &self,
        since: Time,
    ) -> impl Iterator<Item = &ObservedEntry> + Clone + '_ {
        self.entries.iter().filter(move |e| e.timestamp >= since)
    }

    /// Each entry's timestamp paired with the cumulative total including it.
    pub fn running_totals(&self) -> impl Iterator<Item = (Time, f64)> + Clone + '_ {
        self.entries.iter().scan(0.0, |total, e| {
            *total += e.delta;
            Some((e.timestamp, *total))
        })
    }

    /// Time elapsed between the last entry and `as_of`, if anything was logged.
    pub fn time_since_last(&self, as_of: Time) -> Option<Duration> {
        self.last_entry().map(|e| as_of - e.timestamp)
    }
}

impl From<Vec<ObservedEntry>> for ObservedLog {
    fn from(entries: Vec<ObservedEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<ObservedEntry> for ObservedLog {
    fn from_iter<I: IntoIterator<Item = ObservedEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<ObservedEntry> for ObservedLog {
    fn extend<I: IntoIterator<Item = ObservedEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ObservedLog {
    type Item = &'a ObservedEntry;
    type IntoIter = std::slice::Iter<'a, ObservedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use chrono::Utc;

    fn at(day: u32, hour: u32) -> Time {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_log() {
        let log = ObservedLog::new();
        assert!(log.is_empty());
        assert_eq!(log.cumulative_progress(), 0.0);
        assert!(log.last_entry().is_none());
        assert_eq!(log.last_entry_required(), Err(TrackError::EmptyLog));
        assert!(log.time_since_last(at(1, 0)).is_none());
        assert_eq!(log.entries_since(at(1, 0)).count(), 0);
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let mut log = ObservedLog::new();
        log.append(at(3, 8), 10.0);
        log.append(at(1, 8), 5.0);
        log.append(at(2, 8), -2.0);

        let deltas: Vec<f64> = log.iter().map(|e| e.delta).collect();
        assert_eq!(deltas, vec![10.0, 5.0, -2.0]);
        assert_eq!(log.last_entry().unwrap().timestamp, at(2, 8));
        assert_relative_eq!(log.cumulative_progress(), 13.0);
    }

    #[test]
    fn test_entries_since_is_inclusive_and_restartable() {
        let log: ObservedLog = vec![
            ObservedEntry::new(at(1, 8), 1.0),
            ObservedEntry::new(at(2, 8), 2.0),
            ObservedEntry::new(at(3, 8), 3.0),
        ]
        .into();

        let since = log.entries_since(at(2, 8));
        let first: Vec<f64> = since.clone().map(|e| e.delta).collect();
        let second: Vec<f64> = since.map(|e| e.delta).collect();
        assert_eq!(first, vec![2.0, 3.0]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_running_totals() {
        let mut log = ObservedLog::new();
        log.append(at(1, 8), 20.0);
        log.append(at(2, 8), 22.0);
        log.append(at(2, 9), -2.0);

        let totals: Vec<f64> = log.running_totals().map(|(_, total)| total).collect();
        assert_eq!(totals, vec![20.0, 42.0, 40.0]);
    }

    #[test]
    fn test_time_since_last() {
        let mut log = ObservedLog::new();
        log.append(at(1, 8), 1.0);
        assert_eq!(log.time_since_last(at(2, 20)), Some(Duration::hours(36)));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut log = ObservedLog::new();
        log.append(at(1, 8), 1.5);
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        let back: ObservedLog = serde_json::from_value(json).unwrap();
        assert_eq!(back, log);
    }
}
