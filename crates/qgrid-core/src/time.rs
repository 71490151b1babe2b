//! Snapshot index shared by every time-indexed series in a network.

use crate::error::{QgridError, QgridResult};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Resolution of a snapshot set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeStep {
    #[default]
    Hourly,
    Daily,
}

impl TimeStep {
    pub fn hours(self) -> f64 {
        match self {
            TimeStep::Hourly => 1.0,
            TimeStep::Daily => 24.0,
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            TimeStep::Hourly => Duration::hours(1),
            TimeStep::Daily => Duration::days(1),
        }
    }

    /// Classify a gap between consecutive timestamps; gaps of 23 hours or
    /// more are daily.
    pub fn from_gap(gap: Duration) -> Self {
        if gap >= Duration::hours(23) {
            TimeStep::Daily
        } else {
            TimeStep::Hourly
        }
    }
}

/// Inclusive simulation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub step: TimeStep,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, step: TimeStep) -> QgridResult<Self> {
        if end < start {
            return Err(QgridError::Validation(format!(
                "time window ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end, step })
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// True when `ts` falls inside the interval of some snapshot of the window.
    pub fn covers(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end + self.step.duration()
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }
}

/// Ordered, strictly increasing timestamps at a fixed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSet {
    timestamps: Vec<NaiveDateTime>,
    step: TimeStep,
}

impl SnapshotSet {
    /// Every step from `window.start` up to and including `window.end`.
    pub fn from_window(window: &TimeWindow) -> Self {
        let delta = window.step.duration();
        let mut timestamps = Vec::new();
        let mut current = window.start;
        while current <= window.end {
            timestamps.push(current);
            current += delta;
        }
        Self {
            timestamps,
            step: window.step,
        }
    }

    /// Build from explicit timestamps, detecting the step from the first gap.
    pub fn from_timestamps(timestamps: Vec<NaiveDateTime>) -> QgridResult<Self> {
        let step = match timestamps.as_slice() {
            [first, second, ..] => TimeStep::from_gap(*second - *first),
            _ => TimeStep::Hourly,
        };
        Self::with_step(timestamps, step)
    }

    pub fn with_step(timestamps: Vec<NaiveDateTime>, step: TimeStep) -> QgridResult<Self> {
        if let Some(pair) = timestamps.windows(2).find(|w| w[1] <= w[0]) {
            return Err(QgridError::Validation(format!(
                "snapshots must be strictly increasing ({} then {})",
                pair[0], pair[1]
            )));
        }
        Ok(Self { timestamps, step })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn step(&self) -> TimeStep {
        self.step
    }

    pub fn hours_per_step(&self) -> f64 {
        self.step.hours()
    }

    pub fn total_hours(&self) -> f64 {
        self.len() as f64 * self.hours_per_step()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn get(&self, index: usize) -> Option<NaiveDateTime> {
        self.timestamps.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDateTime> {
        self.timestamps.iter()
    }

    /// Index of an exact timestamp.
    pub fn position(&self, ts: NaiveDateTime) -> Option<usize> {
        self.timestamps.binary_search(&ts).ok()
    }

    /// Index of the snapshot whose step interval `[ts_i, ts_i + step)` holds `ts`.
    pub fn bucket(&self, ts: NaiveDateTime) -> Option<usize> {
        let idx = match self.timestamps.binary_search(&ts) {
            Ok(idx) => return Some(idx),
            Err(0) => return None,
            Err(idx) => idx - 1,
        };
        (ts < self.timestamps[idx] + self.step.duration()).then_some(idx)
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.get(index).map(|ts| ts.date())
    }

    pub fn year(&self) -> Option<i32> {
        self.timestamps.first().map(|ts| ts.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn window_is_inclusive() {
        let window = TimeWindow::new(
            ts("2024-01-01 00:00:00"),
            ts("2024-01-01 23:00:00"),
            TimeStep::Hourly,
        )
        .unwrap();
        let snapshots = SnapshotSet::from_window(&window);
        assert_eq!(snapshots.len(), 24);
        assert_eq!(snapshots.total_hours(), 24.0);
    }

    #[test]
    fn reversed_window_rejected() {
        let err = TimeWindow::new(
            ts("2024-01-02 00:00:00"),
            ts("2024-01-01 00:00:00"),
            TimeStep::Daily,
        );
        assert!(err.is_err());
    }

    #[test]
    fn step_detection_uses_23_hour_threshold() {
        let daily = SnapshotSet::from_timestamps(vec![
            ts("2024-03-09 12:00:00"),
            ts("2024-03-10 11:00:00"),
        ])
        .unwrap();
        assert_eq!(daily.step(), TimeStep::Daily);

        let hourly = SnapshotSet::from_timestamps(vec![
            ts("2024-03-09 12:00:00"),
            ts("2024-03-09 13:00:00"),
        ])
        .unwrap();
        assert_eq!(hourly.step(), TimeStep::Hourly);
    }

    #[test]
    fn non_increasing_rejected() {
        let err = SnapshotSet::from_timestamps(vec![
            ts("2024-01-01 01:00:00"),
            ts("2024-01-01 01:00:00"),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn bucket_maps_hours_into_days() {
        let window = TimeWindow::new(
            ts("2024-01-01 00:00:00"),
            ts("2024-01-03 00:00:00"),
            TimeStep::Daily,
        )
        .unwrap();
        let snapshots = SnapshotSet::from_window(&window);
        assert_eq!(snapshots.bucket(ts("2024-01-02 17:00:00")), Some(1));
        assert_eq!(snapshots.bucket(ts("2023-12-31 23:00:00")), None);
        assert_eq!(snapshots.bucket(ts("2024-01-04 01:00:00")), None);
    }
}
