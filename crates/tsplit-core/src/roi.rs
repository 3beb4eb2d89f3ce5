//! Regions of interest: unions of half-open time intervals.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TimeInterval;

/// A union of disjoint half-open intervals, kept sorted and merged.
///
/// Touching intervals (`[a, b)` and `[b, c)`) are merged into `[a, c)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRoi {
    intervals: Vec<TimeInterval>,
}

impl TimeRoi {
    /// An empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// Builds a region from arbitrary (possibly overlapping, unsorted) intervals.
    pub fn from_intervals(intervals: impl IntoIterator<Item = TimeInterval>) -> Self {
        let mut roi = Self::new();
        for interval in intervals {
            roi.add(interval.start, interval.stop);
        }
        roi
    }

    /// Adds `[start, stop)` to the region. Empty or reversed spans are ignored.
    pub fn add(&mut self, start: DateTime<Utc>, stop: DateTime<Utc>) {
        if stop <= start {
            return;
        }

        // Fast path: appending in time order, which is how the splitter cache
        // is built.
        if let Some(last) = self.intervals.last_mut() {
            if start >= last.start {
                if start <= last.stop {
                    last.stop = last.stop.max(stop);
                } else {
                    self.intervals.push(TimeInterval { start, stop });
                }
                return;
            }
        } else {
            self.intervals.push(TimeInterval { start, stop });
            return;
        }

        // General case: every interval touching [start, stop] collapses into one.
        let first = self.intervals.partition_point(|i| i.stop < start);
        let last = self.intervals.partition_point(|i| i.start <= stop);
        let mut merged = TimeInterval { start, stop };
        if first < last {
            merged.start = merged.start.min(self.intervals[first].start);
            merged.stop = merged.stop.max(self.intervals[last - 1].stop);
        }
        self.intervals.splice(first..last, std::iter::once(merged));
    }

    /// The disjoint intervals, ascending.
    #[must_use]
    pub fn intervals(&self) -> &[TimeInterval] {
        &self.intervals
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Whether `time` falls inside the region.
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        let idx = self.intervals.partition_point(|i| i.start <= time);
        idx > 0 && self.intervals[idx - 1].contains(time)
    }

    /// Total covered time.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.intervals
            .iter()
            .fold(TimeDelta::zero(), |acc, i| acc + i.duration())
    }

    /// Total covered time in seconds.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "seconds are reporting only")]
    pub fn duration_seconds(&self) -> f64 {
        let nanos = self.duration().num_nanoseconds().unwrap_or(i64::MAX);
        nanos as f64 / 1e9
    }

    /// Earliest covered time.
    #[must_use]
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.intervals.first().map(|i| i.start)
    }

    /// End of the latest covered interval.
    #[must_use]
    pub fn stop(&self) -> Option<DateTime<Utc>> {
        self.intervals.last().map(|i| i.stop)
    }
}
