//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event_kind::EventKind;

/// Errors raised while building a splitter or distributing events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitterError {
    /// An interval definition was malformed (reversed bounds, bad row shape,
    /// unresolvable destination name).
    #[error("invalid interval{}: {reason}", row_suffix(.row))]
    InvalidInterval { row: Option<usize>, reason: String },

    /// A resolved destination has no partition to receive the event.
    #[error("no output partition for destination {destination}")]
    DestinationMismatch { destination: Destination },

    /// The destination index has no registered name.
    #[error("invalid target index {index}")]
    UnknownDestination { index: Destination },

    /// A numerical shift was requested for a destination with a non-numeric name.
    #[error("cannot shift non-numeric destination name {name:?}")]
    NonNumericName { name: String },

    /// The events carry no pulse time and cannot be split by time.
    #[error("event list has no pulse time information")]
    MissingPulseTime,

    /// An output partition holds events of a different kind than the input.
    #[error("partition {destination} holds {found} events, expected {expected}")]
    EventKindMismatch {
        destination: Destination,
        expected: EventKind,
        found: EventKind,
    },
}

impl SplitterError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            row: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_row(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            row: Some(row),
            reason: reason.into(),
        }
    }
}

#[expect(clippy::ref_option, reason = "thiserror passes field references")]
fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" at row {r}")).unwrap_or_default()
}

/// Result alias used throughout the crate.
pub type Result<T, E = SplitterError> = std::result::Result<T, E>;

/// Index of an output partition.
///
/// [`Destination::NO_TARGET`] marks time that belongs to no partition; events
/// resolved to it are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(i32);

impl Destination {
    /// Sentinel for filtered-out time.
    pub const NO_TARGET: Self = Self(-1);

    /// Target used by the single-interval constructor when none is given.
    pub const DEFAULT_TARGET: Self = Self(0);

    /// Wraps a raw destination index.
    #[must_use]
    pub const fn new(index: i32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> i32 {
        self.0
    }

    /// Whether this is a real destination (not [`Self::NO_TARGET`]).
    #[must_use]
    pub const fn is_target(self) -> bool {
        self.0 != Self::NO_TARGET.0
    }
}

impl From<i32> for Destination {
    fn from(index: i32) -> Self {
        Self(index)
    }
}

impl From<Destination> for i32 {
    fn from(d: Destination) -> Self {
        d.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Destination {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A half-open span of time `[start, stop)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
}

impl TimeInterval {
    /// Creates an interval, rejecting `stop < start`.
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Self> {
        if stop < start {
            return Err(SplitterError::invalid(format!(
                "stop {stop} is before start {start}"
            )));
        }
        Ok(Self { start, stop })
    }

    /// Length of the interval.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.stop - self.start
    }

    /// Whether `time` lies in `[start, stop)`.
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time < self.stop
    }
}

/// One explicit `[start, stop) -> destination` interval.
///
/// This is the pre-resolved splitter form: what [`crate::TimeSplitter::to_splitters`]
/// produces and what [`crate::SplitterSource::Splitters`] consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplittingInterval {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub destination: Destination,
}

impl SplittingInterval {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, stop: DateTime<Utc>, destination: Destination) -> Self {
        Self {
            start,
            stop,
            destination,
        }
    }

    /// The time span without its destination.
    #[must_use]
    pub const fn interval(&self) -> TimeInterval {
        TimeInterval {
            start: self.start,
            stop: self.stop,
        }
    }
}

/// Start of GPS time, the default anchor for relative times in builder sources.
#[must_use]
pub fn gps_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(631_152_000, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Converts relative seconds to a duration at nanosecond resolution.
///
/// Returns `None` for non-finite or out-of-range input.
#[must_use]
pub fn seconds_to_delta(seconds: f64) -> Option<TimeDelta> {
    let nanos = (seconds * 1e9).round();
    #[expect(
        clippy::cast_precision_loss,
        reason = "range check only, exact bound is irrelevant"
    )]
    let in_range = nanos.is_finite() && nanos.abs() < i64::MAX as f64;
    if !in_range {
        return None;
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "value was range checked above"
    )]
    Some(TimeDelta::nanoseconds(nanos as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_target_is_not_a_target() {
        assert!(!Destination::NO_TARGET.is_target());
        assert!(Destination::DEFAULT_TARGET.is_target());
        assert!(Destination::new(-2).is_target());
    }

    #[test]
    fn destination_parses_with_whitespace() {
        assert_eq!(" 3 ".parse::<Destination>().unwrap(), Destination::new(3));
        assert_eq!("-1".parse::<Destination>().unwrap(), Destination::NO_TARGET);
        assert!("three".parse::<Destination>().is_err());
    }

    #[test]
    fn destination_serde_is_transparent() {
        let json = serde_json::to_string(&Destination::new(7)).unwrap();
        assert_eq!(json, "7");
        let parsed: Destination = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, Destination::NO_TARGET);
    }

    #[test]
    fn invalid_interval_message_names_row() {
        let err = SplitterError::invalid_row(4, "stop before start");
        assert_eq!(err.to_string(), "invalid interval at row 4: stop before start");

        let err = SplitterError::invalid("stop before start");
        assert_eq!(err.to_string(), "invalid interval: stop before start");
    }

    #[test]
    fn time_interval_rejects_reversed_bounds() {
        let t0 = gps_epoch();
        let t1 = t0 + TimeDelta::seconds(5);
        assert!(TimeInterval::new(t1, t0).is_err());

        let interval = TimeInterval::new(t0, t1).unwrap();
        assert_eq!(interval.duration(), TimeDelta::seconds(5));
        assert!(interval.contains(t0));
        assert!(!interval.contains(t1));
    }

    #[test]
    fn gps_epoch_is_1990() {
        assert_eq!(gps_epoch().to_rfc3339(), "1990-01-01T00:00:00+00:00");
    }

    #[test]
    fn seconds_to_delta_rounds_to_nanoseconds() {
        assert_eq!(seconds_to_delta(1.5), Some(TimeDelta::milliseconds(1500)));
        assert_eq!(seconds_to_delta(1e-9), Some(TimeDelta::nanoseconds(1)));
        assert_eq!(seconds_to_delta(f64::NAN), None);
        assert_eq!(seconds_to_delta(f64::INFINITY), None);
        assert_eq!(seconds_to_delta(1e30), None);
    }
}
