//! Detector event records as handed over by the acquisition layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_kind::EventKind;

/// An event that can be placed on the time axis.
///
/// This trait lets the distributor work with the built-in records as well as
/// caller-defined ones (e.g. test fixtures or compressed representations).
pub trait TimedEvent {
    /// Returns the pulse time, or `None` when the record carries none.
    fn pulse_time(&self) -> Option<DateTime<Utc>>;

    /// Returns the time-of-flight offset in microseconds.
    fn tof(&self) -> f64;
}

/// A neutron event with time-of-flight and pulse time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TofEvent {
    /// Time of flight in microseconds.
    pub tof: f64,
    /// Time of the source pulse that produced the event.
    pub pulse_time: DateTime<Utc>,
}

impl TofEvent {
    #[must_use]
    pub const fn new(tof: f64, pulse_time: DateTime<Utc>) -> Self {
        Self { tof, pulse_time }
    }
}

impl TimedEvent for TofEvent {
    fn pulse_time(&self) -> Option<DateTime<Utc>> {
        Some(self.pulse_time)
    }

    fn tof(&self) -> f64 {
        self.tof
    }
}

/// A [`TofEvent`] carrying a weight and squared error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedEvent {
    pub tof: f64,
    pub pulse_time: DateTime<Utc>,
    pub weight: f32,
    pub error_squared: f32,
}

impl WeightedEvent {
    #[must_use]
    pub const fn new(tof: f64, pulse_time: DateTime<Utc>, weight: f32, error_squared: f32) -> Self {
        Self {
            tof,
            pulse_time,
            weight,
            error_squared,
        }
    }
}

impl From<TofEvent> for WeightedEvent {
    fn from(event: TofEvent) -> Self {
        Self::new(event.tof, event.pulse_time, 1.0, 1.0)
    }
}

impl TimedEvent for WeightedEvent {
    fn pulse_time(&self) -> Option<DateTime<Utc>> {
        Some(self.pulse_time)
    }

    fn tof(&self) -> f64 {
        self.tof
    }
}

/// A weighted event whose pulse time has been discarded.
///
/// These cannot be split by time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedEventNoTime {
    pub tof: f64,
    pub weight: f32,
    pub error_squared: f32,
}

impl TimedEvent for WeightedEventNoTime {
    fn pulse_time(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn tof(&self) -> f64 {
        self.tof
    }
}

/// A homogeneous list of events for one spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "events", rename_all = "snake_case")]
pub enum EventList {
    Tof(Vec<TofEvent>),
    Weighted(Vec<WeightedEvent>),
    #[serde(rename = "weighted_notime")]
    WeightedNoTime(Vec<WeightedEventNoTime>),
}

impl Default for EventList {
    fn default() -> Self {
        Self::Tof(Vec::new())
    }
}

impl EventList {
    /// An empty list holding events of `kind`.
    #[must_use]
    pub const fn empty(kind: EventKind) -> Self {
        match kind {
            EventKind::Tof => Self::Tof(Vec::new()),
            EventKind::Weighted => Self::Weighted(Vec::new()),
            EventKind::WeightedNoTime => Self::WeightedNoTime(Vec::new()),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Tof(_) => EventKind::Tof,
            Self::Weighted(_) => EventKind::Weighted,
            Self::WeightedNoTime(_) => EventKind::WeightedNoTime,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Tof(events) => events.len(),
            Self::Weighted(events) => events.len(),
            Self::WeightedNoTime(events) => events.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time-of-flight values in list order.
    #[must_use]
    pub fn tofs(&self) -> Vec<f64> {
        match self {
            Self::Tof(events) => events.iter().map(TimedEvent::tof).collect(),
            Self::Weighted(events) => events.iter().map(TimedEvent::tof).collect(),
            Self::WeightedNoTime(events) => events.iter().map(TimedEvent::tof).collect(),
        }
    }

    /// Pulse times in list order; empty for lists without time information.
    #[must_use]
    pub fn pulse_times(&self) -> Vec<DateTime<Utc>> {
        match self {
            Self::Tof(events) => events.iter().map(|e| e.pulse_time).collect(),
            Self::Weighted(events) => events.iter().map(|e| e.pulse_time).collect(),
            Self::WeightedNoTime(_) => Vec::new(),
        }
    }

    pub(crate) fn tof_events_mut(&mut self) -> Option<&mut Vec<TofEvent>> {
        match self {
            Self::Tof(events) => Some(events),
            _ => None,
        }
    }

    pub(crate) fn weighted_events_mut(&mut self) -> Option<&mut Vec<WeightedEvent>> {
        match self {
            Self::Weighted(events) => Some(events),
            _ => None,
        }
    }
}
