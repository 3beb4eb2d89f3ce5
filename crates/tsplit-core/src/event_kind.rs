//! Event kind enum as the single source of truth for event kind strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage kinds an [`crate::EventList`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Tof,
    Weighted,
    WeightedNoTime,
}

impl EventKind {
    /// Whether events of this kind carry a pulse time.
    #[must_use]
    pub const fn has_pulse_time(self) -> bool {
        !matches!(self, Self::WeightedNoTime)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tof => "tof",
            Self::Weighted => "weighted",
            Self::WeightedNoTime => "weighted_notime",
        };
        write!(f, "{s}")
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tof" => Ok(Self::Tof),
            "weighted" => Ok(Self::Weighted),
            "weighted_notime" | "weighted_no_time" => Ok(Self::WeightedNoTime),
            _ => Err(UnknownEventKind(s.to_string())),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event kind strings.
#[derive(Debug, Clone)]
pub struct UnknownEventKind(String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind: {}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}
