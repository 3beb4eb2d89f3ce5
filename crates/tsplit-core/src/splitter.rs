//! The interval map and its queries.
//!
//! A [`TimeSplitter`] stores boundary times, each mapped to the destination
//! that applies from that boundary up to the next one:
//!
//! ```text
//! boundaries:  t0        t1        t2        t3
//! map:         0 ------> 1 ------> 0 ------> NO_TARGET
//! ```
//!
//! Time before the first boundary and after the last one belongs to
//! [`Destination::NO_TARGET`]. Neighbouring regions never share a
//! destination, so the last boundary of a non-empty map always opens a
//! `NO_TARGET` region.
//!
//! # Thread Safety
//!
//! Mutation takes `&mut self`; everything else takes `&self`. Once built, a
//! splitter can be shared across threads for lookups and event distribution.
//! The per-destination coverage cache lives in a [`OnceLock`], so concurrent
//! first reads race safely and build it exactly once.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::registry::DestinationRegistry;
use crate::roi::TimeRoi;
use crate::types::{Destination, Result, SplitterError, SplittingInterval};

static EMPTY_ROI: TimeRoi = TimeRoi::new();

/// Maps time to output destinations.
#[derive(Debug, Clone, Default)]
pub struct TimeSplitter {
    roi_map: BTreeMap<DateTime<Utc>, Destination>,
    registry: DestinationRegistry,
    partial_rois: OnceLock<BTreeMap<Destination, TimeRoi>>,
}

impl TimeSplitter {
    /// An empty splitter: every time maps to `NO_TARGET`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A splitter sending `[start, stop)` to `value`.
    pub fn from_interval(
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        value: Destination,
    ) -> Result<Self> {
        let mut splitter = Self::new();
        splitter.add_roi(start, stop, value)?;
        Ok(splitter)
    }

    /// Sets the destination of `[start, stop)` to `value`.
    ///
    /// Existing boundaries inside the interval are replaced; time at and after
    /// `stop` keeps the destination it had before the call. A zero-length
    /// interval is a no-op.
    pub fn add_roi(
        &mut self,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        value: Destination,
    ) -> Result<()> {
        if stop < start {
            return Err(SplitterError::invalid(format!(
                "stop {stop} is before start {start}"
            )));
        }
        if start == stop {
            return Ok(());
        }

        let before = self.value_before(start);
        let after = self.value_at_time(stop);

        let covered: Vec<DateTime<Utc>> = self.roi_map.range(start..=stop).map(|(t, _)| *t).collect();
        for boundary in covered {
            self.roi_map.remove(&boundary);
        }

        if before != value {
            self.roi_map.insert(start, value);
        }
        if after != value {
            self.roi_map.insert(stop, after);
        }

        tracing::trace!(%start, %stop, %value, boundaries = self.roi_map.len(), "added ROI");
        self.invalidate_cache();
        Ok(())
    }

    /// Removes every boundary.
    pub fn clear(&mut self) {
        self.roi_map.clear();
        self.invalidate_cache();
    }

    /// Destination of the region containing `time`.
    #[must_use]
    pub fn value_at_time(&self, time: DateTime<Utc>) -> Destination {
        self.roi_map
            .range(..=time)
            .next_back()
            .map_or(Destination::NO_TARGET, |(_, value)| *value)
    }

    /// Destination of the region ending just before `time`.
    fn value_before(&self, time: DateTime<Utc>) -> Destination {
        self.roi_map
            .range(..time)
            .next_back()
            .map_or(Destination::NO_TARGET, |(_, value)| *value)
    }

    /// True when no time maps to a real destination.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roi_map.values().all(|value| !value.is_target())
    }

    /// Number of stored boundaries.
    #[must_use]
    pub fn num_raw_values(&self) -> usize {
        self.roi_map.len()
    }

    /// The boundary map itself.
    #[must_use]
    pub const fn splitters_map(&self) -> &BTreeMap<DateTime<Utc>, Destination> {
        &self.roi_map
    }

    /// Distinct destinations in use, never including `NO_TARGET`.
    #[must_use]
    pub fn output_workspace_indices(&self) -> BTreeSet<Destination> {
        self.roi_map
            .values()
            .copied()
            .filter(|value| value.is_target())
            .collect()
    }

    /// Smallest non-negative index that is neither mapped nor named.
    #[must_use]
    pub fn next_free_destination(&self) -> Destination {
        let mapped = self.output_workspace_indices();
        let mut candidate = Destination::DEFAULT_TARGET;
        while mapped.contains(&candidate) || self.registry.name_for_index(candidate).is_some() {
            candidate = Destination::new(candidate.index() + 1);
        }
        candidate
    }

    /// All time assigned to `destination`.
    ///
    /// Unknown destinations, and `NO_TARGET`, give an empty region.
    #[must_use]
    pub fn time_roi(&self, destination: Destination) -> &TimeRoi {
        self.partial_rois()
            .get(&destination)
            .unwrap_or(&EMPTY_ROI)
    }

    /// Builds the per-destination coverage cache now rather than on first use.
    pub fn rebuild_cached_partial_time_rois(&mut self) {
        self.invalidate_cache();
        self.partial_rois();
    }

    fn partial_rois(&self) -> &BTreeMap<Destination, TimeRoi> {
        self.partial_rois.get_or_init(|| {
            let mut rois: BTreeMap<Destination, TimeRoi> = BTreeMap::new();
            for (start, stop, value) in self.regions() {
                if value.is_target() {
                    rois.entry(value).or_default().add(start, stop);
                }
            }
            tracing::debug!(destinations = rois.len(), "rebuilt partial time ROIs");
            rois
        })
    }

    fn invalidate_cache(&mut self) {
        self.partial_rois = OnceLock::new();
    }

    /// Consecutive boundary pairs as `(start, stop, destination)`.
    fn regions(&self) -> impl Iterator<Item = (DateTime<Utc>, DateTime<Utc>, Destination)> + '_ {
        self.roi_map
            .iter()
            .zip(self.roi_map.keys().skip(1))
            .map(|((start, value), stop)| (*start, *stop, *value))
    }

    /// The map as explicit intervals in time order.
    ///
    /// With `include_no_target` false the `NO_TARGET` gaps are left out.
    #[must_use]
    pub fn to_splitters(&self, include_no_target: bool) -> Vec<SplittingInterval> {
        self.regions()
            .filter(|(_, _, value)| include_no_target || value.is_target())
            .map(|(start, stop, value)| SplittingInterval::new(start, stop, value))
            .collect()
    }

    /// One `destination|boundary` line per boundary, ascending.
    #[must_use]
    pub fn debug_print(&self) -> String {
        let mut out = String::new();
        for (boundary, value) in &self.roi_map {
            let _ = writeln!(
                out,
                "{value}|{}",
                boundary.to_rfc3339_opts(SecondsFormat::Nanos, true)
            );
        }
        out
    }

    /// Names registered for destinations.
    #[must_use]
    pub const fn registry(&self) -> &DestinationRegistry {
        &self.registry
    }

    /// Associates a name with a destination index.
    pub fn register_name(&mut self, name: impl Into<String>, index: Destination) {
        self.registry.register(name, index);
    }

    /// Output name for `index`; see [`DestinationRegistry::display_name`].
    pub fn workspace_index_name(&self, index: Destination, numerical_shift: i32) -> Result<String> {
        self.registry.display_name(index, numerical_shift)
    }
}
