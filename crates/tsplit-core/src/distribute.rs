//! Event distribution.
//!
//! Routes each event to the partition of the destination its time falls in.
//!
//! # Algorithm Summary
//!
//! 1. Compute the comparison time: the pulse time, or pulse time plus
//!    (optionally corrected) time-of-flight
//! 2. Resolve the destination with a cursor over the splitter boundaries
//! 3. Append the event to that destination's partition, or drop it when the
//!    destination is `NO_TARGET` or has no partition
//!
//! The cursor walks forward while comparison times are non-decreasing, which
//! makes time-ordered input O(N + M). When time goes backwards, or jumps over
//! many boundaries, it re-seats itself with a binary search, so any input
//! stays O(N log M).

use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::iter::Peekable;
use std::ops::{Add, AddAssign, Bound};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::{EventList, TimedEvent};
use crate::splitter::TimeSplitter;
use crate::types::{Destination, Result, SplitterError, seconds_to_delta};

/// Boundaries the cursor steps over one by one before it binary searches instead.
const MAX_LINEAR_STEPS: usize = 16;

/// Which time of an event is compared against the splitter boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    /// The pulse time alone.
    #[default]
    Pulse,
    /// Pulse time plus time-of-flight.
    PulseTof,
}

/// Linear time-of-flight correction `tof * factor + shift`.
///
/// `shift` is in microseconds, like the time-of-flight itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TofCorrection {
    pub factor: f64,
    pub shift: f64,
}

impl TofCorrection {
    #[must_use]
    pub const fn new(factor: f64, shift: f64) -> Self {
        Self { factor, shift }
    }

    #[must_use]
    pub fn apply(&self, tof: f64) -> f64 {
        tof.mul_add(self.factor, self.shift)
    }
}

impl Default for TofCorrection {
    fn default() -> Self {
        Self {
            factor: 1.0,
            shift: 0.0,
        }
    }
}

/// What to do with an event whose destination has no partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPartitionPolicy {
    /// Drop the event and count it.
    #[default]
    Drop,
    /// Stop with [`SplitterError::DestinationMismatch`]. Events routed before
    /// the failure stay in their partitions.
    Fail,
}

/// Options controlling event distribution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    pub time_mode: TimeMode,
    /// Only used in [`TimeMode::PulseTof`].
    pub tof_correction: Option<TofCorrection>,
    pub missing_partition: MissingPartitionPolicy,
}

impl SplitOptions {
    /// Compare pulse times.
    #[must_use]
    pub fn pulse_time() -> Self {
        Self::default()
    }

    /// Compare pulse time plus uncorrected time-of-flight.
    #[must_use]
    pub fn pulse_tof() -> Self {
        Self {
            time_mode: TimeMode::PulseTof,
            ..Self::default()
        }
    }

    /// Compare pulse time plus `tof * factor + shift`.
    #[must_use]
    pub fn pulse_tof_corrected(factor: f64, shift: f64) -> Self {
        Self {
            time_mode: TimeMode::PulseTof,
            tof_correction: Some(TofCorrection::new(factor, shift)),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn fail_on_missing_partition(mut self) -> Self {
        self.missing_partition = MissingPartitionPolicy::Fail;
        self
    }

    /// The time compared against splitter boundaries.
    ///
    /// Returns `None` when pulse time plus time-of-flight is not representable.
    #[must_use]
    pub fn comparison_time(&self, pulse_time: DateTime<Utc>, tof: f64) -> Option<DateTime<Utc>> {
        match self.time_mode {
            TimeMode::Pulse => Some(pulse_time),
            TimeMode::PulseTof => {
                let tof = self.tof_correction.map_or(tof, |c| c.apply(tof));
                let delta = seconds_to_delta(tof * 1e-6)?;
                pulse_time.checked_add_signed(delta)
            }
        }
    }
}

/// Per-destination output containers.
pub trait Partitions<E> {
    /// The container for `destination`, if there is one.
    fn partition_mut(&mut self, destination: Destination) -> Option<&mut Vec<E>>;
}

impl<E> Partitions<E> for BTreeMap<Destination, Vec<E>> {
    fn partition_mut(&mut self, destination: Destination) -> Option<&mut Vec<E>> {
        self.get_mut(&destination)
    }
}

impl<E, S: BuildHasher> Partitions<E> for HashMap<Destination, Vec<E>, S> {
    fn partition_mut(&mut self, destination: Destination) -> Option<&mut Vec<E>> {
        self.get_mut(&destination)
    }
}

impl<E> Partitions<E> for BTreeMap<Destination, &mut Vec<E>> {
    fn partition_mut(&mut self, destination: Destination) -> Option<&mut Vec<E>> {
        self.get_mut(&destination).map(|events| &mut **events)
    }
}

/// Counts from one distribution call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitStats {
    /// Events appended to a partition.
    pub routed: usize,
    /// Events whose time maps to `NO_TARGET`.
    pub dropped_no_target: usize,
    /// Events whose destination has no partition.
    pub dropped_unmapped: usize,
}

impl SplitStats {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.routed + self.dropped_no_target + self.dropped_unmapped
    }
}

impl Add for SplitStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            routed: self.routed + rhs.routed,
            dropped_no_target: self.dropped_no_target + rhs.dropped_no_target,
            dropped_unmapped: self.dropped_unmapped + rhs.dropped_unmapped,
        }
    }
}

impl AddAssign for SplitStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

type BoundaryIter<'a> = Peekable<btree_map::Range<'a, DateTime<Utc>, Destination>>;

/// Resolves a sequence of times against the boundary map.
struct Cursor<'a> {
    map: &'a BTreeMap<DateTime<Utc>, Destination>,
    upcoming: BoundaryIter<'a>,
    current: Destination,
    last: Option<DateTime<Utc>>,
}

impl<'a> Cursor<'a> {
    fn new(map: &'a BTreeMap<DateTime<Utc>, Destination>) -> Self {
        Self {
            map,
            upcoming: map.range::<DateTime<Utc>, _>(..).peekable(),
            current: Destination::NO_TARGET,
            last: None,
        }
    }

    fn resolve(&mut self, time: DateTime<Utc>) -> Destination {
        if self.last.is_some_and(|last| time < last) || !self.step_to(time) {
            self.seek(time);
        }
        self.last = Some(time);
        self.current
    }

    /// Walks forward to `time`; false if that takes too many steps.
    fn step_to(&mut self, time: DateTime<Utc>) -> bool {
        for _ in 0..MAX_LINEAR_STEPS {
            match self.upcoming.peek() {
                Some(&(&boundary, &value)) if boundary <= time => {
                    self.current = value;
                    self.upcoming.next();
                }
                _ => return true,
            }
        }
        self.upcoming.peek().is_none_or(|&(&boundary, _)| boundary > time)
    }

    fn seek(&mut self, time: DateTime<Utc>) {
        self.current = self
            .map
            .range(..=time)
            .next_back()
            .map_or(Destination::NO_TARGET, |(_, value)| *value);
        self.upcoming = self
            .map
            .range((Bound::Excluded(time), Bound::Unbounded))
            .peekable();
    }
}

impl TimeSplitter {
    /// Appends each event to the partition of its destination.
    ///
    /// Relative order within each partition follows the input order.
    pub fn split_events<E, P>(
        &self,
        events: &[E],
        partitions: &mut P,
        options: &SplitOptions,
    ) -> Result<SplitStats>
    where
        E: TimedEvent + Clone,
        P: Partitions<E> + ?Sized,
    {
        let mut stats = SplitStats::default();
        let mut cursor = Cursor::new(self.splitters_map());

        for event in events {
            let pulse_time = event.pulse_time().ok_or(SplitterError::MissingPulseTime)?;
            let destination = options
                .comparison_time(pulse_time, event.tof())
                .map_or(Destination::NO_TARGET, |time| cursor.resolve(time));

            if !destination.is_target() {
                stats.dropped_no_target += 1;
                continue;
            }
            match partitions.partition_mut(destination) {
                Some(partition) => {
                    partition.push(event.clone());
                    stats.routed += 1;
                }
                None => match options.missing_partition {
                    MissingPartitionPolicy::Drop => stats.dropped_unmapped += 1,
                    MissingPartitionPolicy::Fail => {
                        return Err(SplitterError::DestinationMismatch { destination });
                    }
                },
            }
        }

        tracing::trace!(
            events = events.len(),
            routed = stats.routed,
            dropped_no_target = stats.dropped_no_target,
            dropped_unmapped = stats.dropped_unmapped,
            "split events"
        );
        Ok(stats)
    }

    /// Splits a typed event list into typed partitions.
    ///
    /// Empty partitions of another kind are switched to the input's kind;
    /// non-empty ones are an error.
    pub fn split_event_list(
        &self,
        events: &EventList,
        partitions: &mut BTreeMap<Destination, EventList>,
        options: &SplitOptions,
    ) -> Result<SplitStats> {
        let kind = events.kind();
        if !kind.has_pulse_time() {
            return Err(SplitterError::MissingPulseTime);
        }
        if let Some((destination, partition)) = partitions
            .iter()
            .find(|(_, partition)| partition.kind() != kind && !partition.is_empty())
        {
            return Err(SplitterError::EventKindMismatch {
                destination: *destination,
                expected: kind,
                found: partition.kind(),
            });
        }
        for partition in partitions.values_mut() {
            if partition.kind() != kind {
                *partition = EventList::empty(kind);
            }
        }

        match events {
            EventList::Tof(input) => {
                let mut sinks = typed_partitions(partitions, EventList::tof_events_mut);
                self.split_events(input, &mut sinks, options)
            }
            EventList::Weighted(input) => {
                let mut sinks = typed_partitions(partitions, EventList::weighted_events_mut);
                self.split_events(input, &mut sinks, options)
            }
            EventList::WeightedNoTime(_) => Err(SplitterError::MissingPulseTime),
        }
    }

    /// Splits independent event sequences (e.g. one per spectrum) in parallel.
    ///
    /// Each result holds a partition for every output destination, so no event
    /// is dropped for lack of a partition.
    pub fn split_spectra<E>(
        &self,
        spectra: &[Vec<E>],
        options: &SplitOptions,
    ) -> Result<Vec<BTreeMap<Destination, Vec<E>>>>
    where
        E: TimedEvent + Clone + Send + Sync,
    {
        let destinations = self.output_workspace_indices();
        let results = spectra
            .par_iter()
            .map(|events| {
                let mut partitions: BTreeMap<Destination, Vec<E>> =
                    destinations.iter().map(|d| (*d, Vec::new())).collect();
                let stats = self.split_events(events, &mut partitions, options)?;
                Ok((partitions, stats))
            })
            .collect::<Result<Vec<_>>>()?;

        let (partitions, stats) = unzip_with_totals(results);
        tracing::debug!(
            spectra = spectra.len(),
            routed = stats.routed,
            dropped = stats.dropped_no_target + stats.dropped_unmapped,
            "split spectra"
        );
        Ok(partitions)
    }

    /// Parallel [`Self::split_event_list`] over many lists.
    pub fn split_event_lists(
        &self,
        lists: &[EventList],
        options: &SplitOptions,
    ) -> Result<Vec<BTreeMap<Destination, EventList>>> {
        let destinations = self.output_workspace_indices();
        let results = lists
            .par_iter()
            .map(|events| {
                let mut partitions: BTreeMap<Destination, EventList> = destinations
                    .iter()
                    .map(|d| (*d, EventList::empty(events.kind())))
                    .collect();
                let stats = self.split_event_list(events, &mut partitions, options)?;
                Ok((partitions, stats))
            })
            .collect::<Result<Vec<_>>>()?;

        let (partitions, stats) = unzip_with_totals(results);
        tracing::debug!(
            lists = lists.len(),
            routed = stats.routed,
            dropped = stats.dropped_no_target + stats.dropped_unmapped,
            "split event lists"
        );
        Ok(partitions)
    }
}

fn typed_partitions<'a, E>(
    partitions: &'a mut BTreeMap<Destination, EventList>,
    extract: fn(&mut EventList) -> Option<&mut Vec<E>>,
) -> BTreeMap<Destination, &'a mut Vec<E>> {
    partitions
        .iter_mut()
        .filter_map(|(destination, list)| extract(list).map(|events| (*destination, events)))
        .collect()
}

fn unzip_with_totals<T>(results: Vec<(T, SplitStats)>) -> (Vec<T>, SplitStats) {
    let mut totals = SplitStats::default();
    let items = results
        .into_iter()
        .map(|(item, stats)| {
            totals += stats;
            item
        })
        .collect();
    (items, totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    use crate::events::{TofEvent, WeightedEvent, WeightedEventNoTime};
    use crate::event_kind::EventKind;

    fn t(seconds: i64) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH + TimeDelta::seconds(seconds)
    }

    fn d(index: i32) -> Destination {
        Destination::new(index)
    }

    fn event(pulse_seconds: i64, tof: f64) -> TofEvent {
        TofEvent::new(tof, t(pulse_seconds))
    }

    fn two_way_splitter() -> TimeSplitter {
        let mut splitter = TimeSplitter::new();
        splitter.add_roi(t(0), t(20), d(0)).unwrap();
        splitter.add_roi(t(20), t(40), d(1)).unwrap();
        splitter
    }

    fn empty_partitions(destinations: &[i32]) -> BTreeMap<Destination, Vec<TofEvent>> {
        destinations.iter().map(|i| (d(*i), Vec::new())).collect()
    }

    fn tofs(events: &[TofEvent]) -> Vec<f64> {
        events.iter().map(|e| e.tof).collect()
    }

    #[test]
    fn pulse_times_route_to_matching_partitions() {
        let splitter = two_way_splitter();
        let events = vec![event(5, 1.0), event(15, 2.0), event(25, 3.0), event(35, 4.0)];
        let mut partitions = empty_partitions(&[0, 1]);

        let stats = splitter
            .split_events(&events, &mut partitions, &SplitOptions::pulse_time())
            .unwrap();

        assert_eq!(tofs(&partitions[&d(0)]), vec![1.0, 2.0]);
        assert_eq!(tofs(&partitions[&d(1)]), vec![3.0, 4.0]);
        assert_eq!(stats.routed, 4);
        assert_eq!(stats.total(), 4);
    }

    #[test]
    fn no_target_time_is_dropped() {
        let splitter = two_way_splitter();
        let events = vec![event(-5, 1.0), event(10, 2.0), event(40, 3.0), event(100, 4.0)];
        let mut partitions = empty_partitions(&[0, 1]);

        let stats = splitter
            .split_events(&events, &mut partitions, &SplitOptions::pulse_time())
            .unwrap();

        assert_eq!(stats.routed, 1);
        assert_eq!(stats.dropped_no_target, 3);
        assert!(partitions[&d(1)].is_empty());
    }

    #[test]
    fn unsorted_input_keeps_input_order_per_partition() {
        let splitter = two_way_splitter();
        let events = vec![
            event(35, 1.0),
            event(5, 2.0),
            event(25, 3.0),
            event(15, 4.0),
            event(0, 5.0),
        ];
        let mut partitions = empty_partitions(&[0, 1]);

        splitter
            .split_events(&events, &mut partitions, &SplitOptions::pulse_time())
            .unwrap();

        assert_eq!(tofs(&partitions[&d(0)]), vec![2.0, 4.0, 5.0]);
        assert_eq!(tofs(&partitions[&d(1)]), vec![1.0, 3.0]);
    }

    #[test]
    fn sorted_and_shuffled_input_agree() {
        let mut splitter = TimeSplitter::new();
        for i in 0..100 {
            splitter.add_roi(t(i * 10), t(i * 10 + 5), d(i32::try_from(i % 3).unwrap())).unwrap();
        }
        let sorted: Vec<TofEvent> = (0..1000).map(|i| event(i, 0.0)).collect();
        let mut shuffled = sorted.clone();
        shuffled.reverse();
        shuffled.swap(10, 500);

        let mut from_sorted = empty_partitions(&[0, 1, 2]);
        let mut from_shuffled = empty_partitions(&[0, 1, 2]);
        let options = SplitOptions::pulse_time();
        let a = splitter.split_events(&sorted, &mut from_sorted, &options).unwrap();
        let b = splitter.split_events(&shuffled, &mut from_shuffled, &options).unwrap();

        assert_eq!(a, b);
        for partition in from_shuffled.values_mut() {
            partition.sort_by_key(|e| e.pulse_time);
        }
        assert_eq!(from_sorted, from_shuffled);
        for (event, index) in sorted.iter().zip(0..) {
            let expected = splitter.value_at_time(event.pulse_time);
            if expected.is_target() {
                assert!(from_sorted[&expected].contains(event), "event {index} misrouted");
            }
        }
    }

    #[test]
    fn pulse_tof_mode_adds_time_of_flight() {
        let splitter = two_way_splitter();
        // 19 s pulse + 2 s (2e6 µs) tof lands in destination 1.
        let events = vec![event(19, 2_000_000.0)];

        let mut by_pulse = empty_partitions(&[0, 1]);
        splitter
            .split_events(&events, &mut by_pulse, &SplitOptions::pulse_time())
            .unwrap();
        assert_eq!(by_pulse[&d(0)].len(), 1);

        let mut by_tof = empty_partitions(&[0, 1]);
        splitter
            .split_events(&events, &mut by_tof, &SplitOptions::pulse_tof())
            .unwrap();
        assert_eq!(by_tof[&d(1)].len(), 1);
    }

    #[test]
    fn tof_correction_is_applied_before_adding() {
        let splitter = two_way_splitter();
        let events = vec![event(19, 2_000_000.0)];

        // 2e6 µs * 0.25 + 0 = 0.5 s -> still destination 0.
        let mut scaled = empty_partitions(&[0, 1]);
        splitter
            .split_events(&events, &mut scaled, &SplitOptions::pulse_tof_corrected(0.25, 0.0))
            .unwrap();
        assert_eq!(scaled[&d(0)].len(), 1);

        // 2e6 µs * 0.25 + 1e6 µs = 1.5 s -> 20.5 s, destination 1.
        let mut shifted = empty_partitions(&[0, 1]);
        splitter
            .split_events(
                &events,
                &mut shifted,
                &SplitOptions::pulse_tof_corrected(0.25, 1_000_000.0),
            )
            .unwrap();
        assert_eq!(shifted[&d(1)].len(), 1);
    }

    #[test]
    fn correction_is_ignored_in_pulse_mode() {
        let options = SplitOptions {
            time_mode: TimeMode::Pulse,
            tof_correction: Some(TofCorrection::new(10.0, 10.0)),
            missing_partition: MissingPartitionPolicy::Drop,
        };
        assert_eq!(options.comparison_time(t(3), 500.0), Some(t(3)));
    }

    #[test]
    fn comparison_time_has_nanosecond_resolution() {
        let options = SplitOptions::pulse_tof();
        let expected = t(3) + TimeDelta::nanoseconds(1_500);
        assert_eq!(options.comparison_time(t(3), 1.5), Some(expected));
        assert_eq!(options.comparison_time(t(3), f64::NAN), None);
    }

    #[test]
    fn missing_partition_is_dropped_by_default() {
        let splitter = two_way_splitter();
        let events = vec![event(5, 1.0), event(25, 2.0)];
        let mut partitions = empty_partitions(&[0]);

        let stats = splitter
            .split_events(&events, &mut partitions, &SplitOptions::pulse_time())
            .unwrap();

        assert_eq!(stats.routed, 1);
        assert_eq!(stats.dropped_unmapped, 1);
    }

    #[test]
    fn missing_partition_can_fail_fast() {
        let splitter = two_way_splitter();
        let events = vec![event(5, 1.0), event(25, 2.0), event(6, 3.0)];
        let mut partitions = empty_partitions(&[0]);

        let err = splitter
            .split_events(
                &events,
                &mut partitions,
                &SplitOptions::pulse_time().fail_on_missing_partition(),
            )
            .unwrap_err();

        assert_eq!(err, SplitterError::DestinationMismatch { destination: d(1) });
        assert_eq!(tofs(&partitions[&d(0)]), vec![1.0]);
    }

    #[test]
    fn empty_splitter_routes_nothing() {
        let splitter = TimeSplitter::new();
        let events = vec![event(5, 1.0)];
        let mut partitions = empty_partitions(&[0]);
        let stats = splitter
            .split_events(&events, &mut partitions, &SplitOptions::pulse_time())
            .unwrap();
        assert_eq!(stats.dropped_no_target, 1);
    }

    #[test]
    fn events_without_pulse_time_are_rejected() {
        let splitter = two_way_splitter();
        let events = vec![WeightedEventNoTime {
            tof: 1.0,
            weight: 1.0,
            error_squared: 1.0,
        }];
        let mut partitions: BTreeMap<Destination, Vec<WeightedEventNoTime>> = BTreeMap::new();
        let err = splitter
            .split_events(&events, &mut partitions, &SplitOptions::pulse_time())
            .unwrap_err();
        assert_eq!(err, SplitterError::MissingPulseTime);

        let list = EventList::WeightedNoTime(events);
        let mut lists = BTreeMap::new();
        let err = splitter
            .split_event_list(&list, &mut lists, &SplitOptions::pulse_time())
            .unwrap_err();
        assert_eq!(err, SplitterError::MissingPulseTime);
    }

    #[test]
    fn hash_map_partitions_work() {
        let splitter = two_way_splitter();
        let events = vec![event(5, 1.0), event(25, 2.0)];
        let mut partitions: HashMap<Destination, Vec<TofEvent>> =
            [(d(0), Vec::new()), (d(1), Vec::new())].into_iter().collect();
        splitter
            .split_events(&events, &mut partitions, &SplitOptions::pulse_time())
            .unwrap();
        assert_eq!(partitions[&d(1)].len(), 1);
    }

    #[test]
    fn event_list_switches_empty_partitions_to_input_kind() {
        let splitter = two_way_splitter();
        let input = EventList::Weighted(vec![
            WeightedEvent::new(1.0, t(5), 2.0, 4.0),
            WeightedEvent::new(2.0, t(25), 3.0, 9.0),
        ]);
        let mut partitions: BTreeMap<Destination, EventList> = [
            (d(0), EventList::empty(EventKind::Tof)),
            (d(1), EventList::empty(EventKind::Weighted)),
        ]
        .into_iter()
        .collect();

        let stats = splitter
            .split_event_list(&input, &mut partitions, &SplitOptions::pulse_time())
            .unwrap();

        assert_eq!(stats.routed, 2);
        assert_eq!(partitions[&d(0)].kind(), EventKind::Weighted);
        assert_eq!(
            partitions[&d(1)],
            EventList::Weighted(vec![WeightedEvent::new(2.0, t(25), 3.0, 9.0)])
        );
    }

    #[test]
    fn event_list_rejects_non_empty_partition_of_other_kind() {
        let splitter = two_way_splitter();
        let input = EventList::Tof(vec![event(5, 1.0)]);
        let mut partitions: BTreeMap<Destination, EventList> = [(
            d(0),
            EventList::Weighted(vec![WeightedEvent::new(1.0, t(1), 1.0, 1.0)]),
        )]
        .into_iter()
        .collect();

        let err = splitter
            .split_event_list(&input, &mut partitions, &SplitOptions::pulse_time())
            .unwrap_err();
        assert_eq!(
            err,
            SplitterError::EventKindMismatch {
                destination: d(0),
                expected: EventKind::Tof,
                found: EventKind::Weighted,
            }
        );
    }

    #[test]
    fn kind_mismatch_leaves_every_partition_unchanged() {
        let splitter = two_way_splitter();
        let input = EventList::Tof(vec![event(5, 1.0)]);
        let mut partitions: BTreeMap<Destination, EventList> = [
            (d(0), EventList::empty(EventKind::Weighted)),
            (
                d(1),
                EventList::Weighted(vec![WeightedEvent::new(1.0, t(25), 1.0, 1.0)]),
            ),
        ]
        .into_iter()
        .collect();
        let before = partitions.clone();

        let err = splitter
            .split_event_list(&input, &mut partitions, &SplitOptions::pulse_time())
            .unwrap_err();

        assert!(matches!(
            err,
            SplitterError::EventKindMismatch { destination, .. } if destination == d(1)
        ));
        assert_eq!(partitions, before);
    }

    #[test]
    fn spectra_split_in_parallel() {
        let splitter = two_way_splitter();
        let spectra: Vec<Vec<TofEvent>> = (0..8)
            .map(|s| (0..40).map(|p| event(p, f64::from(s))).collect())
            .collect();

        let results = splitter
            .split_spectra(&spectra, &SplitOptions::pulse_time())
            .unwrap();

        assert_eq!(results.len(), 8);
        for (spectrum, partitions) in results.iter().enumerate() {
            assert_eq!(partitions.len(), 2);
            assert_eq!(partitions[&d(0)].len(), 20);
            assert_eq!(partitions[&d(1)].len(), 20);
            let spectrum = f64::from(u8::try_from(spectrum).unwrap());
            assert!(partitions[&d(0)].iter().all(|e| (e.tof - spectrum).abs() < f64::EPSILON));
        }
    }

    #[test]
    fn event_lists_split_in_parallel() {
        let splitter = two_way_splitter();
        let lists = vec![
            EventList::Tof(vec![event(5, 1.0), event(25, 2.0)]),
            EventList::Weighted(vec![WeightedEvent::new(3.0, t(35), 1.0, 1.0)]),
        ];

        let results = splitter
            .split_event_lists(&lists, &SplitOptions::pulse_time())
            .unwrap();

        assert_eq!(results[0][&d(0)].len(), 1);
        assert_eq!(results[0][&d(1)].len(), 1);
        assert!(results[1][&d(0)].is_empty());
        assert_eq!(results[1][&d(1)].kind(), EventKind::Weighted);
        assert_eq!(results[1][&d(1)].len(), 1);
    }

    #[test]
    fn stats_add_up() {
        let a = SplitStats {
            routed: 1,
            dropped_no_target: 2,
            dropped_unmapped: 3,
        };
        let mut b = a;
        b += a;
        assert_eq!(b.total(), 12);
        assert_eq!(b, a + a);
    }
}
