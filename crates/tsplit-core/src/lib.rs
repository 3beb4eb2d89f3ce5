//! Core logic for splitting event data by time.
//!
//! This crate contains:
//! - `TimeSplitter`: a piecewise-constant map from time to destination index
//! - Builders that turn tables, bitmaps and histograms into splitters
//! - Distribution of events and event lists into per-destination partitions
//! - Per-destination time coverage (`TimeRoi`) and name registry

mod builder;
pub mod config;
mod distribute;
pub mod event_kind;
pub mod events;
mod registry;
mod roi;
mod splitter;
pub mod types;

pub use builder::{
    BitmapRow, BitmapSource, HistogramSource, RowTime, SplitterSource, TableRow, TableSource,
    TargetRef,
};
pub use config::SplitterConfig;
pub use distribute::{
    MissingPartitionPolicy, Partitions, SplitOptions, SplitStats, TimeMode, TofCorrection,
};
pub use event_kind::{EventKind, UnknownEventKind};
pub use events::{EventList, TimedEvent, TofEvent, WeightedEvent, WeightedEventNoTime};
pub use registry::DestinationRegistry;
pub use roi::TimeRoi;
pub use splitter::TimeSplitter;
pub use types::{
    Destination, Result, SplitterError, SplittingInterval, TimeInterval, gps_epoch,
    seconds_to_delta,
};
