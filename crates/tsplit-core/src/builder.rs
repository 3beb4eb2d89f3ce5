//! Building a splitter from the sources the acquisition layer hands over.
//!
//! Every source reduces to a sequence of [`TimeSplitter::add_roi`] calls
//! applied in source order, so later rows win where intervals overlap.
//! [`TimeSplitter::apply_source`] is atomic: if any row is rejected the
//! splitter is left exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::splitter::TimeSplitter;
use crate::types::{
    Destination, Result, SplitterError, SplittingInterval, gps_epoch, seconds_to_delta,
};

/// A description of splitter intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "definition", rename_all = "snake_case")]
pub enum SplitterSource {
    /// One explicit interval.
    Direct {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        #[serde(default = "default_target")]
        value: Destination,
    },
    /// Ordered rows of start, stop and target.
    Table(TableSource),
    /// One row per destination over a shared time axis.
    Bitmap(BitmapSource),
    /// A single spectrum whose bins carry destination indices.
    Histogram(HistogramSource),
    /// Already-resolved intervals, applied as-is.
    Splitters(Vec<SplittingInterval>),
}

const fn default_target() -> Destination {
    Destination::DEFAULT_TARGET
}

const fn default_allow_new_names() -> bool {
    true
}

impl SplitterSource {
    /// Short name used in logs.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Table(_) => "table",
            Self::Bitmap(_) => "bitmap",
            Self::Histogram(_) => "histogram",
            Self::Splitters(_) => "splitters",
        }
    }
}

/// A row time: relative seconds from the table offset, or an absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowTime {
    Relative(f64),
    Absolute(DateTime<Utc>),
}

/// A row target: a destination index, or a name looked up in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetRef {
    Index(Destination),
    Name(String),
}

/// One row of a [`TableSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub start: RowTime,
    pub stop: RowTime,
    pub target: TargetRef,
}

impl TableRow {
    /// A row in seconds relative to the table offset, targeting a name.
    pub fn relative(start: f64, stop: f64, target: impl Into<String>) -> Self {
        Self {
            start: RowTime::Relative(start),
            stop: RowTime::Relative(stop),
            target: TargetRef::Name(target.into()),
        }
    }
}

/// Tabular splitter definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSource {
    pub rows: Vec<TableRow>,
    /// Anchor for relative row times.
    #[serde(default = "gps_epoch")]
    pub offset: DateTime<Utc>,
    /// Whether unknown, non-numeric target names get a fresh index.
    #[serde(default = "default_allow_new_names")]
    pub allow_new_names: bool,
}

impl TableSource {
    #[must_use]
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self {
            rows,
            offset: gps_epoch(),
            allow_new_names: true,
        }
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: DateTime<Utc>) -> Self {
        self.offset = offset;
        self
    }

    /// Only accept target names that are registered or numeric.
    #[must_use]
    pub const fn strict_names(mut self) -> Self {
        self.allow_new_names = false;
        self
    }
}

/// One destination row of a [`BitmapSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitmapRow {
    /// Destination name; defaults to the row index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// One value per bin; zero means the bin is not part of this destination.
    pub cells: Vec<f64>,
}

/// Matrix-style splitter definition: row `r` is destination `r`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitmapSource {
    /// Bin edges in seconds relative to `offset`, shared by every row.
    pub bin_edges: Vec<f64>,
    pub rows: Vec<BitmapRow>,
    #[serde(default = "gps_epoch")]
    pub offset: DateTime<Utc>,
}

/// Single-spectrum splitter definition: bin `i` goes to `targets[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSource {
    /// Bin edges in seconds relative to `offset`.
    pub bin_edges: Vec<f64>,
    pub targets: Vec<Destination>,
    #[serde(default = "gps_epoch")]
    pub offset: DateTime<Utc>,
}

impl TimeSplitter {
    /// Builds a splitter from a single source.
    pub fn from_source(source: &SplitterSource) -> Result<Self> {
        let mut splitter = Self::new();
        splitter.apply_source(source)?;
        Ok(splitter)
    }

    /// Applies `source` on top of the current intervals.
    ///
    /// On error nothing is changed: intervals and names are staged on a copy
    /// and only committed once every row has been accepted.
    pub fn apply_source(&mut self, source: &SplitterSource) -> Result<()> {
        let mut staged = self.clone();
        match source {
            SplitterSource::Direct { start, stop, value } => staged.add_roi(*start, *stop, *value)?,
            SplitterSource::Table(table) => staged.apply_table(table)?,
            SplitterSource::Bitmap(bitmap) => staged.apply_bitmap(bitmap)?,
            SplitterSource::Histogram(histogram) => staged.apply_histogram(histogram)?,
            SplitterSource::Splitters(splitters) => staged.apply_splitters(splitters)?,
        }
        tracing::debug!(
            source = source.kind_name(),
            boundaries = staged.num_raw_values(),
            destinations = staged.output_workspace_indices().len(),
            "applied splitter source"
        );
        *self = staged;
        Ok(())
    }

    fn apply_table(&mut self, table: &TableSource) -> Result<()> {
        for (row, entry) in table.rows.iter().enumerate() {
            let start = resolve_time(entry.start, table.offset)
                .map_err(|reason| SplitterError::invalid_row(row, format!("start {reason}")))?;
            let stop = resolve_time(entry.stop, table.offset)
                .map_err(|reason| SplitterError::invalid_row(row, format!("stop {reason}")))?;
            if stop < start {
                return Err(SplitterError::invalid_row(
                    row,
                    format!("stop {stop} is before start {start}"),
                ));
            }
            let target = self
                .resolve_target(&entry.target, table.allow_new_names)
                .map_err(|reason| SplitterError::invalid_row(row, reason))?;
            self.add_roi(start, stop, target).map_err(|e| at_row(e, row))?;
        }
        Ok(())
    }

    fn resolve_target(
        &mut self,
        target: &TargetRef,
        allow_new_names: bool,
    ) -> Result<Destination, String> {
        let (name, index) = match target {
            TargetRef::Index(index) => (index.to_string(), *index),
            TargetRef::Name(name) => {
                if let Some(index) = self.registry().index_for_name(name) {
                    return Ok(index);
                }
                if let Ok(index) = name.parse::<Destination>() {
                    if let Some(owner) = self.registry().name_for_index(index) {
                        return Err(format!(
                            "destination {index} already belongs to {owner:?}, not {name:?}"
                        ));
                    }
                    (name.clone(), index)
                } else if allow_new_names {
                    (name.clone(), self.next_free_destination())
                } else {
                    return Err(format!("unknown destination name {name:?}"));
                }
            }
        };
        self.register_if_unnamed(name, index);
        Ok(index)
    }

    fn register_if_unnamed(&mut self, name: String, index: Destination) {
        if index.is_target() && self.registry().name_for_index(index).is_none() {
            self.register_name(name, index);
        }
    }

    fn apply_bitmap(&mut self, bitmap: &BitmapSource) -> Result<()> {
        let edges = resolve_edges(&bitmap.bin_edges, bitmap.offset)?;
        for (row, entry) in bitmap.rows.iter().enumerate() {
            if entry.cells.len() + 1 != edges.len() {
                return Err(SplitterError::invalid_row(
                    row,
                    format!(
                        "expected {} cells for {} bin edges, got {}",
                        edges.len().saturating_sub(1),
                        edges.len(),
                        entry.cells.len()
                    ),
                ));
            }
            if entry.cells.iter().any(|cell| !cell.is_finite()) {
                return Err(SplitterError::invalid_row(row, "cell values must be finite"));
            }
            let index = i32::try_from(row)
                .map(Destination::new)
                .map_err(|_| SplitterError::invalid_row(row, "too many rows"))?;
            let name = entry.name.clone().unwrap_or_else(|| row.to_string());
            self.register_name(name, index);

            let mut bin = 0;
            while bin < entry.cells.len() {
                if entry.cells[bin] == 0.0 {
                    bin += 1;
                    continue;
                }
                let first = bin;
                while bin < entry.cells.len() && entry.cells[bin] != 0.0 {
                    bin += 1;
                }
                let (start, stop) = (edges[first], edges[bin]);
                if self.overlaps_assigned(start, stop) {
                    tracing::warn!(row, %start, %stop, "bitmap row overwrites earlier assignment");
                }
                self.add_roi(start, stop, index).map_err(|e| at_row(e, row))?;
            }
        }
        Ok(())
    }

    fn apply_histogram(&mut self, histogram: &HistogramSource) -> Result<()> {
        let edges = resolve_edges(&histogram.bin_edges, histogram.offset)?;
        if histogram.targets.len() + 1 != edges.len() {
            return Err(SplitterError::invalid(format!(
                "expected {} targets for {} bin edges, got {}",
                edges.len().saturating_sub(1),
                edges.len(),
                histogram.targets.len()
            )));
        }
        for (bin, target) in histogram.targets.iter().enumerate() {
            let (start, stop) = (edges[bin], edges[bin + 1]);
            if target.is_target() && self.overlaps_assigned(start, stop) {
                tracing::warn!(%start, %stop, "values may be overwritten in conversion to splitter");
            }
            self.add_roi(start, stop, *target).map_err(|e| at_row(e, bin))?;
            self.register_if_unnamed(target.to_string(), *target);
        }
        Ok(())
    }

    fn apply_splitters(&mut self, splitters: &[SplittingInterval]) -> Result<()> {
        for (row, splitter) in splitters.iter().enumerate() {
            self.add_roi(splitter.start, splitter.stop, splitter.destination)
                .map_err(|e| at_row(e, row))?;
        }
        Ok(())
    }

    /// Whether any part of `[start, stop)` already maps to a real destination.
    fn overlaps_assigned(&self, start: DateTime<Utc>, stop: DateTime<Utc>) -> bool {
        self.value_at_time(start).is_target()
            || self
                .splitters_map()
                .range(start..stop)
                .any(|(_, value)| value.is_target())
    }
}

fn at_row(err: SplitterError, row: usize) -> SplitterError {
    match err {
        SplitterError::InvalidInterval { row: None, reason } => SplitterError::InvalidInterval {
            row: Some(row),
            reason,
        },
        other => other,
    }
}

fn resolve_time(time: RowTime, offset: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    match time {
        RowTime::Absolute(time) => Ok(time),
        RowTime::Relative(seconds) => {
            if seconds < 0.0 {
                return Err(format!("time {seconds}s is negative"));
            }
            seconds_to_delta(seconds)
                .and_then(|delta| offset.checked_add_signed(delta))
                .ok_or_else(|| format!("time {seconds}s is out of range"))
        }
    }
}

/// Converts relative bin edges to absolute times, checking they ascend.
fn resolve_edges(edges: &[f64], offset: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
    let times = edges
        .iter()
        .map(|&edge| resolve_time(RowTime::Relative(edge), offset))
        .collect::<Result<Vec<_>, String>>()
        .map_err(|reason| SplitterError::invalid(format!("bin edge {reason}")))?;
    if times.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(SplitterError::invalid("bin edges must be strictly increasing"));
    }
    Ok(times)
}
