//! Configuration loading and management.

use std::path::Path;

use chrono::{DateTime, Utc};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::builder::{BitmapRow, BitmapSource, HistogramSource, TableRow, TableSource};
use crate::distribute::SplitOptions;
use crate::types::{Destination, gps_epoch};

/// Splitter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// How events are matched against the splitter.
    #[serde(default)]
    pub split: SplitOptions,

    /// Anchor for relative times in table, bitmap and histogram sources.
    #[serde(default = "gps_epoch")]
    pub offset: DateTime<Utc>,

    /// Added to numeric destination names when labelling outputs.
    #[serde(default)]
    pub output_index_shift: i32,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            split: SplitOptions::default(),
            offset: gps_epoch(),
            output_index_shift: 0,
        }
    }
}

impl SplitterConfig {
    /// Loads configuration from defaults and `TSPLIT_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific TOML file.
    ///
    /// Environment variables override the file; nested keys use `__`, e.g.
    /// `TSPLIT_SPLIT__TIME_MODE=pulse_tof`.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("TSPLIT_").split("__"));

        let config: Self = figment.extract()?;
        tracing::debug!(?config, "loaded splitter configuration");
        Ok(config)
    }

    /// Parses configuration from a TOML string on top of the defaults.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn from_toml_str(toml: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml))
            .extract()
    }

    /// A table source anchored at the configured offset.
    #[must_use]
    pub fn table(&self, rows: Vec<TableRow>) -> TableSource {
        TableSource::new(rows).with_offset(self.offset)
    }

    /// A bitmap source anchored at the configured offset.
    #[must_use]
    pub fn bitmap(&self, bin_edges: Vec<f64>, rows: Vec<BitmapRow>) -> BitmapSource {
        BitmapSource {
            bin_edges,
            rows,
            offset: self.offset,
        }
    }

    /// A histogram source anchored at the configured offset.
    #[must_use]
    pub fn histogram(&self, bin_edges: Vec<f64>, targets: Vec<Destination>) -> HistogramSource {
        HistogramSource {
            bin_edges,
            targets,
            offset: self.offset,
        }
    }
}
