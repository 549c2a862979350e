//! Run configuration, loadable from YAML.
//!
//! ```yaml
//! archive_dir: /data/grace
//! product: GRD-3
//! sites: /data/grace/sample.csv
//! start: 2002-01-01
//! end: 2020-12-31
//! scale_factor: 0.001
//! malformed_policy: best_effort
//! ```

use crate::builder::{MalformedPolicy, SeriesBuilder};
use crate::calendar::DateRange;
use crate::site::Site;
use crate::{Result, SeriesError};
use chrono::NaiveDate;
use grace_raster::{PixelSampler, RasterLocator, DEFAULT_NODATA};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the output directory created inside the archive when no
/// `output_dir` is configured.
pub const DEFAULT_OUTPUT_SUBDIR: &str = "time_series";

fn default_nodata() -> f32 {
    DEFAULT_NODATA
}

fn default_scale_factor() -> f64 {
    1.0
}

/// Everything needed for one extraction run. All paths are used as given;
/// relative paths resolve against the process working directory once, at
/// open time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Directory holding the raster archive.
    pub archive_dir: PathBuf,
    /// Product identifier, e.g. `GRD-3`.
    pub product: String,
    /// Header-less `id,lat,lon` site registry.
    pub sites: PathBuf,
    /// First date, inclusive.
    pub start: NaiveDate,
    /// Last date, inclusive.
    pub end: NaiveDate,
    /// Where exports are written; defaults to `<archive_dir>/time_series`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Raster nodata sentinel.
    #[serde(default = "default_nodata")]
    pub nodata: f32,
    /// Multiplier applied to every valid value.
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Handling of archive files that cannot be read.
    #[serde(default)]
    pub malformed_policy: MalformedPolicy,
    /// Extract days in parallel.
    #[serde(default)]
    pub parallel: bool,
}

impl RunConfig {
    /// Minimal configuration with defaults for everything optional.
    pub fn new(
        archive_dir: impl Into<PathBuf>,
        product: impl Into<String>,
        sites: impl Into<PathBuf>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            product: product.into(),
            sites: sites.into(),
            start,
            end,
            output_dir: None,
            nodata: default_nodata(),
            scale_factor: default_scale_factor(),
            malformed_policy: MalformedPolicy::default(),
            parallel: false,
        }
    }

    /// Parse YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.product.trim().is_empty() {
            return Err(SeriesError::Config("product must not be empty".to_string()));
        }
        if !self.scale_factor.is_finite() {
            return Err(SeriesError::Config(format!(
                "scale_factor must be finite, got {}",
                self.scale_factor
            )));
        }
        self.date_range()?;
        Ok(())
    }

    /// Requested range.
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::new(self.start, self.end)
    }

    /// Resolved output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.archive_dir.join(DEFAULT_OUTPUT_SUBDIR))
    }

    /// Builder configured from this run. Fails on an unknown product before
    /// the archive is touched.
    pub fn series_builder(&self, sites: Vec<Site>) -> Result<SeriesBuilder> {
        let locator = RasterLocator::new(&self.archive_dir, &self.product)?;
        Ok(SeriesBuilder::new(locator, sites, self.date_range()?)
            .with_sampler(PixelSampler::new(self.nodata))
            .with_scale_factor(self.scale_factor)
            .with_malformed_policy(self.malformed_policy)
            .with_parallel(self.parallel))
    }
}
