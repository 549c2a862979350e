//! # grace-series
//!
//! Builds per-site daily time series from a raster archive and aligns them
//! into year-by-day matrices for year-over-year comparison.
//!
//! ## Pipeline
//!
//! 1. [`SeriesBuilder`] walks every date of the requested range, finds that
//!    date's raster through [`grace_raster::RasterLocator`] and samples it at
//!    every [`Site`], producing one [`ObservationRecord`] per site per date.
//! 2. [`CalendarAligner`] reindexes one site's records onto the full daily
//!    calendar and regroups them into an [`AlignedMatrix`] of 364-day
//!    [`YearColumn`]s, dropping years with no data.
//! 3. [`export`] writes the daily table and the aligned matrices; [`stats`]
//!    compares years against each other.
//!
//! ## Example
//!
//! ```no_run
//! use grace_series::{load_sites, CalendarAligner, RunConfig};
//!
//! let config = RunConfig::from_yaml_file("run.yaml")?;
//! let sites = load_sites(&config.sites)?;
//! let records = config.series_builder(sites.clone())?.build()?;
//! let aligner = CalendarAligner::new(config.date_range()?);
//! for matrix in aligner.align_all(&sites, &records) {
//!     println!("{}: {} years with data", matrix.site_id(), matrix.len());
//! }
//! # Ok::<(), grace_series::SeriesError>(())
//! ```

mod align;
mod builder;
mod calendar;
mod config;
mod error;
pub mod export;
mod site;
pub mod stats;

pub use align::{year_label, AlignedMatrix, CalendarAligner, YearColumn};
pub use builder::{MalformedPolicy, Observation, ObservationRecord, SeriesBuilder};
pub use calendar::{check_leap, date_key, days_in_year, DateRange, ALIGNED_DAYS};
pub use config::{RunConfig, DEFAULT_OUTPUT_SUBDIR};
pub use error::SeriesError;
pub use site::{load_sites, read_sites, Site};

/// Result type for series operations.
pub type Result<T> = std::result::Result<T, SeriesError>;
