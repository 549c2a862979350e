//! Error types for series building and export.

use chrono::NaiveDate;
use grace_raster::RasterError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building, aligning or exporting a series.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// Archive lookup or raster configuration failure.
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    /// More than one archive file claims the same date.
    #[error("Multiple files match product {product} on {date}; remove all but one: {paths:?}")]
    AmbiguousMatch {
        /// Product identifier.
        product: String,
        /// Date being extracted.
        date: NaiveDate,
        /// Every matching file, sorted.
        paths: Vec<PathBuf>,
    },

    /// A matched file could not be read as a raster.
    #[error("Cannot read {product} raster for {date} at {path}: {source}")]
    MalformedRaster {
        /// Product identifier.
        product: String,
        /// Date being extracted.
        date: NaiveDate,
        /// The unreadable file.
        path: PathBuf,
        /// Underlying read failure.
        #[source]
        source: RasterError,
    },

    /// Start date after end date.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    /// A site registry row failed validation.
    #[error("Invalid site '{id}': {reason}")]
    InvalidSite {
        /// Site identifier as read.
        id: String,
        /// What was wrong.
        reason: String,
    },

    /// The same site id appears twice in the registry.
    #[error("Duplicate site id '{0}'")]
    DuplicateSite(String),

    /// Reference year missing from an aligned matrix.
    #[error("Year {0} is not present in the aligned matrix")]
    MissingYear(String),

    /// Invalid run configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// CSV read or write failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SeriesError {
    /// Whether the run failed because of its inputs or configuration (as
    /// opposed to I/O while exporting).
    pub fn is_configuration(&self) -> bool {
        match self {
            SeriesError::Raster(e) => e.is_configuration(),
            SeriesError::AmbiguousMatch { .. }
            | SeriesError::InvalidDateRange { .. }
            | SeriesError::Config(_) => true,
            _ => false,
        }
    }
}
