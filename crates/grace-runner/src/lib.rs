//! # grace-runner
//!
//! Orchestrates a complete extraction run: load sites, build the series,
//! align every site, write the exports and log a summary. The `grace-ts`
//! binary is a thin wrapper around [`run_extraction`] and [`locate`].

pub mod cli;
mod logging;
mod run;

pub use logging::init_logging;
pub use run::{locate, run_extraction, RunSummary, SiteSummary};

use thiserror::Error;

/// Errors surfaced by the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Series building, alignment or export failed.
    #[error(transparent)]
    Series(#[from] grace_series::SeriesError),

    /// Archive lookup failed.
    #[error(transparent)]
    Raster(#[from] grace_raster::RasterError),

    /// A value needed for the run was neither configured nor passed.
    #[error("Missing required argument {0} (or provide --config)")]
    MissingArgument(&'static str),

    /// I/O error preparing outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
