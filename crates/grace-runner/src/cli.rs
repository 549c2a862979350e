//! Command-line interface definitions.

use crate::{Result, RunnerError};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use grace_series::{MalformedPolicy, RunConfig};
use std::path::PathBuf;

/// Extract per-site time series from a groundwater anomaly raster archive.
#[derive(Debug, Parser)]
#[command(name = "grace-ts", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build, align and export the series for every site.
    Run(RunArgs),
    /// List the archive files matching one date.
    Locate(LocateArgs),
}

/// Arguments for `run`. Flags override values from `--config`.
#[derive(Debug, Args, Default)]
pub struct RunArgs {
    /// YAML run configuration.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Raster archive directory.
    #[arg(short, long)]
    pub archive: Option<PathBuf>,

    /// Product identifier, e.g. GRD-3.
    #[arg(short, long)]
    pub product: Option<String>,

    /// Header-less id,lat,lon site registry.
    #[arg(short, long)]
    pub sites: Option<PathBuf>,

    /// First date (YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Output directory (default: <archive>/time_series).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Raster nodata sentinel.
    #[arg(long, allow_hyphen_values = true)]
    pub nodata: Option<f32>,

    /// Multiplier applied to every valid value.
    #[arg(long, allow_hyphen_values = true)]
    pub scale_factor: Option<f64>,

    /// Extract days in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Record unreadable files as missing instead of aborting.
    #[arg(long)]
    pub best_effort: bool,

    /// Compare every year against this reference year in the run summary.
    #[arg(long)]
    pub compare: Option<i32>,
}

impl RunArgs {
    /// Merge the optional config file with command-line overrides.
    pub fn to_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_yaml_file(path)?,
            None => RunConfig::new(
                required(&self.archive, "--archive")?.clone(),
                required(&self.product, "--product")?.clone(),
                required(&self.sites, "--sites")?.clone(),
                *required(&self.start, "--start")?,
                *required(&self.end, "--end")?,
            ),
        };

        if let Some(archive) = &self.archive {
            config.archive_dir = archive.clone();
        }
        if let Some(product) = &self.product {
            config.product = product.clone();
        }
        if let Some(sites) = &self.sites {
            config.sites = sites.clone();
        }
        if let Some(start) = self.start {
            config.start = start;
        }
        if let Some(end) = self.end {
            config.end = end;
        }
        if let Some(output) = &self.output {
            config.output_dir = Some(output.clone());
        }
        if let Some(nodata) = self.nodata {
            config.nodata = nodata;
        }
        if let Some(scale_factor) = self.scale_factor {
            config.scale_factor = scale_factor;
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.best_effort {
            config.malformed_policy = MalformedPolicy::BestEffort;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Arguments for `locate`.
#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Raster archive directory.
    #[arg(short, long)]
    pub archive: PathBuf,

    /// Product identifier.
    #[arg(short, long)]
    pub product: String,

    /// Date to look up (YYYY-MM-DD).
    #[arg(short, long)]
    pub date: NaiveDate,
}

fn required<'a, T>(value: &'a Option<T>, flag: &'static str) -> Result<&'a T> {
    value.as_ref().ok_or(RunnerError::MissingArgument(flag))
}
