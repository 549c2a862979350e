//! Day-by-day extraction of site values from the raster archive.
//!
//! For every date in the requested range the archive is searched once, the
//! matching raster (if any) is opened once and sampled for all sites, and one
//! [`ObservationRecord`] per site is emitted. Records come out in date order,
//! then site order.

use crate::calendar::{days_in_year, DateRange};
use crate::site::Site;
use crate::{Result, SeriesError};
use chrono::NaiveDate;
use grace_raster::{Crs, Located, PixelSampler, RasterLocator, Sample};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Value recorded for one site on one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Valid value, already scaled.
    Value(f64),
    /// No archive file for this date.
    NoFile,
    /// The site's pixel holds the nodata sentinel.
    NoData,
    /// The site falls outside the raster.
    OutOfBounds,
    /// The file for this date could not be read (best-effort policy only).
    Unreadable,
}

impl Observation {
    /// The value, or `None` for any kind of missing observation.
    pub fn value(&self) -> Option<f64> {
        match self {
            Observation::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// True for every variant except [`Observation::Value`].
    pub fn is_missing(&self) -> bool {
        self.value().is_none()
    }

    fn from_sample(sample: Sample, scale_factor: f64) -> Self {
        match sample {
            Sample::Value(v) => Observation::Value(v * scale_factor),
            Sample::NoData => Observation::NoData,
            Sample::OutOfBounds => Observation::OutOfBounds,
        }
    }
}

/// One site's observation on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    /// Calendar date.
    pub date: NaiveDate,
    /// Site identifier.
    pub site_id: String,
    /// Value or reason it is missing.
    pub value: Observation,
}

/// What to do when a date's file exists but cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Stop the run and report the date and file.
    #[default]
    Abort,
    /// Record [`Observation::Unreadable`] for every site and continue.
    BestEffort,
}

/// Drives extraction across a date range.
#[derive(Debug)]
pub struct SeriesBuilder {
    locator: RasterLocator,
    sampler: PixelSampler,
    sites: Vec<Site>,
    range: DateRange,
    scale_factor: f64,
    malformed_policy: MalformedPolicy,
    parallel: bool,
    crs_warned: AtomicBool,
}

impl SeriesBuilder {
    /// Create a builder with the default sampler, no scaling, abort on
    /// unreadable files and sequential extraction.
    pub fn new(locator: RasterLocator, sites: Vec<Site>, range: DateRange) -> Self {
        Self {
            locator,
            sampler: PixelSampler::default(),
            sites,
            range,
            scale_factor: 1.0,
            malformed_policy: MalformedPolicy::default(),
            parallel: false,
            crs_warned: AtomicBool::new(false),
        }
    }

    /// Use a sampler with a different nodata sentinel.
    pub fn with_sampler(mut self, sampler: PixelSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Multiply every valid value by `scale_factor`.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Choose how unreadable files are handled.
    pub fn with_malformed_policy(mut self, policy: MalformedPolicy) -> Self {
        self.malformed_policy = policy;
        self
    }

    /// Extract days on the rayon pool. Output is identical to a sequential run.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sites in output order.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Requested range.
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Every date to extract: each year touched by the range, each
    /// day-of-year of that year, restricted to the range.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(self.range.len_days());
        for year in self.range.years() {
            for doy in 1..=days_in_year(year) {
                if let Some(date) = NaiveDate::from_yo_opt(year, doy) {
                    if self.range.contains(date) {
                        dates.push(date);
                    }
                }
            }
        }
        dates
    }

    /// Build the complete series. Nothing is returned if the run fails.
    pub fn build(&self) -> Result<Vec<ObservationRecord>> {
        let mut records = Vec::with_capacity(self.range.len_days() * self.sites.len());
        self.build_into(&mut records)?;
        Ok(records)
    }

    /// Append records to `out` one whole day at a time.
    ///
    /// On a fatal error `out` holds exactly the records of every date before
    /// the failing one.
    pub fn build_into(&self, out: &mut Vec<ObservationRecord>) -> Result<()> {
        let dates = self.dates();
        info!(
            product = self.locator.product(),
            start = %self.range.start(),
            end = %self.range.end(),
            sites = self.sites.len(),
            days = dates.len(),
            "extracting series"
        );

        if self.parallel {
            let days: Vec<Result<Vec<ObservationRecord>>> =
                dates.par_iter().map(|&date| self.extract_day(date)).collect();
            for day in days {
                out.extend(day?);
            }
        } else {
            for date in dates {
                out.extend(self.extract_day(date)?);
            }
        }
        Ok(())
    }

    /// Records for every site on one date.
    pub fn extract_day(&self, date: NaiveDate) -> Result<Vec<ObservationRecord>> {
        let observations = match self.locator.locate_date(date)? {
            Located::Missing => {
                debug!(%date, "no file");
                vec![Observation::NoFile; self.sites.len()]
            }
            Located::Ambiguous(paths) => {
                return Err(SeriesError::AmbiguousMatch {
                    product: self.locator.product().to_string(),
                    date,
                    paths,
                });
            }
            Located::Found(path) => self.sample_file(date, &path)?,
        };

        Ok(self
            .sites
            .iter()
            .zip(observations)
            .map(|(site, value)| ObservationRecord {
                date,
                site_id: site.id.clone(),
                value,
            })
            .collect())
    }

    fn sample_file(&self, date: NaiveDate, path: &Path) -> Result<Vec<Observation>> {
        let coordinates: Vec<(f64, f64)> = self.sites.iter().map(Site::coordinate).collect();

        let (crs, samples) = match self.sampler.sample_coordinates(path, &coordinates) {
            Ok(sampled) => sampled,
            Err(source) => match self.malformed_policy {
                MalformedPolicy::Abort => {
                    return Err(SeriesError::MalformedRaster {
                        product: self.locator.product().to_string(),
                        date,
                        path: path.to_path_buf(),
                        source,
                    });
                }
                MalformedPolicy::BestEffort => {
                    warn!(%date, path = %path.display(), error = %source, "unreadable raster, recording as missing");
                    return Ok(vec![Observation::Unreadable; self.sites.len()]);
                }
            },
        };

        self.check_crs(crs, path);
        debug!(%date, path = %path.display(), "sampled");

        Ok(self
            .sites
            .iter()
            .zip(samples)
            .map(|(site, sample)| {
                if sample == Sample::OutOfBounds {
                    debug!(%date, site = %site.id, "site outside raster");
                }
                Observation::from_sample(sample, self.scale_factor)
            })
            .collect())
    }

    fn check_crs(&self, crs: Crs, path: &Path) {
        if let Crs::Projected(_) = crs {
            if !self.crs_warned.swap(true, Ordering::Relaxed) {
                warn!(
                    path = %path.display(),
                    %crs,
                    "raster is projected; site coordinates are treated as raster coordinates"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn builder(start: NaiveDate, end: NaiveDate) -> SeriesBuilder {
        let locator = RasterLocator::new(std::env::temp_dir(), "GRD-3").unwrap();
        let range = DateRange::new(start, end).unwrap();
        SeriesBuilder::new(locator, vec![], range)
    }

    #[test]
    fn test_dates_cover_leap_year() {
        let dates = builder(date(2020, 1, 1), date(2020, 12, 31)).dates();
        assert_eq!(dates.len(), 366);
        assert_eq!(dates[73], date(2020, 3, 14));
        assert_eq!(dates[365], date(2020, 12, 31));
    }

    #[test]
    fn test_dates_clip_to_range() {
        let dates = builder(date(2019, 12, 30), date(2021, 1, 2)).dates();
        assert_eq!(dates.len(), 2 + 366 + 2);
        assert_eq!(dates.first(), Some(&date(2019, 12, 30)));
        assert_eq!(dates.last(), Some(&date(2021, 1, 2)));
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_observation_scaling() {
        assert_eq!(
            Observation::from_sample(Sample::Value(3.0), 0.5),
            Observation::Value(1.5)
        );
        assert_eq!(
            Observation::from_sample(Sample::NoData, 0.5),
            Observation::NoData
        );
        assert!(Observation::OutOfBounds.is_missing());
        assert_eq!(Observation::Value(0.0).value(), Some(0.0));
    }
}
