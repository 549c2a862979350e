//! Calendar alignment: daily reindexing and year-by-day matrices.
//!
//! A site's records are first collapsed to one value per date (mean of any
//! duplicates), then reindexed onto every date of the requested range, and
//! finally cut into one fixed-length column per calendar year so years can be
//! overlaid day by day.

use crate::builder::ObservationRecord;
use crate::calendar::{DateRange, ALIGNED_DAYS};
use crate::site::Site;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

/// One year of a site's values, indexed by day offset (day-of-year - 1).
#[derive(Debug, Clone, PartialEq)]
pub struct YearColumn {
    year: i32,
    values: Vec<Option<f64>>,
}

impl YearColumn {
    /// Calendar year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Exactly [`ALIGNED_DAYS`] values, `None` where missing.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Valid values with their day offsets.
    pub fn valid(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(offset, v)| v.map(|v| (offset, v)))
    }

    /// Number of non-missing days.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Year label to column, for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedMatrix {
    site_id: String,
    columns: BTreeMap<String, YearColumn>,
}

impl AlignedMatrix {
    /// Site this matrix belongs to.
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Column for a four-digit year label such as `"2020"`.
    pub fn get(&self, label: &str) -> Option<&YearColumn> {
        self.columns.get(label)
    }

    /// Column for a year.
    pub fn year(&self, year: i32) -> Option<&YearColumn> {
        self.get(&year_label(year))
    }

    /// Labels in ascending year order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// `(label, column)` pairs in ascending year order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &YearColumn)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of retained years.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when every year was dropped.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Canonical column label for a year.
pub fn year_label(year: i32) -> String {
    format!("{:04}", year)
}

/// Aligns per-site records onto the requested calendar.
#[derive(Debug, Clone, Copy)]
pub struct CalendarAligner {
    range: DateRange,
}

impl CalendarAligner {
    /// Aligner for a requested range.
    pub fn new(range: DateRange) -> Self {
        Self { range }
    }

    /// Every date of the range with the site's value, `None` where absent.
    ///
    /// Records for other sites and dates outside the range are ignored.
    /// Several valid values on the same date are averaged; missing markers
    /// never contribute to the average.
    pub fn daily_series(
        &self,
        site_id: &str,
        records: &[ObservationRecord],
    ) -> Vec<(NaiveDate, Option<f64>)> {
        let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for record in records.iter().filter(|r| r.site_id == site_id) {
            if let Some(value) = record.value.value() {
                let entry = by_date.entry(record.date).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }

        if let Some((date, _)) = by_date.iter().find(|(_, (_, n))| *n > 1) {
            debug!(site = site_id, %date, "duplicate values on one date, averaging");
        }

        self.range
            .days()
            .map(|date| {
                let value = by_date.get(&date).map(|(sum, n)| sum / *n as f64);
                (date, value)
            })
            .collect()
    }

    /// Year-by-day matrix for one site.
    ///
    /// Each year's column is indexed by day-of-year - 1 and truncated to
    /// [`ALIGNED_DAYS`]; days of that year outside the range stay missing.
    /// Years without a single valid value are dropped.
    pub fn align(&self, site_id: &str, records: &[ObservationRecord]) -> AlignedMatrix {
        let mut columns: BTreeMap<i32, Vec<Option<f64>>> = self
            .range
            .years()
            .map(|year| (year, vec![None; ALIGNED_DAYS]))
            .collect();

        for (date, value) in self.daily_series(site_id, records) {
            let offset = date.ordinal0() as usize;
            if offset >= ALIGNED_DAYS {
                continue;
            }
            if let Some(column) = columns.get_mut(&date.year()) {
                column[offset] = value;
            }
        }

        let columns = columns
            .into_iter()
            .filter(|(_, values)| values.iter().any(Option::is_some))
            .map(|(year, values)| (year_label(year), YearColumn { year, values }))
            .collect::<BTreeMap<_, _>>();

        AlignedMatrix {
            site_id: site_id.to_string(),
            columns,
        }
    }

    /// One matrix per site, in site order.
    pub fn align_all(&self, sites: &[Site], records: &[ObservationRecord]) -> Vec<AlignedMatrix> {
        sites
            .iter()
            .map(|site| self.align(&site.id, records))
            .collect()
    }
}
