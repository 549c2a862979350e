//! Calendar helpers: leap years, day-of-year keys and inclusive date ranges.

use crate::{Result, SeriesError};
use chrono::{Datelike, NaiveDate};
use grace_raster::format_doy;
use std::ops::RangeInclusive;

/// Number of day offsets kept per year when aligning years side by side.
///
/// Day 365 (and 366 in leap years) is dropped so every year has the same
/// length. Existing exported series depend on this length.
pub const ALIGNED_DAYS: usize = 364;

/// Proleptic Gregorian leap year rule.
pub fn check_leap(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// 365 or 366.
pub fn days_in_year(year: i32) -> u32 {
    if check_leap(year) {
        366
    } else {
        365
    }
}

/// `YYYYDDD` key, e.g. `2020074` for 2020-03-14.
pub fn date_key(date: NaiveDate) -> String {
    format!("{:04}{}", date.year(), format_doy(date.ordinal()))
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SeriesError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First date.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Calendar years touched by the range.
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start.year()..=self.end.year()
    }

    /// Every date in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Number of dates in the range.
    pub fn len_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_check_leap() {
        for year in [2000, 2004, 2020] {
            assert!(check_leap(year), "{} is a leap year", year);
        }
        for year in [1900, 2001, 2023] {
            assert!(!check_leap(year), "{} is not a leap year", year);
        }
    }

    #[test]
    fn test_check_leap_matches_chrono() {
        for year in 1800..2200 {
            assert_eq!(check_leap(year), NaiveDate::from_yo_opt(year, 366).is_some());
        }
    }

    #[test]
    fn test_date_key() {
        assert_eq!(date_key(date(2020, 3, 14)), "2020074");
        assert_eq!(date_key(date(2019, 1, 1)), "2019001");
        assert_eq!(date_key(date(2020, 12, 31)), "2020366");
    }

    #[test]
    fn test_range() {
        let range = DateRange::new(date(2019, 12, 30), date(2020, 1, 2)).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 4);
        assert_eq!(range.len_days(), 4);
        assert_eq!(days[0], date(2019, 12, 30));
        assert_eq!(days[3], date(2020, 1, 2));
        assert_eq!(range.years(), 2019..=2020);
        assert!(range.contains(date(2020, 1, 1)));
        assert!(!range.contains(date(2020, 1, 3)));
    }

    #[test]
    fn test_inverted_range() {
        let err = DateRange::new(date(2020, 1, 2), date(2020, 1, 1)).unwrap_err();
        assert!(matches!(err, SeriesError::InvalidDateRange { .. }));
    }
}
