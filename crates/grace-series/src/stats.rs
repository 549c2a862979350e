//! Year-over-year statistics on an aligned matrix.

use crate::align::AlignedMatrix;
use crate::calendar::ALIGNED_DAYS;
use crate::{Result, SeriesError};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

/// Summary of one year's valid values.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSummary {
    /// Year label.
    pub label: String,
    /// Days with a valid value.
    pub valid_days: usize,
    /// Mean of valid values.
    pub mean: f64,
    /// Sample standard deviation, `None` with fewer than two values.
    pub std_dev: Option<f64>,
    /// Smallest valid value.
    pub min: f64,
    /// Largest valid value.
    pub max: f64,
}

/// Per day-offset mean and spread across all retained years.
#[derive(Debug, Clone, PartialEq)]
pub struct Climatology {
    /// Mean per day offset, `None` where no year has data.
    pub mean: Vec<Option<f64>>,
    /// Sample standard deviation per day offset, `None` with fewer than two years.
    pub std_dev: Vec<Option<f64>>,
    /// Number of years contributing at each offset.
    pub years: Vec<usize>,
}

/// Two-sample Student t-test of one year against a reference year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearComparison {
    /// Year being compared.
    pub label: String,
    /// Mean of this year.
    pub mean: f64,
    /// t statistic (pooled variance).
    pub t_statistic: f64,
    /// Degrees of freedom.
    pub degrees_of_freedom: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// Summaries for every retained year, in year order.
pub fn summarize(matrix: &AlignedMatrix) -> Vec<YearSummary> {
    matrix
        .iter()
        .map(|(label, column)| {
            let values: Vec<f64> = column.valid().map(|(_, v)| v).collect();
            YearSummary {
                label: label.to_string(),
                valid_days: values.len(),
                mean: values.iter().mean(),
                std_dev: sample_std_dev(&values),
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect()
}

/// Day-by-day mean and standard deviation across years.
pub fn climatology(matrix: &AlignedMatrix) -> Climatology {
    let mut mean = Vec::with_capacity(ALIGNED_DAYS);
    let mut std_dev = Vec::with_capacity(ALIGNED_DAYS);
    let mut years = Vec::with_capacity(ALIGNED_DAYS);

    for offset in 0..ALIGNED_DAYS {
        let values: Vec<f64> = matrix
            .iter()
            .filter_map(|(_, column)| column.values()[offset])
            .collect();
        mean.push((!values.is_empty()).then(|| values.iter().mean()));
        std_dev.push(sample_std_dev(&values));
        years.push(values.len());
    }

    Climatology {
        mean,
        std_dev,
        years,
    }
}

/// Compare every other year to `reference`.
///
/// Years with fewer than two valid values, or a zero pooled variance, are
/// skipped since the statistic is undefined for them.
pub fn compare_to_reference(
    matrix: &AlignedMatrix,
    reference: &str,
) -> Result<Vec<YearComparison>> {
    let reference_values: Vec<f64> = matrix
        .get(reference)
        .ok_or_else(|| SeriesError::MissingYear(reference.to_string()))?
        .valid()
        .map(|(_, v)| v)
        .collect();

    Ok(matrix
        .iter()
        .filter(|(label, _)| *label != reference)
        .filter_map(|(label, column)| {
            let values: Vec<f64> = column.valid().map(|(_, v)| v).collect();
            let (t_statistic, degrees_of_freedom) = pooled_t(&values, &reference_values)?;
            let distribution = StudentsT::new(0.0, 1.0, degrees_of_freedom).ok()?;
            let p_value = 2.0 * (1.0 - distribution.cdf(t_statistic.abs()));
            Some(YearComparison {
                label: label.to_string(),
                mean: values.iter().mean(),
                t_statistic,
                degrees_of_freedom,
                p_value,
            })
        })
        .collect())
}

fn sample_std_dev(values: &[f64]) -> Option<f64> {
    (values.len() >= 2).then(|| values.iter().std_dev())
}

fn pooled_t(a: &[f64], b: &[f64]) -> Option<(f64, f64)> {
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * a.iter().variance() + (n2 - 1.0) * b.iter().variance()) / df;
    if pooled <= 0.0 {
        return None;
    }
    let t = (a.iter().mean() - b.iter().mean()) / (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    Some((t, df))
}
