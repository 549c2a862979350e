//! Run exports: the wide daily CSV table, the aligned-matrix JSON and the
//! optional reference-year comparison.

use crate::align::{AlignedMatrix, CalendarAligner};
use crate::builder::ObservationRecord;
use crate::calendar::{date_key, DateRange};
use crate::site::Site;
use crate::stats::compare_to_reference;
use crate::Result;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Deterministic base name for a run's outputs, without extension:
/// `{sites_stem}_extracted_values_{product}_{YYYYMMDD}-{YYYYMMDD}`.
pub fn output_stem(sites_path: &Path, product: &str, range: &DateRange) -> String {
    let stem = sites_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sites".to_string());
    format!(
        "{}_extracted_values_{}_{}-{}",
        stem,
        product,
        range.start().format("%Y%m%d"),
        range.end().format("%Y%m%d")
    )
}

/// Paths of the CSV table and JSON matrix for a run.
pub fn output_paths(
    output_dir: &Path,
    sites_path: &Path,
    product: &str,
    range: &DateRange,
) -> (PathBuf, PathBuf) {
    let stem = output_stem(sites_path, product, range);
    (
        output_dir.join(format!("{}.csv", stem)),
        output_dir.join(format!("{}_aligned.json", stem)),
    )
}

/// Path of the comparison against `reference_year`, next to the daily table:
/// `{table_stem}_t_stats_vs_{year}.txt`.
pub fn comparison_path(table_path: &Path, reference_year: i32) -> PathBuf {
    let stem = table_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    table_path.with_file_name(format!("{}_t_stats_vs_{}.txt", stem, reference_year))
}

/// Write the t-test of every year against `reference` as CSV, one row per
/// site and compared year. Sites without the reference year are skipped.
/// Returns the number of rows written.
pub fn write_comparisons<W: Write>(
    writer: W,
    matrices: &[AlignedMatrix],
    reference: &str,
) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "site_id",
        "year",
        "mean",
        "t_statistic",
        "degrees_of_freedom",
        "p_value",
    ])?;

    let mut rows = 0;
    for matrix in matrices {
        let comparisons = match compare_to_reference(matrix, reference) {
            Ok(comparisons) => comparisons,
            Err(e) => {
                warn!(site = matrix.site_id(), "comparison skipped: {}", e);
                continue;
            }
        };
        for c in comparisons {
            csv.write_record([
                matrix.site_id().to_string(),
                c.label,
                c.mean.to_string(),
                c.t_statistic.to_string(),
                c.degrees_of_freedom.to_string(),
                c.p_value.to_string(),
            ])?;
            rows += 1;
        }
    }
    csv.flush()?;
    Ok(rows)
}

/// Write the reference-year comparison to a file.
pub fn export_comparisons<P: AsRef<Path>>(
    path: P,
    matrices: &[AlignedMatrix],
    reference: &str,
) -> Result<usize> {
    let path = path.as_ref();
    let rows = write_comparisons(BufWriter::new(File::create(path)?), matrices, reference)?;
    info!(path = %path.display(), reference, rows, "wrote comparison");
    Ok(rows)
}

/// Write the daily table: `date_key` then one column per site, one row per
/// date of the range. Missing values are empty fields.
pub fn write_table<W: Write>(
    writer: W,
    range: &DateRange,
    sites: &[Site],
    records: &[ObservationRecord],
) -> Result<()> {
    let aligner = CalendarAligner::new(*range);
    let columns: Vec<Vec<Option<f64>>> = sites
        .iter()
        .map(|site| {
            aligner
                .daily_series(&site.id, records)
                .into_iter()
                .map(|(_, v)| v)
                .collect()
        })
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec!["date_key".to_string()];
    header.extend(sites.iter().map(|s| s.id.clone()));
    csv.write_record(&header)?;

    for (row, date) in range.days().enumerate() {
        let mut fields = Vec::with_capacity(sites.len() + 1);
        fields.push(date_key(date));
        fields.extend(
            columns
                .iter()
                .map(|column| column[row].map(|v| v.to_string()).unwrap_or_default()),
        );
        csv.write_record(&fields)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the daily table to a file.
pub fn export_table<P: AsRef<Path>>(
    path: P,
    range: &DateRange,
    sites: &[Site],
    records: &[ObservationRecord],
) -> Result<()> {
    let path = path.as_ref();
    write_table(BufWriter::new(File::create(path)?), range, sites, records)?;
    info!(path = %path.display(), rows = range.len_days(), "wrote table");
    Ok(())
}

/// Write aligned matrices as `{ site_id: { "2020": [value | null, ...] } }`.
pub fn write_aligned_json<W: Write>(writer: W, matrices: &[AlignedMatrix]) -> Result<()> {
    let document: BTreeMap<&str, BTreeMap<&str, &[Option<f64>]>> = matrices
        .iter()
        .map(|m| {
            let years = m.iter().map(|(label, c)| (label, c.values())).collect();
            (m.site_id(), years)
        })
        .collect();
    serde_json::to_writer_pretty(writer, &document)?;
    Ok(())
}

/// Write aligned matrices to a JSON file.
pub fn export_aligned_json<P: AsRef<Path>>(path: P, matrices: &[AlignedMatrix]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_aligned_json(&mut writer, matrices)?;
    writer.flush()?;
    info!(path = %path.display(), sites = matrices.len(), "wrote aligned matrices");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Observation;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: NaiveDate, site: &str, value: Observation) -> ObservationRecord {
        ObservationRecord {
            date,
            site_id: site.to_string(),
            value,
        }
    }

    #[test]
    fn test_output_stem() {
        let range = DateRange::new(date(2002, 1, 1), date(2020, 12, 31)).unwrap();
        assert_eq!(
            output_stem(Path::new("/data/sample.csv"), "GRD-3", &range),
            "sample_extracted_values_GRD-3_20020101-20201231"
        );
        let (csv, json) = output_paths(Path::new("/out"), Path::new("sample.csv"), "GRD-3", &range);
        assert_eq!(csv, Path::new("/out/sample_extracted_values_GRD-3_20020101-20201231.csv"));
        assert_eq!(
            json,
            Path::new("/out/sample_extracted_values_GRD-3_20020101-20201231_aligned.json")
        );
    }

    #[test]
    fn test_write_table() {
        let range = DateRange::new(date(2020, 3, 13), date(2020, 3, 14)).unwrap();
        let sites = vec![
            Site::new("dc", 38.9, -77.0).unwrap(),
            Site::new("nyc", 40.7, -74.0).unwrap(),
        ];
        let records = vec![
            record(date(2020, 3, 13), "dc", Observation::NoFile),
            record(date(2020, 3, 13), "nyc", Observation::NoFile),
            record(date(2020, 3, 14), "dc", Observation::Value(-1.25)),
            record(date(2020, 3, 14), "nyc", Observation::OutOfBounds),
        ];

        let mut out = Vec::new();
        write_table(&mut out, &range, &sites, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "date_key,dc,nyc\n2020073,,\n2020074,-1.25,\n");
    }

    #[test]
    fn test_comparison_path() {
        let table = Path::new("/out/sample_extracted_values_GRD-3_20020101-20201231.csv");
        assert_eq!(
            comparison_path(table, 2010),
            Path::new("/out/sample_extracted_values_GRD-3_20020101-20201231_t_stats_vs_2010.txt")
        );
    }

    #[test]
    fn test_write_comparisons() {
        let range = DateRange::new(date(2019, 1, 1), date(2020, 12, 31)).unwrap();
        let records = vec![
            record(date(2019, 1, 1), "dc", Observation::Value(1.0)),
            record(date(2019, 1, 2), "dc", Observation::Value(3.0)),
            record(date(2020, 1, 1), "dc", Observation::Value(5.0)),
            record(date(2020, 1, 2), "dc", Observation::Value(7.0)),
            // Only 2020 for nyc, so it has no reference year
            record(date(2020, 1, 1), "nyc", Observation::Value(1.0)),
        ];
        let aligner = CalendarAligner::new(range);
        let matrices = vec![aligner.align("dc", &records), aligner.align("nyc", &records)];

        let mut out = Vec::new();
        let rows = write_comparisons(&mut out, &matrices, "2019").unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "site_id,year,mean,t_statistic,degrees_of_freedom,p_value"
        );
        let fields: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(&fields[..3], &["dc", "2020", "6"]);
        // Pooled t = (6 - 2) / sqrt(2 * (1/2 + 1/2)) with 2 degrees of freedom
        let t: f64 = fields[3].parse().unwrap();
        assert!((t - 4.0 / 2.0_f64.sqrt()).abs() < 1e-9);
        assert_eq!(fields[4], "2");
    }

    #[test]
    fn test_write_aligned_json() {
        let range = DateRange::new(date(2019, 1, 1), date(2019, 12, 31)).unwrap();
        let records = vec![record(date(2019, 1, 2), "dc", Observation::Value(0.5))];
        let matrix = CalendarAligner::new(range).align("dc", &records);

        let mut out = Vec::new();
        write_aligned_json(&mut out, &[matrix]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let column = value["dc"]["2019"].as_array().unwrap();
        assert_eq!(column.len(), 364);
        assert!(column[0].is_null());
        assert_eq!(column[1].as_f64(), Some(0.5));
    }
}
