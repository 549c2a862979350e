//! Runner tests: the library entry points and the `grace-ts` binary.

use chrono::NaiveDate;
use grace_raster::{write_geotiff, Crs, Located, RasterGeoreference, DEFAULT_NODATA};
use grace_runner::{locate, run_extraction};
use grace_series::RunConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Write a GRACE file starting on `(year, doy)` over 30N-50N, 90W-70W where
/// every pixel holds `value`.
fn write_grace_file(archive: &Path, year: i32, doy: u32, value: f32) {
    let georef = RasterGeoreference::new(-90.0, 50.0, 0.5, -0.5).with_crs(Crs::WGS84);
    write_geotiff(
        archive.join(format!(
            "GRD-3_{year}{doy:03}-{year}{end:03}_GRAC_JPLEM_BA01_0600_LND_v03.tif",
            end = doy + 30
        )),
        &georef,
        40,
        40,
        &vec![value; 40 * 40],
        Some(DEFAULT_NODATA),
    )
    .expect("Failed to write test raster");
}

/// Archive with one GRACE file starting 2020-01-03 plus a two-site registry.
/// Returns (archive, registry path).
fn setup_archive(value: f32) -> (TempDir, PathBuf) {
    let archive = TempDir::new().expect("Failed to create temp dir");
    write_grace_file(archive.path(), 2020, 3, value);

    let sites = archive.path().join("sites.csv");
    fs::write(&sites, "dc,38.9,-77.0\nseattle,47.6,-122.3\n").expect("Failed to write sites");
    (archive, sites)
}

fn expected_outputs(dir: &Path) -> (PathBuf, PathBuf) {
    let stem = "sites_extracted_values_GRD-3_20200101-20200105";
    (
        dir.join(format!("{}.csv", stem)),
        dir.join(format!("{}_aligned.json", stem)),
    )
}

// ============================================================================
// Library
// ============================================================================

#[test]
fn test_run_extraction_writes_outputs() {
    let (archive, sites) = setup_archive(2.5);
    let config = RunConfig::new(
        archive.path().to_path_buf(),
        "GRD-3".to_string(),
        sites,
        date(2020, 1, 1),
        date(2020, 1, 5),
    );

    let summary = run_extraction(&config, None).expect("Run failed");
    let (table, matrix) = expected_outputs(&archive.path().join("time_series"));
    assert_eq!(summary.table_path, table);
    assert_eq!(summary.matrix_path, matrix);
    assert_eq!(summary.records, 10);

    assert_eq!(summary.sites.len(), 2);
    assert_eq!(summary.sites[0].site_id, "dc");
    assert_eq!(summary.sites[0].years, vec!["2020".to_string()]);
    assert_eq!(summary.sites[0].valid_days, 1);
    assert_eq!(summary.sites[0].climatology_days, 1);
    assert_eq!(summary.comparison_path, None);
    // Seattle is outside the grid, so no year survives
    assert!(summary.sites[1].years.is_empty());

    let csv = fs::read_to_string(&table).expect("Failed to read table");
    assert_eq!(
        csv,
        "date_key,dc,seattle\n2020001,,\n2020002,,\n2020003,2.5,\n2020004,,\n2020005,,\n"
    );

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&matrix).expect("Failed to read matrix"))
            .expect("Failed to parse matrix JSON");
    let column = json["dc"]["2020"].as_array().expect("2020 column");
    assert_eq!(column.len(), 364);
    assert_eq!(column[2], serde_json::json!(2.5));
    assert!(column[0].is_null());
    assert!(json["seattle"].as_object().expect("seattle entry").is_empty());
}

#[test]
fn test_run_extraction_unknown_product_writes_nothing() {
    let (archive, sites) = setup_archive(1.0);
    let config = RunConfig::new(
        archive.path().to_path_buf(),
        "XYZ".to_string(),
        sites,
        date(2020, 1, 1),
        date(2020, 1, 5),
    );

    assert!(run_extraction(&config, None).is_err());
    assert!(!archive.path().join("time_series").exists());
}

#[test]
fn test_run_extraction_missing_archive_writes_nothing() {
    let (scratch, sites) = setup_archive(1.0);
    let output = scratch.path().join("out");
    let mut config = RunConfig::new(
        scratch.path().join("no-such-archive"),
        "GRD-3".to_string(),
        sites,
        date(2020, 1, 1),
        date(2020, 1, 5),
    );
    config.output_dir = Some(output.clone());

    let err = run_extraction(&config, None).unwrap_err();
    assert!(err.to_string().contains("no-such-archive"));
    assert!(!output.exists());
}

#[test]
fn test_valid_days_exclude_days_past_aligned_columns() {
    let (archive, sites) = setup_archive(1.0);
    write_grace_file(archive.path(), 2020, 366, 3.0);
    let config = RunConfig::new(
        archive.path().to_path_buf(),
        "GRD-3".to_string(),
        sites,
        date(2020, 12, 30),
        date(2020, 12, 31),
    );

    let summary = run_extraction(&config, None).expect("Run failed");
    // The daily table keeps day 366, the aligned columns stop at 364
    let csv = fs::read_to_string(&summary.table_path).expect("Failed to read table");
    assert!(csv.contains("2020366,3,"));
    assert_eq!(summary.sites[0].valid_days, 0);
    assert!(summary.sites[0].years.is_empty());
}

#[test]
fn test_run_extraction_writes_comparison() {
    let archive = TempDir::new().expect("Failed to create temp dir");
    write_grace_file(archive.path(), 2019, 3, 1.0);
    write_grace_file(archive.path(), 2019, 4, 3.0);
    write_grace_file(archive.path(), 2020, 3, 5.0);
    write_grace_file(archive.path(), 2020, 4, 7.0);
    let sites = archive.path().join("sites.csv");
    fs::write(&sites, "dc,38.9,-77.0\nseattle,47.6,-122.3\n").expect("Failed to write sites");

    let config = RunConfig::new(
        archive.path().to_path_buf(),
        "GRD-3".to_string(),
        sites,
        date(2019, 1, 1),
        date(2020, 1, 5),
    );
    let summary = run_extraction(&config, Some(2019)).expect("Run failed");

    let path = summary.comparison_path.expect("comparison written");
    assert_eq!(
        path,
        archive
            .path()
            .join("time_series")
            .join("sites_extracted_values_GRD-3_20190101-20200105_t_stats_vs_2019.txt")
    );
    let text = fs::read_to_string(&path).expect("Failed to read comparison");
    let lines: Vec<&str> = text.lines().collect();
    // Seattle has no data, so only dc 2020 is compared
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("dc,2020,6,"));
    assert_eq!(summary.sites[0].climatology_days, 2);
}

#[test]
fn test_locate_reports_match() {
    let (archive, _) = setup_archive(1.0);
    match locate(archive.path(), "GRD-3", date(2020, 1, 3)).expect("Locate failed") {
        Located::Found(path) => assert!(path.ends_with(
            "GRD-3_2020003-2020033_GRAC_JPLEM_BA01_0600_LND_v03.tif"
        )),
        other => panic!("Expected a single match, got {:?}", other),
    }
    assert_eq!(
        locate(archive.path(), "GRD-3", date(2020, 1, 4)).expect("Locate failed"),
        Located::Missing
    );
}

// ============================================================================
// Binary
// ============================================================================

#[test]
fn test_binary_run_with_config_file() {
    let (archive, sites) = setup_archive(4.0);
    let output = archive.path().join("out");
    let config = archive.path().join("run.yaml");
    fs::write(
        &config,
        format!(
            "archive_dir: {}\nproduct: GRD-3\nsites: {}\nstart: 2020-01-01\nend: 2020-01-05\n",
            archive.path().display(),
            sites.display()
        ),
    )
    .expect("Failed to write config");

    let result = Command::new(env!("CARGO_BIN_EXE_grace-ts"))
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .arg("--parallel")
        .output()
        .expect("Failed to execute grace-ts");

    if !result.status.success() {
        panic!(
            "Run failed:\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&result.stdout),
            String::from_utf8_lossy(&result.stderr)
        );
    }

    let (table, matrix) = expected_outputs(&output);
    assert!(table.exists(), "missing {}", table.display());
    assert!(matrix.exists(), "missing {}", matrix.display());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains(&table.display().to_string()));
}

#[test]
fn test_binary_unknown_product_fails() {
    let (archive, sites) = setup_archive(1.0);

    let result = Command::new(env!("CARGO_BIN_EXE_grace-ts"))
        .args(["run", "--product", "XYZ", "--start", "2020-01-01", "--end", "2020-01-05"])
        .arg("--archive")
        .arg(archive.path())
        .arg("--sites")
        .arg(&sites)
        .output()
        .expect("Failed to execute grace-ts");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("XYZ"), "stderr: {}", stderr);
}

#[test]
fn test_binary_missing_archive_fails() {
    let (scratch, sites) = setup_archive(1.0);
    let output = scratch.path().join("out");

    let result = Command::new(env!("CARGO_BIN_EXE_grace-ts"))
        .args(["run", "--product", "GRD-3", "--start", "2020-01-01", "--end", "2020-01-05"])
        .arg("--archive")
        .arg(scratch.path().join("no-such-archive"))
        .arg("--sites")
        .arg(&sites)
        .arg("--output")
        .arg(&output)
        .output()
        .expect("Failed to execute grace-ts");

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("no-such-archive"));
    assert!(!output.exists());
}

#[test]
fn test_binary_missing_argument_fails() {
    let result = Command::new(env!("CARGO_BIN_EXE_grace-ts"))
        .args(["run", "--product", "GRD-3"])
        .output()
        .expect("Failed to execute grace-ts");

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("--archive"));
}
