//! Archive file lookup by product, year and day-of-year.
//!
//! Every product family names its files differently. The family is picked
//! from the product identifier once, when the locator is built, so an
//! unrecognised product fails before the archive is ever scanned.

use crate::{RasterError, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Naming convention of a product family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductKind {
    /// GRACE Tellus land mass grids: `GRD-3_2015213-2015243_..._v03.tif`.
    Grace,
    /// MODIS / VIIRS tiles: `MCD43A3.A2019074....tif`.
    ModisViirs,
    /// Landsat 8 scenes named by calendar date: `LC08_..._20190315_....hdf`.
    Landsat,
}

impl ProductKind {
    /// Identify the family from a product identifier.
    pub fn from_product(product: &str) -> Result<Self> {
        if product.contains("GRD-3") {
            Ok(ProductKind::Grace)
        } else if ["MCD", "VNP", "VJ1"].iter().any(|p| product.contains(p)) {
            Ok(ProductKind::ModisViirs)
        } else if product.contains("LC08") {
            Ok(ProductKind::Landsat)
        } else {
            Err(RasterError::UnknownProduct(product.to_string()))
        }
    }

    /// File-name glob for one day of one product.
    pub fn file_pattern(&self, product: &str, year: i32, doy: u32) -> Result<String> {
        let date = NaiveDate::from_yo_opt(year, doy)
            .ok_or(RasterError::InvalidDayOfYear { year, doy })?;
        let product = glob::Pattern::escape(product);
        let pattern = match self {
            ProductKind::Grace => format!("{}*_{}{}*.tif", product, year, format_doy(doy)),
            ProductKind::ModisViirs => format!("{}*{}{}*.tif", product, year, format_doy(doy)),
            ProductKind::Landsat => format!(
                "{}*_{}{:02}{:02}_*.h*",
                product,
                year,
                date.month(),
                date.day()
            ),
        };
        Ok(pattern)
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProductKind::Grace => "GRACE",
            ProductKind::ModisViirs => "MODIS/VIIRS",
            ProductKind::Landsat => "Landsat",
        };
        f.write_str(name)
    }
}

/// Zero-padded three digit day-of-year, e.g. `074`.
pub fn format_doy(doy: u32) -> String {
    format!("{:03}", doy)
}

/// Result of looking up one date in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// No file for this date.
    Missing,
    /// Exactly one file.
    Found(PathBuf),
    /// Several files claim the same date; the archive is ambiguous.
    Ambiguous(Vec<PathBuf>),
}

impl Located {
    fn from_matches(mut paths: Vec<PathBuf>) -> Self {
        match paths.len() {
            0 => Located::Missing,
            1 => Located::Found(paths.remove(0)),
            _ => Located::Ambiguous(paths),
        }
    }
}

/// Resolves dates to raster files in one archive directory.
#[derive(Debug, Clone)]
pub struct RasterLocator {
    archive_dir: PathBuf,
    product: String,
    kind: ProductKind,
}

impl RasterLocator {
    /// Create a locator.
    ///
    /// The product is checked first and fails with
    /// [`RasterError::UnknownProduct`] without touching the filesystem. A
    /// missing archive directory is [`RasterError::ArchiveNotFound`].
    pub fn new<P: AsRef<Path>>(archive_dir: P, product: &str) -> Result<Self> {
        let kind = ProductKind::from_product(product)?;
        let archive_dir = archive_dir.as_ref();
        if !archive_dir.is_dir() {
            return Err(RasterError::ArchiveNotFound(archive_dir.to_path_buf()));
        }
        Ok(Self {
            archive_dir: archive_dir.to_path_buf(),
            product: product.to_string(),
            kind,
        })
    }

    /// Archive directory being searched.
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Product identifier.
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Product family.
    pub fn kind(&self) -> ProductKind {
        self.kind
    }

    /// All files matching `(year, doy)`, sorted by path.
    pub fn matching_files(&self, year: i32, doy: u32) -> Result<Vec<PathBuf>> {
        let file_pattern = self.kind.file_pattern(&self.product, year, doy)?;
        let dir = glob::Pattern::escape(&self.archive_dir.to_string_lossy());
        let pattern = Path::new(&dir).join(&file_pattern).to_string_lossy().into_owned();

        let entries = glob::glob(&pattern).map_err(|source| RasterError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        let mut paths = entries.collect::<std::result::Result<Vec<_>, _>>()?;
        paths.retain(|p| p.is_file());
        paths.sort();

        debug!(pattern = %file_pattern, matches = paths.len(), "archive lookup");
        Ok(paths)
    }

    /// Look up `(year, doy)` and classify the result.
    pub fn locate(&self, year: i32, doy: u32) -> Result<Located> {
        Ok(Located::from_matches(self.matching_files(year, doy)?))
    }

    /// Look up a calendar date.
    pub fn locate_date(&self, date: NaiveDate) -> Result<Located> {
        self.locate(date.year(), date.ordinal())
    }
}
