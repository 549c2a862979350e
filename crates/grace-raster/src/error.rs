//! Error types for the raster crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when locating or reading archive rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The file is a TIFF but not a usable single-band GeoTIFF.
    #[error("Invalid GeoTIFF {path}: {reason}")]
    InvalidGeoTiff {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The product identifier does not belong to any known naming convention.
    #[error("Unknown product '{0}': expected an id containing GRD-3, MCD, VNP, VJ1 or LC08")]
    UnknownProduct(String),

    /// The archive directory does not exist or is not a directory.
    #[error("Archive directory {0} does not exist or is not a directory")]
    ArchiveNotFound(PathBuf),

    /// A day-of-year outside the given year.
    #[error("Day-of-year {doy} is not valid for year {year}")]
    InvalidDayOfYear {
        /// Requested year.
        year: i32,
        /// Requested day-of-year.
        doy: u32,
    },

    /// The computed file-name pattern could not be compiled.
    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern that failed.
        pattern: String,
        /// Underlying glob error.
        #[source]
        source: glob::PatternError,
    },

    /// A directory entry could not be read while matching files.
    #[error("Archive scan failed: {0}")]
    Glob(#[from] glob::GlobError),

    /// Pixel buffer does not match the declared raster shape.
    #[error("Pixel buffer has {actual} samples, expected {expected}")]
    ShapeMismatch {
        /// Samples implied by width x height.
        expected: usize,
        /// Samples actually supplied or decoded.
        actual: usize,
    },
}

impl RasterError {
    /// Whether this error describes bad configuration rather than bad data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RasterError::UnknownProduct(_)
                | RasterError::ArchiveNotFound(_)
                | RasterError::InvalidPattern { .. }
        )
    }
}
