//! # grace-raster
//!
//! Archive lookup and point sampling for monthly gridded groundwater anomaly
//! rasters (GRACE Tellus land mass grids and related single-band products).
//!
//! ## Overview
//!
//! The archive is a flat directory of GeoTIFF files whose names encode the
//! product and the date they represent. This crate answers three questions:
//!
//! - which file (if any) holds a given product on a given day ([`RasterLocator`])
//! - which pixel contains a given latitude/longitude ([`RasterGeoreference`])
//! - what valid value that pixel holds ([`PixelSampler`])
//!
//! Rasters are assumed to be north-up and unrotated. Nothing is reprojected
//! or interpolated: a site reads exactly the pixel it falls in.
//!
//! ## Example
//!
//! ```no_run
//! use grace_raster::{Located, PixelSampler, RasterLocator};
//!
//! let locator = RasterLocator::new("/data/grace", "GRD-3")?;
//! if let Located::Found(path) = locator.locate(2020, 74)? {
//!     let sampler = PixelSampler::default();
//!     let (_crs, samples) = sampler.sample_coordinates(&path, &[(38.9, -77.0)])?;
//!     println!("DC anomaly: {:?}", samples[0].value());
//! }
//! # Ok::<(), grace_raster::RasterError>(())
//! ```

mod error;
mod georef;
mod locator;
mod raster;
mod writer;

pub use error::RasterError;
pub use georef::{Crs, PixelIndex, RasterGeoreference};
pub use locator::{format_doy, Located, ProductKind, RasterLocator};
pub use raster::{PixelSampler, RasterFile, Sample, DEFAULT_NODATA};
pub use writer::write_geotiff;

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
