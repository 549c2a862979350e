//! Single-band GeoTIFF rasters and point sampling.

use crate::georef::{Crs, PixelIndex, RasterGeoreference};
use crate::{RasterError, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::trace;

/// Nodata sentinel used by the archive products.
pub const DEFAULT_NODATA: f32 = -99999.0;

pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
pub(crate) const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const TAG_GDAL_NODATA: u16 = 42113;

pub(crate) const KEY_MODEL_TYPE: u16 = 1024;
pub(crate) const KEY_RASTER_TYPE: u16 = 1025;
pub(crate) const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
pub(crate) const KEY_PROJECTED_CS_TYPE: u16 = 3072;

pub(crate) const MODEL_TYPE_PROJECTED: u16 = 1;
pub(crate) const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Resolve a numeric GeoTIFF tag the same way the decoder keys its IFD, so
/// lookups work whether or not `tiff` names the tag.
pub(crate) fn geotiff_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// A single-band raster loaded fully into memory.
#[derive(Debug)]
pub struct RasterFile {
    path: PathBuf,
    /// Samples in row-major order (north to south, west to east).
    data: Vec<f64>,
    width: u32,
    height: u32,
    georef: RasterGeoreference,
    /// GDAL_NODATA value declared by the file, if any.
    file_nodata: Option<f64>,
}

impl RasterFile {
    /// Load a raster from a GeoTIFF file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let mut decoder = Decoder::new(file)?;

        // Global grids at fine resolution exceed the decoder's default limits
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => {
                return Err(RasterError::InvalidGeoTiff {
                    path: path.to_path_buf(),
                    reason: format!("expected a single band, found {:?}", other),
                })
            }
        }

        let georef = Self::read_georeference(&mut decoder, path)?;
        let file_nodata = Self::read_nodata_value(&mut decoder);
        let data = Self::decode_samples(&mut decoder)?;

        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RasterError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }

        trace!(path = %path.display(), width, height, crs = %georef.crs, "opened raster");

        Ok(Self {
            path: path.to_path_buf(),
            data,
            width,
            height,
            georef,
            file_nodata,
        })
    }

    /// Build a raster from an in-memory grid.
    pub fn from_parts(
        georef: RasterGeoreference,
        width: u32,
        height: u32,
        data: Vec<f64>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RasterError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            path: PathBuf::new(),
            data,
            width,
            height,
            georef,
            file_nodata: None,
        })
    }

    /// Read origin and pixel size from the GeoTIFF tags.
    fn read_georeference<R: Read + Seek>(
        decoder: &mut Decoder<R>,
        path: &Path,
    ) -> Result<RasterGeoreference> {
        let invalid = |reason: &str| RasterError::InvalidGeoTiff {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let keys = decoder
            .get_tag_u16_vec(geotiff_tag(TAG_GEO_KEY_DIRECTORY))
            .map(|dir| GeoKeys::parse(&dir))
            .unwrap_or_default();

        let mut georef = if let Ok(matrix) =
            decoder.get_tag_f64_vec(geotiff_tag(TAG_MODEL_TRANSFORMATION))
        {
            if matrix.len() < 8 {
                return Err(invalid("ModelTransformation has fewer than 8 terms"));
            }
            // x = a*col + b*row + d ; y = e*col + f*row + h
            if matrix[1] != 0.0 || matrix[4] != 0.0 {
                return Err(invalid("rotated rasters are not supported"));
            }
            RasterGeoreference::new(matrix[3], matrix[7], matrix[0], matrix[5])
        } else {
            let tiepoint = decoder
                .get_tag_f64_vec(geotiff_tag(TAG_MODEL_TIEPOINT))
                .map_err(|_| invalid("missing ModelTiepoint tag"))?;
            let scale = decoder
                .get_tag_f64_vec(geotiff_tag(TAG_MODEL_PIXEL_SCALE))
                .map_err(|_| invalid("missing ModelPixelScale tag"))?;
            if tiepoint.len() < 6 || scale.len() < 2 {
                return Err(invalid("short ModelTiepoint or ModelPixelScale tag"));
            }
            // Tiepoint: [i, j, k, x, y, z] ties pixel (i, j) to model (x, y)
            let (i, j) = (tiepoint[0], tiepoint[1]);
            let (sx, sy) = (scale[0], scale[1]);
            RasterGeoreference::new(tiepoint[3] - i * sx, tiepoint[4] + j * sy, sx, -sy)
        };

        if keys.raster_type == Some(RASTER_PIXEL_IS_POINT) {
            georef.x0 -= georef.xres / 2.0;
            georef.y0 += georef.yres.abs() / 2.0;
        }
        georef.crs = keys.crs();

        if !georef.is_valid() {
            return Err(invalid("non-finite origin or zero pixel size"));
        }
        Ok(georef)
    }

    /// Decode the band into f64 samples regardless of storage type.
    fn decode_samples<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f64>> {
        let result = decoder.read_image()?;

        match result {
            DecodingResult::F32(data) => Ok(data.into_iter().map(f64::from).collect()),
            DecodingResult::F64(data) => Ok(data),
            DecodingResult::I16(data) => Ok(data.into_iter().map(f64::from).collect()),
            DecodingResult::I32(data) => Ok(data.into_iter().map(f64::from).collect()),
            DecodingResult::U16(data) => Ok(data.into_iter().map(f64::from).collect()),
            DecodingResult::U32(data) => Ok(data.into_iter().map(f64::from).collect()),
            DecodingResult::U8(data) => Ok(data.into_iter().map(f64::from).collect()),
            DecodingResult::I8(data) => Ok(data.into_iter().map(f64::from).collect()),
            DecodingResult::U64(data) => Ok(data.into_iter().map(|v| v as f64).collect()),
            DecodingResult::I64(data) => Ok(data.into_iter().map(|v| v as f64).collect()),
        }
    }

    /// GDAL_NODATA is stored as an ASCII string.
    fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
        decoder
            .get_tag_ascii_string(geotiff_tag(TAG_GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok())
    }

    /// Path this raster was read from (empty for in-memory rasters).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Georeference of this raster.
    pub fn georeference(&self) -> &RasterGeoreference {
        &self.georef
    }

    /// Dimensions `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Nodata value declared in the file, if any.
    pub fn file_nodata(&self) -> Option<f64> {
        self.file_nodata
    }

    /// Raw sample at a pixel, `None` when outside the grid.
    pub fn get_pixel(&self, index: PixelIndex) -> Option<f64> {
        index
            .offset(self.width, self.height)
            .map(|offset| self.data[offset])
    }
}

/// Parsed subset of a GeoKey directory.
#[derive(Debug, Default)]
struct GeoKeys {
    model_type: Option<u16>,
    raster_type: Option<u16>,
    geographic_type: Option<u16>,
    projected_type: Option<u16>,
}

impl GeoKeys {
    /// Header is `[version, revision, minor, count]`, then `count` entries of
    /// `[key, location, count, value]`. Only inline short values are read.
    fn parse(directory: &[u16]) -> Self {
        let mut keys = GeoKeys::default();
        if directory.len() < 4 {
            return keys;
        }
        let count = directory[3] as usize;
        for entry in directory[4..].chunks_exact(4).take(count) {
            let (key, location, value) = (entry[0], entry[1], entry[3]);
            if location != 0 {
                continue;
            }
            match key {
                KEY_MODEL_TYPE => keys.model_type = Some(value),
                KEY_RASTER_TYPE => keys.raster_type = Some(value),
                KEY_GEOGRAPHIC_TYPE => keys.geographic_type = Some(value),
                KEY_PROJECTED_CS_TYPE => keys.projected_type = Some(value),
                _ => {}
            }
        }
        keys
    }

    fn crs(&self) -> Crs {
        match (self.model_type, self.projected_type, self.geographic_type) {
            (Some(MODEL_TYPE_PROJECTED), Some(code), _) => Crs::Projected(code),
            (Some(MODEL_TYPE_GEOGRAPHIC), _, Some(code)) => Crs::Geographic(code),
            (None, Some(code), _) => Crs::Projected(code),
            (None, None, Some(code)) => Crs::Geographic(code),
            _ => Crs::Unknown,
        }
    }
}

/// Outcome of sampling one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// A valid physical value.
    Value(f64),
    /// The pixel holds the nodata sentinel (or NaN).
    NoData,
    /// The requested pixel lies outside the raster.
    OutOfBounds,
}

impl Sample {
    /// The value, if valid.
    pub fn value(&self) -> Option<f64> {
        match self {
            Sample::Value(v) => Some(*v),
            Sample::NoData | Sample::OutOfBounds => None,
        }
    }
}

/// Extracts point values from single-band rasters.
///
/// Each call opens the raster, reads the band, samples it and drops it again;
/// nothing is kept open between calls.
#[derive(Debug, Clone, Copy)]
pub struct PixelSampler {
    nodata: f32,
}

impl Default for PixelSampler {
    fn default() -> Self {
        Self::new(DEFAULT_NODATA)
    }
}

impl PixelSampler {
    /// Create a sampler that masks the given nodata sentinel.
    pub fn new(nodata: f32) -> Self {
        Self { nodata }
    }

    /// The sentinel this sampler masks.
    pub fn nodata(&self) -> f32 {
        self.nodata
    }

    /// Sample an already opened raster at the given pixels.
    pub fn sample_raster(&self, raster: &RasterFile, pixels: &[PixelIndex]) -> Vec<Sample> {
        pixels
            .iter()
            .map(|&index| match raster.get_pixel(index) {
                None => Sample::OutOfBounds,
                Some(v) if self.is_nodata(v, raster.file_nodata) => Sample::NoData,
                Some(v) => Sample::Value(v),
            })
            .collect()
    }

    /// Open `path` and sample it at the given pixels.
    pub fn sample_pixels<P: AsRef<Path>>(
        &self,
        path: P,
        pixels: &[PixelIndex],
    ) -> Result<Vec<Sample>> {
        let raster = RasterFile::from_file(path)?;
        Ok(self.sample_raster(&raster, pixels))
    }

    /// Open `path` and sample it at `(lat, lon)` coordinates, indexing each
    /// coordinate with the georeference read from this very file.
    pub fn sample_coordinates<P: AsRef<Path>>(
        &self,
        path: P,
        coordinates: &[(f64, f64)],
    ) -> Result<(Crs, Vec<Sample>)> {
        let raster = RasterFile::from_file(path)?;
        let georef = *raster.georeference();
        let pixels: Vec<PixelIndex> = coordinates
            .iter()
            .map(|&(lat, lon)| georef.pixel_index(lat, lon))
            .collect();
        Ok((georef.crs, self.sample_raster(&raster, &pixels)))
    }

    /// Sentinels are compared at f32 precision.
    fn is_nodata(&self, value: f64, file_nodata: Option<f64>) -> bool {
        let narrow = value as f32;
        value.is_nan()
            || narrow == self.nodata
            || file_nodata.is_some_and(|nodata| value == nodata || narrow == nodata as f32)
    }
}
