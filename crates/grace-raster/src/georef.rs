//! Raster georeferencing and coordinate to pixel conversion.
//!
//! Only north-up, axis-aligned rasters are supported: the transform is fully
//! described by the top-left origin and the pixel size. Rotated rasters are
//! rejected when the file is opened rather than silently mis-indexed.

use std::fmt;

/// Coordinate reference system declared by a raster's GeoKey directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    /// Geographic CRS (latitude/longitude degrees) with its EPSG code.
    Geographic(u16),
    /// Projected CRS with its EPSG code.
    Projected(u16),
    /// No usable CRS information in the file.
    #[default]
    Unknown,
}

impl Crs {
    /// WGS 84 geographic coordinates.
    pub const WGS84: Crs = Crs::Geographic(4326);

    /// True for geographic systems, whose coordinates line up with site lat/lon.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic(_))
    }

    /// EPSG code if known.
    pub fn epsg(&self) -> Option<u16> {
        match self {
            Crs::Geographic(code) | Crs::Projected(code) => Some(*code),
            Crs::Unknown => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg() {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "unknown CRS"),
        }
    }
}

/// Integer pixel position. Signed so that coordinates west or north of the
/// origin produce negative, clearly out-of-bounds indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelIndex {
    /// Row, counted southward from the top edge.
    pub row: i64,
    /// Column, counted eastward from the left edge.
    pub col: i64,
}

impl PixelIndex {
    /// Create a pixel index.
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// Row-major offset into a `width x height` buffer, or `None` if outside.
    pub fn offset(&self, width: u32, height: u32) -> Option<usize> {
        if self.row < 0 || self.col < 0 {
            return None;
        }
        let (row, col) = (self.row as u64, self.col as u64);
        if row >= height as u64 || col >= width as u64 {
            return None;
        }
        Some((row * width as u64 + col) as usize)
    }
}

/// Origin and pixel size of a north-up raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterGeoreference {
    /// X (longitude) of the top-left corner of the top-left pixel.
    pub x0: f64,
    /// Y (latitude) of the top-left corner of the top-left pixel.
    pub y0: f64,
    /// Pixel width, positive.
    pub xres: f64,
    /// Pixel height, conventionally negative (rows run southward).
    pub yres: f64,
    /// Coordinate reference system of x0/y0 and the pixel sizes.
    pub crs: Crs,
}

impl RasterGeoreference {
    /// Create a georeference with an unknown CRS.
    pub fn new(x0: f64, y0: f64, xres: f64, yres: f64) -> Self {
        Self {
            x0,
            y0,
            xres,
            yres,
            crs: Crs::Unknown,
        }
    }

    /// Attach a CRS.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    /// Convert a coordinate to the pixel that contains it.
    ///
    /// `column = floor((lon - x0) / xres)`, `row = floor((y0 - lat) / |yres|)`.
    /// The coordinate must already be in the raster's CRS; no reprojection
    /// happens here.
    pub fn pixel_index(&self, lat: f64, lon: f64) -> PixelIndex {
        let col = ((lon - self.x0) / self.xres).floor();
        let row = ((self.y0 - lat) / self.yres.abs()).floor();
        PixelIndex {
            row: row as i64,
            col: col as i64,
        }
    }

    /// Coordinate `(lat, lon)` of the centre of a pixel.
    pub fn pixel_center(&self, index: PixelIndex) -> (f64, f64) {
        let lat = self.y0 - (index.row as f64 + 0.5) * self.yres.abs();
        let lon = self.x0 + (index.col as f64 + 0.5) * self.xres;
        (lat, lon)
    }

    /// Whether the pixel sizes describe a usable north-up grid.
    pub fn is_valid(&self) -> bool {
        self.x0.is_finite()
            && self.y0.is_finite()
            && self.xres.is_finite()
            && self.yres.is_finite()
            && self.xres > 0.0
            && self.yres != 0.0
    }
}
