//! Minimal GeoTIFF writer for single-band float grids.
//!
//! Produces files that [`RasterFile::from_file`](crate::RasterFile::from_file)
//! reads back: pixel scale, tiepoint, GeoKey directory and, optionally, a
//! GDAL_NODATA tag.

use crate::georef::{Crs, RasterGeoreference};
use crate::raster::{
    geotiff_tag, KEY_GEOGRAPHIC_TYPE, KEY_MODEL_TYPE, KEY_PROJECTED_CS_TYPE, KEY_RASTER_TYPE,
    MODEL_TYPE_GEOGRAPHIC, MODEL_TYPE_PROJECTED, TAG_GDAL_NODATA, TAG_GEO_KEY_DIRECTORY,
    TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT,
};
use crate::{RasterError, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};

const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Write a north-up single-band `f32` GeoTIFF.
pub fn write_geotiff<P: AsRef<Path>>(
    path: P,
    georef: &RasterGeoreference,
    width: u32,
    height: u32,
    data: &[f32],
    nodata: Option<f32>,
) -> Result<()> {
    let expected = width as usize * height as usize;
    if data.len() != expected {
        return Err(RasterError::ShapeMismatch {
            expected,
            actual: data.len(),
        });
    }

    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file)?;
    let mut image = encoder.new_image::<colortype::Gray32Float>(width, height)?;

    let scale = [georef.xres, georef.yres.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, georef.x0, georef.y0, 0.0];
    image
        .encoder()
        .write_tag(geotiff_tag(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
    image
        .encoder()
        .write_tag(geotiff_tag(TAG_MODEL_TIEPOINT), &tiepoint[..])?;

    let geokeys = geokey_directory(georef.crs);
    image
        .encoder()
        .write_tag(geotiff_tag(TAG_GEO_KEY_DIRECTORY), &geokeys[..])?;

    if let Some(nodata) = nodata {
        let text = nodata.to_string();
        image
            .encoder()
            .write_tag(geotiff_tag(TAG_GDAL_NODATA), text.as_str())?;
    }

    image.write_data(data)?;
    Ok(())
}

fn geokey_directory(crs: Crs) -> Vec<u16> {
    let mut entries: Vec<[u16; 4]> = vec![[KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]];
    match crs {
        Crs::Geographic(code) => {
            entries.insert(0, [KEY_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
            entries.push([KEY_GEOGRAPHIC_TYPE, 0, 1, code]);
        }
        Crs::Projected(code) => {
            entries.insert(0, [KEY_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
            entries.push([KEY_PROJECTED_CS_TYPE, 0, 1, code]);
        }
        Crs::Unknown => {}
    }

    let mut directory = vec![1, 1, 0, entries.len() as u16];
    directory.extend(entries.into_iter().flatten());
    directory
}
