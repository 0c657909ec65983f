//! GeoTIFF metadata reader.

use super::crs::Crs;
use super::transform::GeoTransform;
use super::writer::{
    GEOGRAPHIC_TYPE_GEO_KEY, GEOTIFF_GEOKEYDIRECTORY, GEOTIFF_MODELPIXELSCALE,
    GEOTIFF_MODELTIEPOINT, GEOTIFF_MODELTRANSFORMATION, PROJECTED_CS_TYPE_GEO_KEY,
};
use super::GeoTiffError;
use image::RgbImage;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

/// Basic layout and georeferencing of a GeoTIFF.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTiffInfo {
    pub width: u32,
    pub height: u32,
    pub bands: u16,
    pub bits_per_sample: u8,
    /// EPSG code from the GeoKey directory
    pub crs: Option<Crs>,
    /// Transform from the model tags; uses the default CRS when no EPSG
    /// key is present
    pub transform: Option<GeoTransform>,
}

/// Reads the dimensions, band layout and georeferencing of the first image.
pub fn read_geotiff_info<P: AsRef<Path>>(path: P) -> Result<GeoTiffInfo, GeoTiffError> {
    let mut decoder = open(path.as_ref())?;

    let (width, height) = decoder.dimensions()?;
    let (bands, bits_per_sample) = match decoder.colortype()? {
        ColorType::Gray(bits) => (1, bits),
        ColorType::GrayA(bits) => (2, bits),
        ColorType::RGB(bits) => (3, bits),
        ColorType::RGBA(bits) => (4, bits),
        other => {
            return Err(GeoTiffError::InvalidData(format!(
                "Unsupported colour type {:?}",
                other
            )))
        }
    };

    let crs = read_crs(&mut decoder)?;
    let transform = read_transform(&mut decoder, crs.unwrap_or_default())?;

    Ok(GeoTiffInfo {
        width,
        height,
        bands,
        bits_per_sample,
        crs,
        transform,
    })
}

/// Decodes an 8-bit RGB GeoTIFF into an image.
pub fn read_geotiff_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage, GeoTiffError> {
    let mut decoder = open(path.as_ref())?;
    let (width, height) = decoder.dimensions()?;

    if decoder.colortype()? != ColorType::RGB(8) {
        return Err(GeoTiffError::InvalidData(
            "Expected 8-bit RGB samples".to_string(),
        ));
    }

    match decoder.read_image()? {
        DecodingResult::U8(data) => RgbImage::from_raw(width, height, data).ok_or_else(|| {
            GeoTiffError::InvalidData("Pixel buffer does not match dimensions".to_string())
        }),
        _ => Err(GeoTiffError::InvalidData(
            "Expected 8-bit samples".to_string(),
        )),
    }
}

fn open(path: &Path) -> Result<Decoder<BufReader<File>>, GeoTiffError> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?)
}

fn optional_f64_vec<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    tag: u16,
) -> Result<Option<Vec<f64>>, GeoTiffError> {
    if decoder.find_tag(Tag::Unknown(tag))?.is_none() {
        return Ok(None);
    }
    Ok(Some(decoder.get_tag_f64_vec(Tag::Unknown(tag))?))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<Crs>, GeoTiffError> {
    if decoder
        .find_tag(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY))?
        .is_none()
    {
        return Ok(None);
    }
    let keys = decoder.get_tag_u16_vec(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY))?;

    // Skip the 4-entry header, then walk [KeyID, Location, Count, Value]
    let crs = keys
        .get(4..)
        .unwrap_or_default()
        .chunks_exact(4)
        .find(|entry| {
            (entry[0] == PROJECTED_CS_TYPE_GEO_KEY || entry[0] == GEOGRAPHIC_TYPE_GEO_KEY)
                && entry[1] == 0
        })
        .map(|entry| Crs::from_epsg(entry[3]));

    Ok(crs)
}

fn read_transform<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    crs: Crs,
) -> Result<Option<GeoTransform>, GeoTiffError> {
    if let Some(matrix) = optional_f64_vec(decoder, GEOTIFF_MODELTRANSFORMATION)? {
        if matrix.len() < 8 {
            return Err(GeoTiffError::InvalidData(
                "ModelTransformation has fewer than 8 values".to_string(),
            ));
        }
        return Ok(Some(GeoTransform {
            origin_x: matrix[3],
            origin_y: matrix[7],
            pixel_width: matrix[0],
            pixel_height: matrix[5],
            crs,
        }));
    }

    let scale = optional_f64_vec(decoder, GEOTIFF_MODELPIXELSCALE)?;
    let tiepoint = optional_f64_vec(decoder, GEOTIFF_MODELTIEPOINT)?;

    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            let pixel_width = scale[0];
            let pixel_height = -scale[1];
            Ok(Some(GeoTransform {
                origin_x: tie[3] - tie[0] * pixel_width,
                origin_y: tie[4] - tie[1] * pixel_height,
                pixel_width,
                pixel_height,
                crs,
            }))
        }
        _ => Ok(None),
    }
}
