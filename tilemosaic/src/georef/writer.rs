//! GeoTIFF writer for mosaic canvases.

use super::transform::GeoTransform;
use super::GeoTiffError;
use image::RgbImage;
use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tiff::encoder::colortype::RGB8;
use tiff::encoder::{Compression, DeflateLevel, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::{debug, warn};

// GeoTIFF tag IDs (not in the tiff crate)
pub(crate) const GEOTIFF_MODELPIXELSCALE: u16 = 33550;
pub(crate) const GEOTIFF_MODELTIEPOINT: u16 = 33922;
pub(crate) const GEOTIFF_MODELTRANSFORMATION: u16 = 34264;
pub(crate) const GEOTIFF_GEOKEYDIRECTORY: u16 = 34735;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
pub(crate) const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub(crate) const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

// GeoKey values
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Suffix of the temporary file written before the final rename.
const PARTIAL_SUFFIX: &str = ".partial";

/// Compression method for GeoTIFF output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoTiffCompression {
    /// No compression
    #[default]
    None,
    /// LZW compression
    Lzw,
    /// Deflate (zlib) compression
    Deflate,
}

/// Writes an RGB canvas as a 3-band 8-bit GeoTIFF.
///
/// ```ignore
/// GeoTiffWriter::new(canvas.image(), &transform)
///     .compression(GeoTiffCompression::Lzw)
///     .write("uploads/basemap_rgb.tif")?;
/// ```
pub struct GeoTiffWriter<'a> {
    image: &'a RgbImage,
    transform: &'a GeoTransform,
    compression: GeoTiffCompression,
}

impl<'a> GeoTiffWriter<'a> {
    #[must_use]
    pub fn new(image: &'a RgbImage, transform: &'a GeoTransform) -> Self {
        Self {
            image,
            transform,
            compression: GeoTiffCompression::default(),
        }
    }

    #[must_use]
    pub fn compression(mut self, compression: GeoTiffCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Writes the GeoTIFF to `path`, creating parent directories.
    ///
    /// The data goes to a `.partial` sibling first and is renamed into place
    /// once complete, so `path` never holds a truncated file. An existing
    /// file at `path` is replaced.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), GeoTiffError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let partial = partial_path(path);
        let result = self.write_file(&partial).and_then(|()| {
            fs::rename(&partial, path)?;
            Ok(())
        });

        match &result {
            Ok(()) => debug!(
                path = %path.display(),
                width = self.image.width(),
                height = self.image.height(),
                "GeoTIFF written"
            ),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "GeoTIFF write failed");
                if let Err(e) = fs::remove_file(&partial) {
                    debug!(path = %partial.display(), error = %e, "No partial file to remove");
                }
            }
        }

        result
    }

    fn write_file(&self, path: &Path) -> Result<(), GeoTiffError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the GeoTIFF to any seekable writer.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<(), GeoTiffError> {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return Err(GeoTiffError::InvalidData(
                "Raster has zero dimensions".to_string(),
            ));
        }

        let compression = match self.compression {
            GeoTiffCompression::None => Compression::Uncompressed,
            GeoTiffCompression::Lzw => Compression::Lzw,
            GeoTiffCompression::Deflate => Compression::Deflate(DeflateLevel::Balanced),
        };

        let mut encoder = TiffEncoder::new(writer)?.with_compression(compression);
        let mut image = encoder.new_image::<RGB8>(width, height)?;
        write_geotiff_tags(image.encoder(), self.transform)?;
        image.write_data(self.image.as_raw())?;

        Ok(())
    }

    /// Encodes the GeoTIFF into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>, GeoTiffError> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }
}

/// Path of the temporary file used while writing `path`.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

fn write_geotiff_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
) -> Result<(), GeoTiffError> {
    if transform.is_north_up() {
        // ModelPixelScale: [ScaleX, ScaleY, ScaleZ], ScaleY positive for north-up
        let pixel_scale = [transform.pixel_width, -transform.pixel_height, 0.0];
        dir.write_tag(Tag::Unknown(GEOTIFF_MODELPIXELSCALE), &pixel_scale[..])?;

        // ModelTiepoint: pixel (0, 0) at the origin
        let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
        dir.write_tag(Tag::Unknown(GEOTIFF_MODELTIEPOINT), &tiepoint[..])?;
    } else {
        // Row-major 4x4 matrix; the scale form cannot express y growing with rows
        let matrix = [
            transform.pixel_width,
            0.0,
            0.0,
            transform.origin_x,
            0.0,
            transform.pixel_height,
            0.0,
            transform.origin_y,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ];
        dir.write_tag(Tag::Unknown(GEOTIFF_MODELTRANSFORMATION), &matrix[..])?;
    }

    let geokeys = build_geokey_directory(transform);
    dir.write_tag(Tag::Unknown(GEOTIFF_GEOKEYDIRECTORY), &geokeys[..])?;

    Ok(())
}

fn build_geokey_directory(transform: &GeoTransform) -> Vec<u16> {
    // [KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys,
    //  KeyID, TIFFTagLocation, Count, Value_Offset, ...]
    let mut keys = vec![1, 1, 0, 3];
    let crs = transform.crs;

    let model_type = if crs.is_geographic() {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    keys.extend_from_slice(&[GT_MODEL_TYPE_GEO_KEY, 0, 1, model_type]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);

    let crs_key = if crs.is_geographic() {
        GEOGRAPHIC_TYPE_GEO_KEY
    } else {
        PROJECTED_CS_TYPE_GEO_KEY
    };
    keys.extend_from_slice(&[crs_key, 0, 1, crs.epsg()]);

    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::georef::Crs;
    use image::Rgb;

    fn transform(pixel_height: f64, crs: Crs) -> GeoTransform {
        GeoTransform {
            origin_x: 1000.0,
            origin_y: 2000.0,
            pixel_width: 1.0,
            pixel_height,
            crs,
        }
    }

    #[test]
    fn test_writes_tiff_magic() {
        let image = RgbImage::from_pixel(16, 8, Rgb([10, 20, 30]));
        let bytes = GeoTiffWriter::new(&image, &transform(1.0, Crs::default()))
            .to_bytes()
            .unwrap();

        assert!(bytes.len() > 16 * 8 * 3);
        assert!(bytes.starts_with(b"II") || bytes.starts_with(b"MM"));
    }

    #[test]
    fn test_geokeys_for_projected_crs() {
        let keys = build_geokey_directory(&transform(-1.0, Crs::WEB_MERCATOR));
        assert_eq!(&keys[..4], &[1, 1, 0, 3]);
        assert_eq!(&keys[4..8], &[GT_MODEL_TYPE_GEO_KEY, 0, 1, MODEL_TYPE_PROJECTED]);
        assert_eq!(&keys[12..16], &[PROJECTED_CS_TYPE_GEO_KEY, 0, 1, 3857]);
    }

    #[test]
    fn test_geokeys_for_geographic_crs() {
        let keys = build_geokey_directory(&transform(-1.0, Crs::WGS84));
        assert_eq!(keys[7], MODEL_TYPE_GEOGRAPHIC);
        assert_eq!(&keys[12..16], &[GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, 4326]);
    }

    #[test]
    fn test_zero_sized_image_rejected() {
        let image = RgbImage::new(0, 0);
        let err = GeoTiffWriter::new(&image, &transform(1.0, Crs::default()))
            .to_bytes()
            .unwrap_err();
        assert!(matches!(err, GeoTiffError::InvalidData(_)));
    }

    #[test]
    fn test_write_creates_parents_and_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uploads").join("basemap_rgb.tif");
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));

        GeoTiffWriter::new(&image, &transform(1.0, Crs::default()))
            .write(&path)
            .unwrap();

        assert!(path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");
        std::fs::write(&path, b"stale").unwrap();
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));

        GeoTiffWriter::new(&image, &transform(-1.0, Crs::default()))
            .write(&path)
            .unwrap();

        assert_ne!(std::fs::read(&path).unwrap(), b"stale");
    }

    #[test]
    fn test_failed_write_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in place of the output file makes the rename fail
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();
        let image = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));

        let result = GeoTiffWriter::new(&image, &transform(1.0, Crs::default())).write(&path);

        assert!(result.is_err());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_partial_path_is_sibling() {
        let path = Path::new("/tmp/out/mosaic.tif");
        assert_eq!(partial_path(path), Path::new("/tmp/out/mosaic.tif.partial"));
    }
}
