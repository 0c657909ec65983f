//! Georeferencing and GeoTIFF output
//!
//! Computes the world footprint of a tile range, derives the affine
//! pixel-to-world transform for the mosaic canvas and writes the canvas as
//! a GeoTIFF carrying that transform and an EPSG code.
//!
//! Two frames are supported for world coordinates:
//!
//! - [`GeoFrame::TileGrid`] (default): global tile-grid pixel units, where
//!   the range spans `min_x * tile_size .. (max_x + 1) * tile_size`
//!   horizontally and likewise vertically.
//! - [`GeoFrame::WebMercator`]: EPSG:3857 metres.
//!
//! # Example
//!
//! ```ignore
//! use tilemosaic::georef::{Crs, GeoFrame, GeoTiffWriter, GeoTransform, WorldBounds};
//!
//! let bounds = WorldBounds::from_range(&range, 256, GeoFrame::TileGrid);
//! let transform = GeoTransform::from_bounds(&bounds, width, height, Crs::default())?;
//! GeoTiffWriter::new(canvas.image(), &transform).write("mosaic.tif")?;
//! ```

mod crs;
mod reader;
mod transform;
mod writer;

pub use crs::{Crs, ParseCrsError};
pub use reader::{read_geotiff_info, read_geotiff_rgb, GeoTiffInfo};
pub use transform::{GeoFrame, GeoTransform, WorldBounds};
pub use writer::{partial_path, GeoTiffCompression, GeoTiffWriter};

use thiserror::Error;

/// Errors raised while georeferencing or writing the output raster.
#[derive(Debug, Error)]
pub enum GeoTiffError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<tiff::TiffError> for GeoTiffError {
    fn from(e: tiff::TiffError) -> Self {
        match e {
            tiff::TiffError::IoError(e) => Self::Io(e),
            other => Self::Tiff(other.to_string()),
        }
    }
}
