//! The mosaic canvas.

use crate::coord::{TileCoord, TileRange};
use image::{imageops, Rgb, RgbImage};
use thiserror::Error;

/// Default edge length of a tile in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default fill colour for tiles that could not be placed.
pub const DEFAULT_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Errors raised while allocating the canvas.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Tile size must be at least 1 pixel")]
    InvalidTileSize,

    #[error("Canvas for {width_tiles}x{height_tiles} tiles of {tile_size}px is too large")]
    CanvasTooLarge {
        width_tiles: u32,
        height_tiles: u32,
        tile_size: u32,
    },
}

/// Pixel dimensions of the canvas for `range`, or `None` on overflow.
pub fn canvas_dimensions(range: &TileRange, tile_size: u32) -> Option<(u32, u32)> {
    let width = range.width_tiles().checked_mul(tile_size)?;
    let height = range.height_tiles().checked_mul(tile_size)?;

    // RGB8 buffer length must fit in memory addressing
    let len = u64::from(width)
        .checked_mul(u64::from(height))?
        .checked_mul(3)?;
    usize::try_from(len).ok()?;

    Some((width, height))
}

/// RGB raster covering a whole tile range.
///
/// Allocated at full size before any tile is placed, so its dimensions
/// depend only on the range and the tile size. Each tile owns the disjoint
/// `tile_size` square at its offset, which makes placement order irrelevant.
#[derive(Debug, Clone)]
pub struct MosaicCanvas {
    image: RgbImage,
    range: TileRange,
    tile_size: u32,
}

impl MosaicCanvas {
    /// Allocates a canvas filled with `background`.
    pub fn new(range: TileRange, tile_size: u32, background: Rgb<u8>) -> Result<Self, AssemblyError> {
        if tile_size == 0 {
            return Err(AssemblyError::InvalidTileSize);
        }

        let (width, height) =
            canvas_dimensions(&range, tile_size).ok_or(AssemblyError::CanvasTooLarge {
                width_tiles: range.width_tiles(),
                height_tiles: range.height_tiles(),
                tile_size,
            })?;

        Ok(Self {
            image: RgbImage::from_pixel(width, height, background),
            range,
            tile_size,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn range(&self) -> &TileRange {
        &self.range
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Pixel offset of the top-left corner of `coord`, if it is in range.
    pub fn pixel_offset(&self, coord: &TileCoord) -> Option<(u32, u32)> {
        let (dx, dy) = self.range.offset_of(coord)?;
        Some((dx * self.tile_size, dy * self.tile_size))
    }

    /// Copies `tile` into the region owned by `coord`.
    ///
    /// Returns `false` without touching the canvas if `coord` lies outside
    /// the range. Pixels of `tile` beyond `tile_size` are clipped.
    pub fn place(&mut self, coord: &TileCoord, tile: &RgbImage) -> bool {
        let Some((x, y)) = self.pixel_offset(coord) else {
            return false;
        };

        if tile.width() <= self.tile_size && tile.height() <= self.tile_size {
            imageops::replace(&mut self.image, tile, i64::from(x), i64::from(y));
        } else {
            let clipped = imageops::crop_imm(
                tile,
                0,
                0,
                self.tile_size.min(tile.width()),
                self.tile_size.min(tile.height()),
            )
            .to_image();
            imageops::replace(&mut self.image, &clipped, i64::from(x), i64::from(y));
        }
        true
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
