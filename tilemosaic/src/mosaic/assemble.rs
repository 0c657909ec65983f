//! Tile decoding and compositing.

use super::canvas::{AssemblyError, MosaicCanvas};
use crate::coord::{TileCoord, TileRange};
use crate::fetch::{TileBlock, TileResult};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Maximum number of decoded tiles held in memory at once, per worker.
const DECODE_BATCH_PER_THREAD: usize = 4;

/// Outcome of assembling a mosaic.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub canvas: MosaicCanvas,
    /// Tiles of the range that kept the background, in row-major order
    pub missing: Vec<TileCoord>,
}

impl Assembly {
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }
}

/// Builds the mosaic canvas for `range` from fetch results.
///
/// Allocates the canvas and hands it to [`assemble_into`].
pub fn assemble(
    results: Vec<TileResult>,
    range: &TileRange,
    tile_size: u32,
    background: Rgb<u8>,
) -> Result<Assembly, AssemblyError> {
    let canvas = MosaicCanvas::new(*range, tile_size, background)?;
    Ok(assemble_into(canvas, results))
}

/// Places fetch results onto an already allocated canvas.
///
/// Present tiles are decoded in parallel and then copied onto the canvas by
/// this thread alone. Absent, undecodable and unplaced tiles leave the
/// background in their region and are listed in [`Assembly::missing`].
/// Results for tiles outside the canvas range are logged and ignored.
///
/// CPU bound; call from a blocking thread.
pub fn assemble_into(mut canvas: MosaicCanvas, results: Vec<TileResult>) -> Assembly {
    let range = *canvas.range();
    let tile_size = canvas.tile_size();
    let mut placed = vec![false; range.tile_count()];

    debug!(
        width = canvas.width(),
        height = canvas.height(),
        results = results.len(),
        "Assembling mosaic"
    );

    let (in_range, out_of_range): (Vec<_>, Vec<_>) =
        results.into_iter().partition(|r| range.contains(&r.coord));

    for result in &out_of_range {
        warn!(tile = %result.coord, "Ignoring tile outside the mosaic range");
    }

    let mut present: Vec<(TileCoord, TileBlock)> = in_range
        .into_iter()
        .filter_map(|r| r.block.map(|block| (r.coord, block)))
        .collect();

    let batch_size = (rayon::current_num_threads() * DECODE_BATCH_PER_THREAD).max(1);
    let mut undecodable = 0usize;

    while !present.is_empty() {
        let rest = present.split_off(batch_size.min(present.len()));
        let batch = std::mem::replace(&mut present, rest);

        let decoded: Vec<(TileCoord, Option<RgbImage>)> = batch
            .into_par_iter()
            .map(|(coord, block)| {
                let tile = decode_tile(&coord, block, tile_size);
                (coord, tile)
            })
            .collect();

        // Single compositor: regions are disjoint so order does not matter
        for (coord, tile) in decoded {
            let Some(tile) = tile else {
                undecodable += 1;
                continue;
            };
            if canvas.place(&coord, &tile) {
                if let Some(index) = tile_index(&range, &coord) {
                    placed[index] = true;
                }
            }
        }
    }

    let missing: Vec<TileCoord> = range
        .tiles()
        .zip(placed.iter())
        .filter(|(_, placed)| !**placed)
        .map(|(coord, _)| coord)
        .collect();

    debug!(
        placed = range.tile_count() - missing.len(),
        missing = missing.len(),
        undecodable = undecodable,
        "Mosaic assembled"
    );

    Assembly { canvas, missing }
}

fn tile_index(range: &TileRange, coord: &TileCoord) -> Option<usize> {
    let (dx, dy) = range.offset_of(coord)?;
    Some(dy as usize * range.width_tiles() as usize + dx as usize)
}

/// Loads and decodes one tile, normalising it to `tile_size` RGB.
fn decode_tile(coord: &TileCoord, block: TileBlock, tile_size: u32) -> Option<RgbImage> {
    let data = match block.into_bytes() {
        Ok(data) => data,
        Err(e) => {
            warn!(tile = %coord, error = %e, "Failed to read spooled tile");
            return None;
        }
    };

    let image = match image::load_from_memory(&data) {
        Ok(image) => image.to_rgb8(),
        Err(e) => {
            warn!(tile = %coord, bytes = data.len(), error = %e, "Failed to decode tile");
            return None;
        }
    };

    if image.width() == tile_size && image.height() == tile_size {
        return Some(image);
    }

    warn!(
        tile = %coord,
        width = image.width(),
        height = image.height(),
        tile_size = tile_size,
        "Resizing tile with unexpected dimensions"
    );
    Some(imageops::resize(&image, tile_size, tile_size, FilterType::Triangle))
}
