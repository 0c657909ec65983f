//! Mosaic assembly
//!
//! Stitches fetched tiles into one RGB canvas. The canvas covers the whole
//! tile range, so a tile at `(x, y)` lands at pixel offset
//! `((x - min_x) * tile_size, (y - min_y) * tile_size)`.

mod assemble;
mod canvas;

pub use assemble::{assemble, assemble_into, Assembly};
pub use canvas::{
    canvas_dimensions, AssemblyError, MosaicCanvas, DEFAULT_BACKGROUND, DEFAULT_TILE_SIZE,
};
