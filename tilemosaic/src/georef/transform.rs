//! World bounds and the pixel-to-world affine transform.

use super::crs::Crs;
use super::GeoTiffError;
use crate::coord::{fractional_tile_position, tiles_per_axis, BoundingBox, TileRange};
use std::f64::consts::PI;

/// Equatorial radius used by EPSG:3857.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Slack for floating point noise when comparing footprints.
const FOOTPRINT_EPSILON: f64 = 1e-6;

/// Units in which world bounds are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeoFrame {
    /// Global tile-grid pixels: tile `x` spans `x * tile_size ..
    /// (x + 1) * tile_size`, with `y` growing southwards.
    #[default]
    TileGrid,
    /// EPSG:3857 metres, `y` growing northwards.
    WebMercator,
}

impl GeoFrame {
    /// Maps a fractional tile position to frame units.
    fn project(&self, fx: f64, fy: f64, zoom: u8, tile_size: u32) -> (f64, f64) {
        match self {
            GeoFrame::TileGrid => (fx * f64::from(tile_size), fy * f64::from(tile_size)),
            GeoFrame::WebMercator => {
                let n = f64::from(tiles_per_axis(zoom));
                let circumference = 2.0 * PI * EARTH_RADIUS_M;
                let half = circumference / 2.0;
                (fx / n * circumference - half, half - fy / n * circumference)
            }
        }
    }
}

/// Edges of a raster footprint in frame units.
///
/// `north` is the edge at pixel row 0 and `south` the edge at the last row,
/// whatever their numeric order in the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl WorldBounds {
    /// Footprint of every tile in `range`.
    ///
    /// In the tile-grid frame this is `west = min_x * ts`, `north = min_y * ts`,
    /// `east = (max_x + 1) * ts`, `south = (max_y + 1) * ts`.
    pub fn from_range(range: &TileRange, tile_size: u32, frame: GeoFrame) -> Self {
        let (west, north) = frame.project(
            f64::from(range.min_x),
            f64::from(range.min_y),
            range.zoom,
            tile_size,
        );
        let (east, south) = frame.project(
            f64::from(range.max_x) + 1.0,
            f64::from(range.max_y) + 1.0,
            range.zoom,
            tile_size,
        );

        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Footprint of the bounding box itself at `zoom`.
    pub fn of_bbox(bbox: &BoundingBox, zoom: u8, tile_size: u32, frame: GeoFrame) -> Self {
        let (north_lat, west_lon) = bbox.north_west();
        let (south_lat, east_lon) = bbox.south_east();

        // The clamped latitude limit lies a hair outside the grid
        let n = f64::from(tiles_per_axis(zoom));
        let grid = |(fx, fy): (f64, f64)| (fx.clamp(0.0, n), fy.clamp(0.0, n));

        let (fx_w, fy_n) = grid(fractional_tile_position(north_lat, west_lon, zoom));
        let (fx_e, fy_s) = grid(fractional_tile_position(south_lat, east_lon, zoom));

        let (west, north) = frame.project(fx_w, fy_n, zoom, tile_size);
        let (east, south) = frame.project(fx_e, fy_s, zoom, tile_size);

        Self {
            west,
            south,
            east,
            north,
        }
    }

    pub fn width(&self) -> f64 {
        (self.east - self.west).abs()
    }

    pub fn height(&self) -> f64 {
        (self.north - self.south).abs()
    }

    /// True if `other` lies entirely inside these bounds.
    pub fn covers(&self, other: &WorldBounds) -> bool {
        let (x0, x1) = ordered(self.west, self.east);
        let (y0, y1) = ordered(self.south, self.north);
        let (ox0, ox1) = ordered(other.west, other.east);
        let (oy0, oy1) = ordered(other.south, other.north);

        x0 <= ox0 + FOOTPRINT_EPSILON
            && x1 + FOOTPRINT_EPSILON >= ox1
            && y0 <= oy0 + FOOTPRINT_EPSILON
            && y1 + FOOTPRINT_EPSILON >= oy1
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Affine mapping from pixel `(col, row)` to world `(x, y)`:
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is signed: negative for the usual north-up rasters,
/// positive when world `y` grows with the row index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub crs: Crs,
}

impl GeoTransform {
    /// Builds the transform that stretches `bounds` over a `width` x
    /// `height` raster, with pixel (0, 0) at (west, north).
    pub fn from_bounds(
        bounds: &WorldBounds,
        width: u32,
        height: u32,
        crs: Crs,
    ) -> Result<Self, GeoTiffError> {
        if width == 0 || height == 0 {
            return Err(GeoTiffError::InvalidData(format!(
                "Raster has zero dimensions ({}x{})",
                width, height
            )));
        }

        let values = [bounds.west, bounds.south, bounds.east, bounds.north];
        if values.iter().any(|v| !v.is_finite())
            || bounds.west == bounds.east
            || bounds.north == bounds.south
        {
            return Err(GeoTiffError::InvalidData(format!(
                "Degenerate world bounds {:?}",
                bounds
            )));
        }

        Ok(Self {
            origin_x: bounds.west,
            origin_y: bounds.north,
            pixel_width: (bounds.east - bounds.west) / f64::from(width),
            pixel_height: (bounds.south - bounds.north) / f64::from(height),
            crs,
        })
    }

    /// World coordinates of the top-left corner of pixel `(col, row)`.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Inverse of [`pixel_to_world`](Self::pixel_to_world).
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    pub fn is_north_up(&self) -> bool {
        self.pixel_height < 0.0
    }

    /// Coefficients in `(a, b, c, d, e, f)` order: `x = a*col + b*row + c`,
    /// `y = d*col + e*row + f`.
    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.pixel_width,
            0.0,
            self.origin_x,
            0.0,
            self.pixel_height,
            self.origin_y,
        ]
    }
}
