//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, and computes the tile rectangle that
//! covers a bounding box.

mod types;


pub use types::{
    BoundingBox, CoordError, TileCoord, TileRange, TileRangeIter, MAX_LAT, MAX_LON, MAX_ZOOM,
    MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Number of tiles per axis at `zoom`.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom
}

/// Converts geographic coordinates to fractional tile coordinates.
///
/// The integer part is the tile index and the fractional part the position
/// inside that tile. Latitude is clamped to the Web Mercator range, so the
/// poles map to the top and bottom edges of the grid instead of infinity.
#[inline]
pub fn fractional_tile_position(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);
    let lat = lat.clamp(MIN_LAT, MAX_LAT);

    let x = (lon + 180.0) / 360.0 * n;

    // ln(tan φ + sec φ) == asinh(tan φ)
    let lat_rad = lat.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    (x, y)
}

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees, clamped to ±85.05112878
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 24)
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are invalid.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !lat.is_finite() {
        return Err(CoordError::NonFinite(lat));
    }
    if !lon.is_finite() {
        return Err(CoordError::NonFinite(lon));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let (fx, fy) = fractional_tile_position(lat, lon, zoom);

    // lon = 180 and the clamped southern edge land exactly on n
    let last = tiles_per_axis(zoom) - 1;
    let x = (fx.floor().max(0.0) as u32).min(last);
    let y = (fy.floor().max(0.0) as u32).min(last);

    Ok(TileCoord::new(x, y, zoom))
}

/// Computes the inclusive tile rectangle covering `bbox` at `zoom`.
///
/// The north-west corner `(lat_max, lon_min)` yields `(min_x, min_y)` and the
/// south-east corner `(lat_min, lon_max)` yields `(max_x, max_y)`.
pub fn tile_range(bbox: &BoundingBox, zoom: u8) -> Result<TileRange, CoordError> {
    let (north, west) = bbox.north_west();
    let (south, east) = bbox.south_east();

    let nw = to_tile_coords(north, west, zoom)?;
    let se = to_tile_coords(south, east, zoom)?;

    TileRange::new(nw.x, se.x, nw.y, se.y, zoom)
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad.to_degrees();

    (lat, lon)
}
