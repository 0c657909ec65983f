//! Coordinate type definitions

use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported zoom levels. 2^24 tiles per axis still fits comfortably in `u32`.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 24;

/// Tile coordinates in the Web Mercator / slippy map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
    /// X coordinate (east-west), 0 at west
    pub x: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Creates a tile coordinate.
    #[inline]
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { y, x, zoom }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Geographic area of interest in degrees.
///
/// Always satisfies `lat_min < lat_max` and `lon_min < lon_max`; use
/// [`BoundingBox::new`] to construct one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    lat_min: f64,
    lon_min: f64,
    lat_max: f64,
    lon_max: f64,
}

impl BoundingBox {
    /// Creates a validated bounding box.
    ///
    /// Latitudes outside the Web Mercator range are accepted here and clamped
    /// during tile conversion. Longitudes must lie within [-180, 180].
    pub fn new(lat_min: f64, lon_min: f64, lat_max: f64, lon_max: f64) -> Result<Self, CoordError> {
        for value in [lat_min, lon_min, lat_max, lon_max] {
            if !value.is_finite() {
                return Err(CoordError::NonFinite(value));
            }
        }
        for lon in [lon_min, lon_max] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        if lat_min >= lat_max || lon_min >= lon_max {
            return Err(CoordError::InvalidBoundingBox {
                lat_min,
                lon_min,
                lat_max,
                lon_max,
            });
        }

        Ok(Self {
            lat_min,
            lon_min,
            lat_max,
            lon_max,
        })
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    /// North-west corner as (lat, lon).
    pub fn north_west(&self) -> (f64, f64) {
        (self.lat_max, self.lon_min)
    }

    /// South-east corner as (lat, lon).
    pub fn south_east(&self) -> (f64, f64) {
        (self.lat_min, self.lon_max)
    }
}

/// Inclusive rectangle of tiles covering a bounding box at one zoom level.
///
/// The north-west tile is `(min_x, min_y)` and the south-east tile is
/// `(max_x, max_y)`. Both bounds are inclusive, so a bounding box inside a
/// single tile yields a 1×1 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRange {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
    pub zoom: u8,
}

impl TileRange {
    /// Creates a range, rejecting inverted bounds.
    pub fn new(min_x: u32, max_x: u32, min_y: u32, max_y: u32, zoom: u8) -> Result<Self, CoordError> {
        if min_x > max_x || min_y > max_y {
            return Err(CoordError::EmptyRange {
                min_x,
                max_x,
                min_y,
                max_y,
            });
        }
        Ok(Self {
            min_x,
            max_x,
            min_y,
            max_y,
            zoom,
        })
    }

    /// Number of tile columns.
    #[inline]
    pub fn width_tiles(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Number of tile rows.
    #[inline]
    pub fn height_tiles(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Total number of tiles in the range.
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.width_tiles() as usize * self.height_tiles() as usize
    }

    /// Returns true if the tile lies inside this range at the same zoom.
    #[inline]
    pub fn contains(&self, tile: &TileCoord) -> bool {
        tile.zoom == self.zoom
            && (self.min_x..=self.max_x).contains(&tile.x)
            && (self.min_y..=self.max_y).contains(&tile.y)
    }

    /// Tile offset of `tile` relative to the north-west corner, in tiles.
    ///
    /// Returns `None` if the tile is outside the range.
    #[inline]
    pub fn offset_of(&self, tile: &TileCoord) -> Option<(u32, u32)> {
        if !self.contains(tile) {
            return None;
        }
        Some((tile.x - self.min_x, tile.y - self.min_y))
    }

    /// Iterates all tiles in row-major order (north row first, west to east).
    #[inline]
    pub fn tiles(&self) -> TileRangeIter {
        TileRangeIter {
            range: *self,
            current: 0,
        }
    }
}

impl fmt::Display for TileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z{} x[{}..={}] y[{}..={}]",
            self.zoom, self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

/// Iterator over all tiles of a [`TileRange`] in row-major order.
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    range: TileRange,
    current: usize,
}

impl Iterator for TileRangeIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.range.tile_count() {
            return None;
        }

        let width = self.range.width_tiles() as usize;
        let x = self.range.min_x + (self.current % width) as u32;
        let y = self.range.min_y + (self.current / width) as u32;

        self.current += 1;

        Some(TileCoord::new(x, y, self.range.zoom))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.range.tile_count() - self.current;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileRangeIter {}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// A coordinate is NaN or infinite
    NonFinite(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    InvalidLongitude(f64),
    /// Zoom level is outside valid range
    InvalidZoom(u8),
    /// Bounding box is degenerate or inverted
    InvalidBoundingBox {
        lat_min: f64,
        lon_min: f64,
        lat_max: f64,
        lon_max: f64,
    },
    /// Tile range has no tiles
    EmptyRange {
        min_x: u32,
        max_x: u32,
        min_y: u32,
        max_y: u32,
    },
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::NonFinite(value) => {
                write!(f, "Invalid coordinate: {} is not a finite number", value)
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::InvalidBoundingBox {
                lat_min,
                lon_min,
                lat_max,
                lon_max,
            } => {
                write!(
                    f,
                    "Invalid bounding box: lat [{}, {}], lon [{}, {}] (min must be below max)",
                    lat_min, lat_max, lon_min, lon_max
                )
            }
            CoordError::EmptyRange {
                min_x,
                max_x,
                min_y,
                max_y,
            } => {
                write!(
                    f,
                    "Empty tile range: x [{}, {}], y [{}, {}]",
                    min_x, max_x, min_y, max_y
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
