//! Summary of a completed mosaic download.

use crate::coord::{TileCoord, TileRange};
use crate::fetch::FetchStatsSnapshot;
use crate::georef::GeoTransform;
use std::path::PathBuf;
use std::time::Duration;

/// Result of a successful [`download_mosaic`](super::MosaicDownloader::download_mosaic).
///
/// A report is returned even when tiles are missing; check
/// [`is_complete`](Self::is_complete) or [`missing`](Self::missing).
#[derive(Debug, Clone)]
pub struct MosaicReport {
    /// Path of the written GeoTIFF
    pub output_path: PathBuf,
    /// Tile range covered by the mosaic
    pub range: TileRange,
    /// Number of tiles in the range
    pub total_tiles: usize,
    /// Number of tiles that kept the background
    pub missing_tiles: usize,
    /// Missing tiles in row-major order
    pub missing: Vec<TileCoord>,
    /// Affine transform written to the file
    pub transform: GeoTransform,
    /// Fetch counters for the run
    pub stats: FetchStatsSnapshot,
    /// Highest number of requests that were in flight at once
    pub peak_in_flight: usize,
    /// Raster width in pixels
    pub width: u32,
    /// Raster height in pixels
    pub height: u32,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl MosaicReport {
    /// Returns true if every tile of the range was placed.
    pub fn is_complete(&self) -> bool {
        self.missing_tiles == 0
    }

    /// Fraction of tiles that are missing, in `[0, 1]`.
    pub fn missing_ratio(&self) -> f64 {
        missing_ratio(self.missing_tiles, self.total_tiles)
    }
}

pub(super) fn missing_ratio(missing: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        missing as f64 / total as f64
    }
}
