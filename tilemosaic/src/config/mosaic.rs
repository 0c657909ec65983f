//! Mosaic download configuration.

use crate::fetch::{
    FetchOptions, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_RETRIES, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::georef::{Crs, GeoFrame, GeoTiffCompression};
use crate::mosaic::{DEFAULT_BACKGROUND, DEFAULT_TILE_SIZE};
use crate::workdir::DEFAULT_WORK_DIR;
use image::Rgb;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parameters of a mosaic download.
///
/// # Example
///
/// ```
/// use tilemosaic::config::MosaicConfig;
///
/// let config = MosaicConfig::default();
/// assert_eq!(config.tile_size(), 256);
/// assert_eq!(config.max_concurrency(), 20);
///
/// let config = MosaicConfig::new()
///     .with_max_concurrency(8)
///     .with_work_dir("/tmp/tiles");
/// assert_eq!(config.max_concurrency(), 8);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicConfig {
    /// Edge length of a tile in pixels
    tile_size: u32,
    /// Maximum number of requests in flight
    max_concurrency: usize,
    /// Timeout for a single request attempt
    request_timeout: Duration,
    /// Extra attempts per tile for retryable failures
    max_retries: u32,
    /// Completions between progress log lines
    progress_interval: usize,
    /// Scratch directory for spooled tiles
    work_dir: PathBuf,
    /// CRS written to the output
    crs: Crs,
    /// Fill colour of missing tiles
    background: Rgb<u8>,
    /// Output compression
    compression: GeoTiffCompression,
    /// Units of the output transform
    geo_frame: GeoFrame,
    /// Fail when more than this fraction of tiles is missing
    max_missing_ratio: Option<f64>,
}

impl MosaicConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tile edge length in pixels. Default: 256.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Set the maximum number of concurrent requests. Default: 20.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the per-request timeout. Default: 30 seconds.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the number of extra attempts for retryable failures.
    ///
    /// Default: 0, so every tile gets exactly one GET.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Log progress every `interval` completed tiles. Default: 50.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the scratch directory. Default: `downloaded_tiles`.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Set the CRS written to the output. Default: EPSG:3857.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    /// Set the fill colour of missing tiles. Default: black.
    pub fn with_background(mut self, background: Rgb<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn with_compression(mut self, compression: GeoTiffCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_geo_frame(mut self, frame: GeoFrame) -> Self {
        self.geo_frame = frame;
        self
    }

    /// Fail downloads where more than `ratio` of the tiles are missing.
    ///
    /// Default: `None`, missing tiles are only reported.
    pub fn with_max_missing_ratio(mut self, ratio: Option<f64>) -> Self {
        self.max_missing_ratio = ratio;
        self
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn progress_interval(&self) -> usize {
        self.progress_interval
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn background(&self) -> Rgb<u8> {
        self.background
    }

    pub fn compression(&self) -> GeoTiffCompression {
        self.compression
    }

    pub fn geo_frame(&self) -> GeoFrame {
        self.geo_frame
    }

    pub fn max_missing_ratio(&self) -> Option<f64> {
        self.max_missing_ratio
    }

    /// Options for the tile fetcher.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_concurrency: self.max_concurrency,
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
            progress_interval: self.progress_interval,
        }
    }
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            crs: Crs::default(),
            background: DEFAULT_BACKGROUND,
            compression: GeoTiffCompression::default(),
            geo_frame: GeoFrame::default(),
            max_missing_ratio: None,
        }
    }
}
