//! Integration tests for end-to-end mosaic downloads.
//!
//! These tests drive [`MosaicDownloader`] against in-process tile clients
//! and verify:
//! - Tile placement on the canvas and in the written GeoTIFF
//! - Canvas dimensions independent of fetch outcomes
//! - The concurrency bound on in-flight requests
//! - Transform round trips and footprint coverage
//! - Cancellation, cleanup and repeated runs

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tilemosaic::coord::tile_range;
use tilemosaic::georef::{
    read_geotiff_info, read_geotiff_rgb, GeoFrame, GeoTiffCompression, WorldBounds,
};
use tilemosaic::provider::{AsyncHttpClient, ProviderError};
use tilemosaic::{
    BoundingBox, LayerParams, MosaicConfig, MosaicDownloader, MosaicError, MosaicState,
};
use tokio_util::sync::CancellationToken;

// =============================================================================
// Test Helpers
// =============================================================================

fn encode_png(size: u32, color: [u8; 3]) -> Vec<u8> {
    let mut buffer = Vec::new();
    RgbImage::from_pixel(size, size, Rgb(color))
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

/// Extracts `(x, y)` from a `.../{zoom}/{y}/{x}.{ext}` tile URL.
fn parse_xy(url: &str) -> (u32, u32) {
    let mut parts = url.rsplit('/');
    let file = parts.next().unwrap();
    let y = parts.next().unwrap().parse().unwrap();
    let x = file.split('.').next().unwrap().parse().unwrap();
    (x, y)
}

fn marker(x: u32, y: u32) -> [u8; 3] {
    [(x * 20 % 256) as u8, (y * 20 % 256) as u8, 77]
}

/// Serves a solid tile whose colour encodes its coordinates, tracking how
/// many requests are in flight.
struct MarkerClient {
    tile_size: u32,
    delay: Duration,
    requests: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MarkerClient {
    fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            delay: Duration::ZERO,
            requests: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl AsyncHttpClient for MarkerClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let (x, y) = parse_xy(url);
        let body = encode_png(self.tile_size, marker(x, y));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(body)
    }
}

/// Serves the same payload for every tile.
struct ConstantClient {
    body: Vec<u8>,
}

impl AsyncHttpClient for ConstantClient {
    async fn get(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(self.body.clone())
    }
}

/// Fails every request.
struct FailingClient {
    requests: AtomicUsize,
}

impl AsyncHttpClient for FailingClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Status {
            status: 503,
            url: url.to_string(),
        })
    }
}

/// Answers tiles in even columns at once and never answers the others.
struct StallingClient {
    tile_size: u32,
}

impl AsyncHttpClient for StallingClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let (x, y) = parse_xy(url);
        if x % 2 == 1 {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(encode_png(self.tile_size, marker(x, y)))
    }
}

fn config(dir: &Path, tile_size: u32) -> MosaicConfig {
    MosaicConfig::default()
        .with_tile_size(tile_size)
        .with_work_dir(dir.join("downloaded_tiles"))
}

/// 4x2 tiles at zoom 3: x 2..=5, y 3..=4.
fn small_bbox() -> BoundingBox {
    BoundingBox::new(-30.0, -80.0, 30.0, 80.0).unwrap()
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_marker_tiles_land_at_their_offsets() {
    let temp = tempfile::tempdir().unwrap();
    let ts = 8;
    let downloader = MosaicDownloader::new(
        Arc::new(MarkerClient::new(ts)),
        config(temp.path(), ts).with_compression(GeoTiffCompression::Lzw),
    );
    let output = temp.path().join("uploads").join("mosaic.tif");

    let report = downloader
        .download_mosaic(&small_bbox(), 3, &LayerParams::default(), &output)
        .await
        .unwrap();

    let range = report.range;
    assert_eq!((range.min_x, range.max_x, range.min_y, range.max_y), (2, 5, 3, 4));
    assert!(report.is_complete());

    let raster = read_geotiff_rgb(&output).unwrap();
    assert_eq!(raster.dimensions(), (32, 16));
    for tile in range.tiles() {
        let px = (tile.x - range.min_x) * ts;
        let py = (tile.y - range.min_y) * ts;
        let expected = Rgb(marker(tile.x, tile.y));
        assert_eq!(*raster.get_pixel(px, py), expected, "tile {}", tile);
        assert_eq!(*raster.get_pixel(px + ts - 1, py + ts - 1), expected, "tile {}", tile);
    }
}

#[tokio::test]
async fn test_all_fetches_failing_yields_background_canvas() {
    let temp = tempfile::tempdir().unwrap();
    let client = Arc::new(FailingClient {
        requests: AtomicUsize::new(0),
    });
    let downloader = MosaicDownloader::new(
        Arc::clone(&client),
        config(temp.path(), 8).with_background(Rgb([12, 34, 56])),
    );
    let output = temp.path().join("mosaic.tif");

    let report = downloader
        .download_mosaic(&small_bbox(), 3, &LayerParams::default(), &output)
        .await
        .unwrap();

    assert_eq!(downloader.state(), MosaicState::Done);
    assert_eq!(report.total_tiles, 8);
    assert_eq!(report.missing_tiles, 8);
    assert_eq!(report.stats.tiles_failed, 8);
    assert_eq!(client.requests.load(Ordering::SeqCst), 8);

    let raster = read_geotiff_rgb(&output).unwrap();
    assert_eq!(raster.dimensions(), (32, 16));
    assert!(raster.pixels().all(|p| *p == Rgb([12, 34, 56])));
}

#[tokio::test]
async fn test_vienna_scenario_dimensions() {
    let temp = tempfile::tempdir().unwrap();
    let client = ConstantClient {
        body: encode_png(256, [90, 120, 60]),
    };
    let downloader = MosaicDownloader::new(Arc::new(client), config(temp.path(), 256));
    let bbox = BoundingBox::new(48.20, 16.30, 48.21, 16.31).unwrap();
    let output = temp.path().join("basemap_rgb.tif");

    let report = downloader
        .download_mosaic(&bbox, 19, &LayerParams::default(), &output)
        .await
        .unwrap();

    let range = report.range;
    assert_eq!((range.min_x, range.max_x), (285882, 285897));
    assert_eq!((range.min_y, range.max_y), (181792, 181813));
    assert_eq!(report.total_tiles, 352);
    assert!(report.is_complete());

    let info = read_geotiff_info(&output).unwrap();
    assert_eq!((info.width, info.height), (4096, 5632));
    assert_eq!(info.bands, 3);
    assert_eq!(info.bits_per_sample, 8);
    assert_eq!(info.crs.map(|c| c.epsg()), Some(3857));
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let temp = tempfile::tempdir().unwrap();
    let client = Arc::new(MarkerClient::new(8).with_delay(Duration::from_millis(5)));
    let downloader = MosaicDownloader::new(
        Arc::clone(&client),
        config(temp.path(), 8).with_max_concurrency(3),
    );

    // 16x6 tiles at zoom 5
    let report = downloader
        .download_mosaic(
            &small_bbox(),
            5,
            &LayerParams::default(),
            temp.path().join("mosaic.tif"),
        )
        .await
        .unwrap();

    assert_eq!(report.total_tiles, 96);
    assert_eq!(client.requests.load(Ordering::SeqCst), 96);
    let peak = client.peak.load(Ordering::SeqCst);
    assert!(peak >= 1);
    assert!(peak <= 3, "peak in flight was {}", peak);
    assert!(report.peak_in_flight <= 3);
}

#[tokio::test]
async fn test_transform_round_trip_and_footprint() {
    let temp = tempfile::tempdir().unwrap();
    let ts = 8;
    let downloader =
        MosaicDownloader::new(Arc::new(MarkerClient::new(ts)), config(temp.path(), ts));
    let bbox = small_bbox();
    let output = temp.path().join("mosaic.tif");

    let report = downloader
        .download_mosaic(&bbox, 3, &LayerParams::default(), &output)
        .await
        .unwrap();

    let bounds = WorldBounds::from_range(&report.range, ts, GeoFrame::TileGrid);
    let transform = report.transform;
    assert_eq!(transform.pixel_to_world(0.0, 0.0), (bounds.west, bounds.north));
    assert_eq!(
        transform.pixel_to_world(f64::from(report.width), f64::from(report.height)),
        (bounds.east, bounds.south)
    );
    assert!(bounds.covers(&WorldBounds::of_bbox(&bbox, 3, ts, GeoFrame::TileGrid)));

    let written = read_geotiff_info(&output).unwrap().transform.unwrap();
    assert_eq!(written.coefficients(), transform.coefficients());
}

#[tokio::test]
async fn test_web_mercator_frame_is_north_up() {
    let temp = tempfile::tempdir().unwrap();
    let downloader = MosaicDownloader::new(
        Arc::new(MarkerClient::new(8)),
        config(temp.path(), 8).with_geo_frame(GeoFrame::WebMercator),
    );
    let output = temp.path().join("mosaic.tif");

    let report = downloader
        .download_mosaic(&small_bbox(), 3, &LayerParams::default(), &output)
        .await
        .unwrap();

    assert!(report.transform.is_north_up());
    let written = read_geotiff_info(&output).unwrap().transform.unwrap();
    assert!(written.is_north_up());
    assert!((written.origin_x - report.transform.origin_x).abs() < 1e-6);
    assert!((written.origin_y - report.transform.origin_y).abs() < 1e-6);
}

#[tokio::test]
async fn test_cancellation_cleans_up() {
    let temp = tempfile::tempdir().unwrap();
    let work_dir = temp.path().join("downloaded_tiles");
    let downloader = MosaicDownloader::new(
        Arc::new(StallingClient { tile_size: 8 }),
        config(temp.path(), 8),
    );
    let output = temp.path().join("mosaic.tif");

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = downloader
        .download_mosaic_with_cancellation(
            &small_bbox(),
            3,
            &LayerParams::default(),
            &output,
            &token,
        )
        .await
        .unwrap_err();

    match err {
        MosaicError::Cancelled { completed, total } => {
            assert_eq!(total, 8);
            assert!(completed < total);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(downloader.state(), MosaicState::Cancelled);
    assert!(!output.exists());
    assert!(is_empty_dir(&work_dir));
}

#[tokio::test]
async fn test_repeated_runs_start_clean() {
    let temp = tempfile::tempdir().unwrap();
    let work_dir = temp.path().join("downloaded_tiles");
    std::fs::create_dir_all(&work_dir).unwrap();
    std::fs::write(work_dir.join("tile_999_999"), b"stale").unwrap();

    let downloader =
        MosaicDownloader::new(Arc::new(MarkerClient::new(8)), config(temp.path(), 8));
    let output = temp.path().join("mosaic.tif");

    let first = downloader
        .download_mosaic(&small_bbox(), 3, &LayerParams::default(), &output)
        .await
        .unwrap();
    assert!(is_empty_dir(&work_dir));

    let second = downloader
        .download_mosaic(&small_bbox(), 3, &LayerParams::default(), &output)
        .await
        .unwrap();
    assert!(is_empty_dir(&work_dir));

    assert_eq!(first.range, second.range);
    assert_eq!(first.missing_tiles, second.missing_tiles);
    assert_eq!(read_geotiff_info(&output).unwrap().width, 32);
}

#[tokio::test]
async fn test_invalid_zoom_makes_no_requests() {
    let temp = tempfile::tempdir().unwrap();
    let client = Arc::new(FailingClient {
        requests: AtomicUsize::new(0),
    });
    let downloader = MosaicDownloader::new(Arc::clone(&client), config(temp.path(), 8));

    let err = downloader
        .download_mosaic(
            &small_bbox(),
            25,
            &LayerParams::default(),
            temp.path().join("mosaic.tif"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MosaicError::InvalidRange(_)));
    assert_eq!(downloader.state(), MosaicState::Failed);
    assert_eq!(client.requests.load(Ordering::SeqCst), 0);
}

#[test]
fn test_invalid_bounding_box_is_rejected() {
    assert!(BoundingBox::new(48.21, 16.30, 48.20, 16.31).is_err());
    assert!(BoundingBox::new(f64::NAN, 16.30, 48.21, 16.31).is_err());
    assert!(BoundingBox::new(48.20, 16.30, 48.21, 190.0).is_err());
}

#[tokio::test]
async fn test_canvas_dimensions_follow_range_only() {
    let temp = tempfile::tempdir().unwrap();
    let bbox = small_bbox();
    let range = tile_range(&bbox, 3).unwrap();

    let failing = MosaicDownloader::new(
        Arc::new(FailingClient {
            requests: AtomicUsize::new(0),
        }),
        config(temp.path(), 8),
    );
    // Odd columns time out
    let partial = MosaicDownloader::new(
        Arc::new(StallingClient { tile_size: 8 }),
        config(temp.path(), 8).with_request_timeout(Duration::from_millis(50)),
    );

    let a = failing
        .download_mosaic(&bbox, 3, &LayerParams::default(), temp.path().join("a.tif"))
        .await
        .unwrap();
    let b = partial
        .download_mosaic(&bbox, 3, &LayerParams::default(), temp.path().join("b.tif"))
        .await
        .unwrap();

    let expected = (range.width_tiles() * 8, range.height_tiles() * 8);
    assert_eq!((a.width, a.height), expected);
    assert_eq!((b.width, b.height), expected);
    assert_eq!(b.missing_tiles, 4);
}
