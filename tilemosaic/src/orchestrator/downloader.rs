//! End-to-end mosaic download.

use super::report::{missing_ratio, MosaicReport};
use super::state::MosaicState;
use crate::config::MosaicConfig;
use crate::coord::{tile_range, BoundingBox, TileCoord, TileRange};
use crate::error::MosaicError;
use crate::fetch::TileFetcher;
use crate::georef::{GeoTiffWriter, GeoTransform, WorldBounds};
use crate::mosaic::{assemble_into, Assembly, MosaicCanvas};
use crate::provider::{AsyncHttpClient, AsyncReqwestClient, LayerParams};
use crate::workdir::{WorkDirGuard, WorkingDirectory};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Downloads a bounding box as a georeferenced RGB mosaic.
///
/// Each run computes the tile range of the box, fetches every tile with at
/// most `max_concurrency` requests in flight, stitches them onto a canvas
/// sized from the range alone and writes the canvas as a GeoTIFF. Tiles
/// that cannot be fetched or decoded keep the background colour and are
/// listed in the [`MosaicReport`].
///
/// Runs on the same downloader are serialized because they share the
/// working directory. The directory is purged before and after every run,
/// whatever its outcome.
///
/// # Example
///
/// ```ignore
/// use tilemosaic::{BoundingBox, LayerParams, MosaicConfig, MosaicDownloader};
///
/// let downloader = MosaicDownloader::with_reqwest(MosaicConfig::default())?;
/// let bbox = BoundingBox::new(48.20, 16.30, 48.21, 16.31)?;
/// let report = downloader
///     .download_mosaic(&bbox, 19, &LayerParams::default(), "uploads/basemap_rgb.tif")
///     .await?;
/// println!("{} of {} tiles missing", report.missing_tiles, report.total_tiles);
/// ```
pub struct MosaicDownloader<C: AsyncHttpClient> {
    client: Arc<C>,
    config: MosaicConfig,
    work_dir: WorkingDirectory,
    state: AtomicU8,
    run_lock: Mutex<()>,
}

impl MosaicDownloader<AsyncReqwestClient> {
    /// Creates a downloader backed by a reqwest client using the configured
    /// request timeout.
    pub fn with_reqwest(config: MosaicConfig) -> Result<Self, MosaicError> {
        let client = AsyncReqwestClient::with_timeout(config.request_timeout())?;
        Ok(Self::new(Arc::new(client), config))
    }
}

impl<C: AsyncHttpClient> MosaicDownloader<C> {
    pub fn new(client: Arc<C>, config: MosaicConfig) -> Self {
        let work_dir = WorkingDirectory::new(config.work_dir());
        Self {
            client,
            config,
            work_dir,
            state: AtomicU8::new(MosaicState::Idle as u8),
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Returns the stage of the current or most recent run.
    pub fn state(&self) -> MosaicState {
        MosaicState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(MosaicState::Idle)
    }

    /// Downloads `bbox` at `zoom` from `layer` and writes it to `output`.
    pub async fn download_mosaic(
        &self,
        bbox: &BoundingBox,
        zoom: u8,
        layer: &LayerParams,
        output: impl AsRef<Path>,
    ) -> Result<MosaicReport, MosaicError> {
        self.download_mosaic_with_cancellation(bbox, zoom, layer, output, &CancellationToken::new())
            .await
    }

    /// Like [`download_mosaic`](Self::download_mosaic), aborting outstanding
    /// fetches when `cancellation` fires.
    ///
    /// Cancellation is honoured while tiles are being fetched; once assembly
    /// has started the run completes. A cancelled run leaves no output file
    /// and an empty working directory.
    pub async fn download_mosaic_with_cancellation(
        &self,
        bbox: &BoundingBox,
        zoom: u8,
        layer: &LayerParams,
        output: impl AsRef<Path>,
        cancellation: &CancellationToken,
    ) -> Result<MosaicReport, MosaicError> {
        let _run = self.run_lock.lock().await;
        let started = Instant::now();
        let output = output.as_ref().to_path_buf();

        self.state.store(MosaicState::Idle as u8, Ordering::Release);
        self.advance(MosaicState::RangeComputed);

        let (range, canvas, _cleanup) = match self.plan(bbox, zoom) {
            Ok(planned) => planned,
            Err(e) => {
                self.advance(MosaicState::Failed);
                warn!(error = %e, "Mosaic download failed before fetching");
                return Err(e);
            }
        };

        info!(
            zoom = zoom,
            min_x = range.min_x,
            max_x = range.max_x,
            min_y = range.min_y,
            max_y = range.max_y,
            tiles = range.tile_count(),
            width = canvas.width(),
            height = canvas.height(),
            "Tile range computed"
        );

        self.advance(MosaicState::Fetching);
        let fetcher = TileFetcher::new(Arc::clone(&self.client), self.config.fetch_options())
            .with_spool_dir(self.work_dir.path());
        let results = match fetcher.fetch_all(layer.requests_for(&range), cancellation).await {
            Ok(results) => results,
            Err(e) => {
                self.advance(MosaicState::Cancelled);
                return Err(e.into());
            }
        };
        let stats = fetcher.stats();
        let peak_in_flight = fetcher.limiter().peak_in_flight();

        self.advance(MosaicState::Assembling);
        let joined = tokio::task::spawn_blocking(move || assemble_into(canvas, results)).await;
        let assembly = self.finish_assembly(joined)?;

        let total_tiles = range.tile_count();
        let missing = assembly.missing;
        let canvas = assembly.canvas;
        let (width, height) = (canvas.width(), canvas.height());

        let written = self.write(canvas, &range, output.clone(), &missing).await;
        let transform = match written {
            Ok(transform) => transform,
            Err(e) => {
                self.advance(MosaicState::Failed);
                if let MosaicError::TooManyMissing { .. } = e {
                    warn!(error = %e, "Mosaic rejected");
                } else {
                    warn!(error = %e, path = %output.display(), "Failed to write mosaic");
                }
                return Err(e);
            }
        };

        if let Err(e) = self.work_dir.purge() {
            self.advance(MosaicState::Failed);
            warn!(
                error = %e,
                path = %self.work_dir.path().display(),
                "Failed to clean working directory"
            );
            return Err(e.into());
        }

        self.advance(MosaicState::Done);

        if !missing.is_empty() {
            warn!(
                missing = missing.len(),
                total = total_tiles,
                "Mosaic written with missing tiles"
            );
        }

        let report = MosaicReport {
            output_path: output,
            range,
            total_tiles,
            missing_tiles: missing.len(),
            missing,
            transform,
            stats,
            peak_in_flight,
            width,
            height,
            elapsed: started.elapsed(),
        };

        info!(
            path = %report.output_path.display(),
            width = report.width,
            height = report.height,
            tiles = report.total_tiles,
            missing = report.missing_tiles,
            bytes = report.stats.bytes_downloaded,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Mosaic written"
        );

        Ok(report)
    }

    /// Computes the range, allocates the canvas and prepares the working
    /// directory. Nothing touches the network before this succeeds.
    fn plan(
        &self,
        bbox: &BoundingBox,
        zoom: u8,
    ) -> Result<(TileRange, MosaicCanvas, WorkDirGuard), MosaicError> {
        let range = tile_range(bbox, zoom)?;
        let canvas = MosaicCanvas::new(range, self.config.tile_size(), self.config.background())?;
        self.work_dir.prepare()?;
        Ok((range, canvas, self.work_dir.guard()))
    }

    /// Enters `Writing` with the assembled canvas. A panicked assembly task
    /// leaves nothing to write and fails the run from there.
    fn finish_assembly(
        &self,
        joined: Result<Assembly, JoinError>,
    ) -> Result<Assembly, MosaicError> {
        self.advance(MosaicState::Writing);
        joined.map_err(|e| {
            self.advance(MosaicState::Failed);
            warn!(error = %e, "Mosaic assembly task failed");
            MosaicError::from(e)
        })
    }

    /// Applies the missing-tile threshold and writes the GeoTIFF on a
    /// blocking thread.
    async fn write(
        &self,
        canvas: MosaicCanvas,
        range: &TileRange,
        output: PathBuf,
        missing: &[TileCoord],
    ) -> Result<GeoTransform, MosaicError> {
        if let Some(max_ratio) = self.config.max_missing_ratio() {
            let total = range.tile_count();
            if missing_ratio(missing.len(), total) > max_ratio {
                return Err(MosaicError::TooManyMissing {
                    missing: missing.len(),
                    total,
                    max_ratio,
                    tiles: missing.to_vec(),
                });
            }
        }

        let bounds = WorldBounds::from_range(range, canvas.tile_size(), self.config.geo_frame());
        let transform =
            GeoTransform::from_bounds(&bounds, canvas.width(), canvas.height(), self.config.crs())?;
        let compression = self.config.compression();

        debug!(
            path = %output.display(),
            origin_x = transform.origin_x,
            origin_y = transform.origin_y,
            pixel_width = transform.pixel_width,
            pixel_height = transform.pixel_height,
            crs = %transform.crs,
            "Writing GeoTIFF"
        );

        tokio::task::spawn_blocking(move || {
            GeoTiffWriter::new(canvas.image(), &transform)
                .compression(compression)
                .write(&output)
        })
        .await??;

        Ok(transform)
    }

    /// Records a state transition, warning when it is not part of the
    /// lifecycle.
    fn advance(&self, next: MosaicState) {
        let previous = self.state();
        if previous.can_transition_to(next) {
            debug!(from = %previous, to = %next, "Mosaic state changed");
        } else {
            warn!(from = %previous, to = %next, "Unexpected mosaic state transition");
        }
        self.state.store(next as u8, Ordering::Release);
    }
}
