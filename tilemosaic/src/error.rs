//! Top-level error type for mosaic downloads.

use crate::coord::{CoordError, TileCoord};
use crate::fetch::FetchError;
use crate::georef::GeoTiffError;
use crate::mosaic::AssemblyError;
use crate::provider::ProviderError;
use crate::workdir::WorkDirError;
use thiserror::Error;

/// Errors that abort a mosaic download.
///
/// Individual tile failures are not errors: they are counted in the
/// [`MosaicReport`](crate::orchestrator::MosaicReport) instead.
#[derive(Debug, Error)]
pub enum MosaicError {
    /// The bounding box or zoom level does not describe a tile range
    #[error("Invalid tile range: {0}")]
    InvalidRange(#[from] CoordError),

    /// The HTTP client could not be created
    #[error("Tile source unavailable: {0}")]
    Provider(#[from] ProviderError),

    /// The working directory could not be prepared
    #[error("Working directory error: {0}")]
    WorkDir(#[from] WorkDirError),

    /// The canvas for the range cannot be allocated
    #[error("Cannot build mosaic: {0}")]
    Assembly(#[from] AssemblyError),

    /// The output raster could not be georeferenced or written
    #[error("Failed to write GeoTIFF: {0}")]
    Write(#[from] GeoTiffError),

    /// The cancellation token fired while tiles were being fetched
    #[error("Download cancelled after {completed} of {total} tiles")]
    Cancelled { completed: usize, total: usize },

    /// More tiles are missing than the configured ratio allows
    #[error("{missing} of {total} tiles missing, more than the allowed ratio {max_ratio}")]
    TooManyMissing {
        missing: usize,
        total: usize,
        max_ratio: f64,
        tiles: Vec<TileCoord>,
    },

    /// A blocking task failed to complete
    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<FetchError> for MosaicError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Cancelled { completed, total } => Self::Cancelled { completed, total },
        }
    }
}

impl From<tokio::task::JoinError> for MosaicError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
