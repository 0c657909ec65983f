//! Fetch result and option types.

use crate::coord::TileCoord;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default maximum number of requests in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;
/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of extra attempts per tile (0 = a single GET).
pub const DEFAULT_MAX_RETRIES: u32 = 0;
/// Default number of completions between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 50;

/// Encoded image data for one fetched tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileBlock {
    /// Payload held in memory
    Memory(Vec<u8>),
    /// Payload written to a temporary file in the spool directory
    Spooled(PathBuf),
}

impl TileBlock {
    /// Returns the encoded bytes, deleting the temporary file of a spooled
    /// block once it has been read.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        match self {
            Self::Memory(data) => Ok(data),
            Self::Spooled(path) => {
                let data = fs::read(&path)?;
                fs::remove_file(&path)?;
                Ok(data)
            }
        }
    }
}

/// Outcome of fetching one tile.
///
/// `block` is `None` when the fetch failed; absence is reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResult {
    pub coord: TileCoord,
    pub block: Option<TileBlock>,
}

impl TileResult {
    pub fn present(coord: TileCoord, block: TileBlock) -> Self {
        Self {
            coord,
            block: Some(block),
        }
    }

    pub fn absent(coord: TileCoord) -> Self {
        Self { coord, block: None }
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.block.is_some()
    }
}

/// Options for a [`TileFetcher`](super::TileFetcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Maximum number of requests in flight
    pub max_concurrency: usize,
    /// Timeout for a single request attempt
    pub request_timeout: Duration,
    /// Extra attempts for retryable failures
    pub max_retries: u32,
    /// Log progress every this many completions
    pub progress_interval: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Errors that abort a whole fetch.
///
/// Individual tile failures are not errors; they become absent results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The cancellation token fired before all requests completed
    #[error("Fetch cancelled after {completed} of {total} tiles")]
    Cancelled { completed: usize, total: usize },
}
