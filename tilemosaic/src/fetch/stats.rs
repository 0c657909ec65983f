//! Per-run fetch statistics.
//!
//! Accumulates download metrics from concurrently running fetch tasks.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe fetch statistics.
///
/// # Example
///
/// ```
/// use tilemosaic::fetch::FetchStats;
///
/// let stats = FetchStats::new();
/// stats.record_success(1024);
/// stats.record_failure();
///
/// let snapshot = stats.snapshot();
/// assert_eq!(snapshot.tiles_fetched, 1);
/// assert_eq!(snapshot.tiles_failed, 1);
/// ```
#[derive(Debug, Default)]
pub struct FetchStats {
    /// Total bytes downloaded
    bytes_downloaded: AtomicU64,
    /// Number of tiles successfully downloaded
    tiles_fetched: AtomicU64,
    /// Number of tiles that ended up absent
    tiles_failed: AtomicU64,
    /// Number of retry attempts
    retries: AtomicU64,
}

/// Snapshot of fetch statistics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchStatsSnapshot {
    pub bytes_downloaded: u64,
    pub tiles_fetched: u64,
    pub tiles_failed: u64,
    pub retries: u64,
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful tile download of `bytes` bytes.
    pub fn record_success(&self, bytes: usize) {
        self.bytes_downloaded
            .fetch_add(bytes as u64, Ordering::Relaxed);
        self.tiles_fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tile that could not be fetched.
    pub fn record_failure(&self) {
        self.tiles_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retry attempt.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            tiles_fetched: self.tiles_fetched.load(Ordering::Relaxed),
            tiles_failed: self.tiles_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}
