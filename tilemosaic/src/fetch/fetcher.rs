//! Bounded concurrent tile fetcher.
//!
//! [`TileFetcher`] spawns one task per [`TileRequest`] on a [`JoinSet`]. Each
//! task waits for a permit from the shared [`ConcurrencyLimiter`] before its
//! GET, so at most `max_concurrency` requests are ever in flight. Failures
//! are logged and downgraded to absent tiles; only cancellation aborts the
//! whole fetch.

use super::limiter::ConcurrencyLimiter;
use super::stats::{FetchStats, FetchStatsSnapshot};
use super::types::{FetchError, FetchOptions, TileBlock, TileResult};
use crate::coord::TileCoord;
use crate::provider::{AsyncHttpClient, ProviderError, TileRequest};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

/// Downloads tiles with a bounded number of concurrent requests.
///
/// # Example
///
/// ```ignore
/// use tilemosaic::fetch::{FetchOptions, TileFetcher};
/// use tilemosaic::provider::{AsyncReqwestClient, LayerParams};
///
/// let client = Arc::new(AsyncReqwestClient::new()?);
/// let fetcher = TileFetcher::new(client, FetchOptions::default());
/// let results = fetcher
///     .fetch_all(LayerParams::default().requests_for(&range), &CancellationToken::new())
///     .await?;
/// ```
pub struct TileFetcher<C: AsyncHttpClient> {
    client: Arc<C>,
    options: FetchOptions,
    limiter: Arc<ConcurrencyLimiter>,
    stats: Arc<FetchStats>,
    spool_dir: Option<PathBuf>,
}

impl<C: AsyncHttpClient> TileFetcher<C> {
    /// Creates a fetcher that keeps tile payloads in memory.
    pub fn new(client: Arc<C>, options: FetchOptions) -> Self {
        let limiter = ConcurrencyLimiter::new(options.max_concurrency);
        Self {
            client,
            options,
            limiter: Arc::new(limiter),
            stats: Arc::new(FetchStats::new()),
            spool_dir: None,
        }
    }

    /// Writes each fetched payload to `dir` instead of keeping it in memory.
    ///
    /// The directory must exist; a tile whose payload cannot be written is
    /// treated as absent.
    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = Some(dir.into());
        self
    }

    /// Returns the limiter, for inspecting in-flight and peak counts.
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Returns the statistics accumulated so far.
    pub fn stats(&self) -> FetchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Fetches every request and returns one result per request.
    ///
    /// Returns only after all requests have completed. Results arrive in
    /// completion order, not submission order. If `cancellation` fires,
    /// outstanding requests are aborted and awaited before returning
    /// [`FetchError::Cancelled`]. Spool writes already handed to the blocking
    /// pool cannot be aborted, so they are tracked and waited for as well; no
    /// file lands in the spool directory after this returns.
    pub async fn fetch_all(
        &self,
        requests: Vec<TileRequest>,
        cancellation: &CancellationToken,
    ) -> Result<Vec<TileResult>, FetchError> {
        let total = requests.len();
        if cancellation.is_cancelled() {
            return Err(FetchError::Cancelled { completed: 0, total });
        }

        let expected: Vec<TileCoord> = requests.iter().map(|r| r.coord).collect();
        let mut downloads = JoinSet::new();
        let spool_writes = TaskTracker::new();

        debug!(
            total = total,
            max_concurrency = self.limiter.max_concurrent(),
            "Starting tile fetch"
        );

        for request in requests {
            let client = Arc::clone(&self.client);
            let limiter = Arc::clone(&self.limiter);
            let stats = Arc::clone(&self.stats);
            let spool_dir = self.spool_dir.clone();
            let options = self.options;
            let spool_writes = spool_writes.clone();

            downloads.spawn(async move {
                let coord = request.coord;

                let _permit = match limiter.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!(x = coord.x, y = coord.y, error = %e, "Limiter closed");
                        stats.record_failure();
                        return TileResult::absent(coord);
                    }
                };

                let data = match fetch_with_retries(client.as_ref(), &request.url, &options, &stats)
                    .await
                {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(
                            x = coord.x,
                            y = coord.y,
                            url = %request.url,
                            error = %e,
                            "Tile fetch failed"
                        );
                        stats.record_failure();
                        return TileResult::absent(coord);
                    }
                };

                let bytes = data.len();
                let block = match spool_dir {
                    Some(dir) => match spool_tile(&spool_writes, &dir, &coord, data).await {
                        Ok(path) => TileBlock::Spooled(path),
                        Err(e) => {
                            warn!(
                                x = coord.x,
                                y = coord.y,
                                error = %e,
                                "Failed to spool tile"
                            );
                            stats.record_failure();
                            return TileResult::absent(coord);
                        }
                    },
                    None => TileBlock::Memory(data),
                };

                stats.record_success(bytes);
                TileResult::present(coord, block)
            });
        }

        let progress_interval = self.options.progress_interval.max(1);
        let mut results = Vec::with_capacity(total);
        let mut completed = 0usize;

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    downloads.abort_all();
                    while downloads.join_next().await.is_some() {}
                    spool_writes.close();
                    spool_writes.wait().await;
                    warn!(completed = completed, total = total, "Tile fetch cancelled");
                    return Err(FetchError::Cancelled { completed, total });
                }

                joined = downloads.join_next() => {
                    let Some(joined) = joined else { break };
                    completed += 1;

                    match joined {
                        Ok(result) => results.push(result),
                        Err(e) => {
                            // The tile is filled in as absent below
                            warn!(error = %e, "Fetch task failed");
                            self.stats.record_failure();
                        }
                    }

                    if completed % progress_interval == 0 || completed == total {
                        info!(completed = completed, total = total, "Fetched {} of {} tiles", completed, total);
                    }
                }
            }
        }

        if results.len() < expected.len() {
            let seen: HashSet<TileCoord> = results.iter().map(|r| r.coord).collect();
            for coord in expected {
                if !seen.contains(&coord) {
                    results.push(TileResult::absent(coord));
                }
            }
        }

        Ok(results)
    }
}

/// File name of a spooled tile payload.
pub fn spool_file_name(coord: &TileCoord) -> String {
    format!("tile_{}_{}", coord.x, coord.y)
}

/// Writes a payload on the blocking pool, registered with `writes` so the
/// fetcher can wait for it even if the calling task is aborted.
async fn spool_tile(
    writes: &TaskTracker,
    dir: &Path,
    coord: &TileCoord,
    data: Vec<u8>,
) -> io::Result<PathBuf> {
    let path = dir.join(spool_file_name(coord));
    let target = path.clone();
    writes
        .spawn_blocking(move || std::fs::write(&target, data))
        .await
        .map_err(io::Error::other)??;
    Ok(path)
}

/// Exponential backoff: 100ms, 200ms, 400ms ... capped at 6.4s.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(100u64 << attempt.min(6))
}

/// Performs the GET for one tile, retrying retryable failures up to
/// `options.max_retries` extra times.
async fn fetch_with_retries<C: AsyncHttpClient>(
    client: &C,
    url: &str,
    options: &FetchOptions,
    stats: &FetchStats,
) -> Result<Vec<u8>, ProviderError> {
    let mut attempt = 0;
    loop {
        trace!(url = url, attempt = attempt, "Tile request");

        let outcome = match tokio::time::timeout(options.request_timeout, client.get(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout {
                url: url.to_string(),
                timeout_ms: options.request_timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(data) => return Ok(data),
            Err(e) if attempt < options.max_retries && e.is_retryable() => {
                debug!(url = url, attempt = attempt, error = %e, "Retrying tile request");
                stats.record_retry();
                tokio::time::sleep(backoff_delay(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
