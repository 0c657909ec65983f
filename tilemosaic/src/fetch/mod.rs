//! Bounded concurrent tile fetching.
//!
//! The fetcher issues one GET per tile request with at most
//! `max_concurrency` requests in flight. Individual tile failures never
//! abort a fetch; they are reported as absent [`TileResult`]s so the mosaic
//! can still be produced.
//!
//! # Key Components
//!
//! - [`TileFetcher`] - Fans requests out on a `JoinSet` and joins them all
//! - [`ConcurrencyLimiter`] - Semaphore with observable in-flight counts
//! - [`FetchStats`] - Atomic counters shared by all fetch tasks
//!
//! # Example
//!
//! ```ignore
//! use tilemosaic::fetch::{FetchOptions, TileFetcher};
//!
//! let fetcher = TileFetcher::new(client, FetchOptions::default())
//!     .with_spool_dir("downloaded_tiles");
//! let results = fetcher.fetch_all(requests, &cancellation).await?;
//! let missing = results.iter().filter(|r| !r.is_present()).count();
//! ```

mod fetcher;
mod limiter;
mod stats;
mod types;

pub use fetcher::{spool_file_name, TileFetcher};
pub use limiter::{ConcurrencyLimiter, ConcurrencyPermit};
pub use stats::{FetchStats, FetchStatsSnapshot};
pub use types::{
    FetchError, FetchOptions, TileBlock, TileResult, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_MAX_RETRIES, DEFAULT_PROGRESS_INTERVAL, DEFAULT_REQUEST_TIMEOUT,
};
