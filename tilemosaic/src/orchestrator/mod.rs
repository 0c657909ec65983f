//! Mosaic download orchestration
//!
//! [`MosaicDownloader`] drives one download from bounding box to GeoTIFF:
//! it computes the tile range, fetches the tiles with bounded concurrency,
//! assembles them on a blocking thread, writes the georeferenced output and
//! cleans the working directory. Progress through the run is tracked as a
//! [`MosaicState`].

mod downloader;
mod report;
mod state;

pub use downloader::MosaicDownloader;
pub use report::MosaicReport;
pub use state::MosaicState;
