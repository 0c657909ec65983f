//! tilemosaic - Georeferenced mosaics from WMTS tile servers
//!
//! Downloads every tile that covers a latitude/longitude bounding box at a
//! given zoom level, stitches the tiles into a single RGB raster and writes
//! it as a GeoTIFF carrying an affine transform and a coordinate reference
//! system.
//!
//! # High-Level API
//!
//! [`MosaicDownloader`] runs the whole pipeline:
//!
//! ```ignore
//! use tilemosaic::{BoundingBox, LayerParams, MosaicConfig, MosaicDownloader};
//!
//! let downloader = MosaicDownloader::with_reqwest(MosaicConfig::default())?;
//! let bbox = BoundingBox::new(48.20, 16.30, 48.21, 16.31)?;
//! let report = downloader
//!     .download_mosaic(&bbox, 19, &LayerParams::default(), "uploads/basemap_rgb.tif")
//!     .await?;
//! ```
//!
//! The building blocks are public as well: [`coord`] for tile math,
//! [`fetch`] for bounded concurrent downloads, [`mosaic`] for canvas
//! assembly and [`georef`] for transforms and GeoTIFF output.

pub mod config;
pub mod coord;
pub mod error;
pub mod fetch;
pub mod georef;
pub mod logging;
pub mod mosaic;
pub mod orchestrator;
pub mod provider;
pub mod workdir;

pub use config::MosaicConfig;
pub use coord::{BoundingBox, TileCoord, TileRange};
pub use error::MosaicError;
pub use orchestrator::{MosaicDownloader, MosaicReport, MosaicState};
pub use provider::LayerParams;

/// Version of the tilemosaic library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
