//! Configuration
//!
//! [`MosaicConfig`] holds the tuning parameters of a download and is built
//! with `with_*` setters. [`ConfigFile`] loads it together with the tile
//! layer from an INI file at an explicit path.

mod file;
mod mosaic;
mod parser;

pub use file::{ConfigError, ConfigFile};
pub use mosaic::MosaicConfig;
