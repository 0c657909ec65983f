//! INI configuration file loading.

use super::mosaic::MosaicConfig;
use crate::provider::LayerParams;
use ini::Ini;
use std::path::Path;
use thiserror::Error;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Settings loaded from an INI file.
///
/// ```ini
/// [download]
/// concurrency = 20
/// timeout = 30
/// retries = 0
/// progress_interval = 50
///
/// [mosaic]
/// tile_size = 256
/// background = 0,0,0
/// max_missing_ratio = none
///
/// [output]
/// crs = EPSG:3857
/// compression = none
/// frame = tile_grid
/// work_dir = downloaded_tiles
///
/// [layer]
/// base_url = https://mapsneu.wien.gv.at/basemap
/// layer = bmaporthofoto30cm
/// style = normal
/// tile_matrix_set = google3857
/// extension = jpeg
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub mosaic: MosaicConfig,
    pub layer: LayerParams,
}

impl ConfigFile {
    /// Load configuration from `path`.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(ini::Error::Parse)?;
        super::parser::parse_ini(&ini)
    }
}

impl MosaicConfig {
    /// Load the mosaic settings from an INI file, ignoring `[layer]`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Ok(ConfigFile::load_from(path)?.mosaic)
    }
}

impl LayerParams {
    /// Load the `[layer]` section from an INI file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Ok(ConfigFile::load_from(path)?.layer)
    }
}
