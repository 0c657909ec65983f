//! WMTS layer parameters and tile request construction.
//!
//! Tiles are addressed with the REST template
//! `{base}/{layer}/{style}/{tileMatrixSet}/{zoom}/{y}/{x}.{ext}`.

use crate::coord::{TileCoord, TileRange};

/// Default tile server base URL (basemap.at).
pub const DEFAULT_BASE_URL: &str = "https://mapsneu.wien.gv.at/basemap";
/// Default layer: 30cm orthophoto.
pub const DEFAULT_LAYER: &str = "bmaporthofoto30cm";
/// Default layer style.
pub const DEFAULT_STYLE: &str = "normal";
/// Default tile matrix set (Google-compatible Web Mercator grid).
pub const DEFAULT_TILE_MATRIX_SET: &str = "google3857";
/// Default image extension.
pub const DEFAULT_EXTENSION: &str = "jpeg";

/// Parameters selecting a layer on a WMTS REST tile server.
///
/// # Example
///
/// ```
/// use tilemosaic::coord::TileCoord;
/// use tilemosaic::provider::LayerParams;
///
/// let layer = LayerParams::default().with_layer("bmapgrau").with_extension("png");
/// assert_eq!(
///     layer.tile_url(&TileCoord::new(8936, 5681, 14)),
///     "https://mapsneu.wien.gv.at/basemap/bmapgrau/normal/google3857/14/5681/8936.png"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerParams {
    pub base_url: String,
    pub layer: String,
    pub style: String,
    pub tile_matrix_set: String,
    pub extension: String,
}

impl LayerParams {
    /// Creates layer parameters for a different server, keeping the default
    /// layer, style, matrix set and extension.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_tile_matrix_set(mut self, tile_matrix_set: impl Into<String>) -> Self {
        self.tile_matrix_set = tile_matrix_set.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Builds the URL of a single tile.
    pub fn tile_url(&self, tile: &TileCoord) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}/{}.{}",
            self.base_url.trim_end_matches('/'),
            self.layer,
            self.style,
            self.tile_matrix_set,
            tile.zoom,
            tile.y,
            tile.x,
            self.extension
        )
    }

    /// Builds one request per tile of `range`, in row-major order.
    pub fn requests_for(&self, range: &TileRange) -> Vec<TileRequest> {
        range
            .tiles()
            .map(|coord| TileRequest {
                url: self.tile_url(&coord),
                coord,
            })
            .collect()
    }
}

impl Default for LayerParams {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            layer: DEFAULT_LAYER.to_string(),
            style: DEFAULT_STYLE.to_string(),
            tile_matrix_set: DEFAULT_TILE_MATRIX_SET.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// A single tile to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub url: String,
    pub coord: TileCoord,
}
