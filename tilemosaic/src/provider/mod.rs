//! Tile server access
//!
//! This module provides the HTTP client abstraction used to download tiles
//! and the WMTS layer description that turns tile coordinates into URLs.
//!
//! ```ignore
//! use tilemosaic::provider::{AsyncReqwestClient, LayerParams};
//!
//! let client = AsyncReqwestClient::new()?;
//! let layer = LayerParams::default();
//! let requests = layer.requests_for(&range);
//! ```

mod http;
mod layer;
mod types;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_HTTP_TIMEOUT_SECS};
pub use layer::{
    LayerParams, TileRequest, DEFAULT_BASE_URL, DEFAULT_EXTENSION, DEFAULT_LAYER, DEFAULT_STYLE,
    DEFAULT_TILE_MATRIX_SET,
};
pub use types::ProviderError;

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
