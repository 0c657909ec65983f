//! Coordinate reference system identifiers.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An EPSG coordinate reference system code.
///
/// Only the code is carried; the raster is never reprojected, so the CRS is
/// metadata written into the GeoTIFF key directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    epsg: u16,
}

impl Crs {
    /// WGS 84 / Pseudo-Mercator
    pub const WEB_MERCATOR: Crs = Crs { epsg: 3857 };
    /// WGS 84 geographic
    pub const WGS84: Crs = Crs { epsg: 4326 };

    pub const fn from_epsg(epsg: u16) -> Self {
        Self { epsg }
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    /// True for geographic (lat/lon) systems, which use a different GeoKey.
    pub fn is_geographic(&self) -> bool {
        (4000..5000).contains(&self.epsg)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::WEB_MERCATOR
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// A CRS string that is not `EPSG:<code>` or a bare code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid CRS '{0}': expected EPSG:<code>")]
pub struct ParseCrsError(pub String);

impl FromStr for Crs {
    type Err = ParseCrsError;

    /// Parses `EPSG:3857` (case-insensitive prefix) or `3857`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = match trimmed.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("epsg") => code,
            Some(_) => return Err(ParseCrsError(s.to_string())),
            None => trimmed,
        };

        code.trim()
            .parse::<u16>()
            .ok()
            .filter(|&epsg| epsg > 0)
            .map(Crs::from_epsg)
            .ok_or_else(|| ParseCrsError(s.to_string()))
    }
}
