//! INI parsing into [`ConfigFile`].

use super::file::{ConfigError, ConfigFile};
use crate::georef::{Crs, GeoFrame, GeoTiffCompression};
use image::Rgb;
use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Parses all known sections; missing sections and keys keep their defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigError> {
    let mut config = ConfigFile::default();
    let mut mosaic = config.mosaic.clone();

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("concurrency") {
            mosaic = mosaic.with_max_concurrency(parse_positive(
                "download",
                "concurrency",
                v,
            )?);
        }
        if let Some(v) = section.get("timeout") {
            let secs: u64 = parse_positive("download", "timeout", v)?;
            mosaic = mosaic.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(v) = section.get("retries") {
            mosaic = mosaic.with_max_retries(parse_number(
                "download",
                "retries",
                v,
                "must be a non-negative integer",
            )?);
        }
        if let Some(v) = section.get("progress_interval") {
            mosaic = mosaic.with_progress_interval(parse_positive(
                "download",
                "progress_interval",
                v,
            )?);
        }
    }

    // [mosaic] section
    if let Some(section) = ini.section(Some("mosaic")) {
        if let Some(v) = section.get("tile_size") {
            mosaic = mosaic.with_tile_size(parse_positive("mosaic", "tile_size", v)?);
        }
        if let Some(v) = section.get("background") {
            let color = parse_color(v).ok_or_else(|| {
                invalid("mosaic", "background", v, "must be 'r,g,b' or a hex colour like 'ff8000'")
            })?;
            mosaic = mosaic.with_background(color);
        }
        if let Some(v) = section.get("max_missing_ratio") {
            mosaic = mosaic.with_max_missing_ratio(parse_ratio(v)?);
        }
    }

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = section.get("crs") {
            let crs = Crs::from_str(v)
                .map_err(|_| invalid("output", "crs", v, "must be EPSG:<code>"))?;
            mosaic = mosaic.with_crs(crs);
        }
        if let Some(v) = section.get("compression") {
            let compression = parse_compression(v).ok_or_else(|| {
                invalid("output", "compression", v, "must be one of: none, lzw, deflate")
            })?;
            mosaic = mosaic.with_compression(compression);
        }
        if let Some(v) = section.get("frame") {
            let frame = parse_frame(v).ok_or_else(|| {
                invalid("output", "frame", v, "must be one of: tile_grid, web_mercator")
            })?;
            mosaic = mosaic.with_geo_frame(frame);
        }
        if let Some(v) = section.get("work_dir") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("output", "work_dir", v, "must not be empty"));
            }
            mosaic = mosaic.with_work_dir(PathBuf::from(v));
        }
    }

    // [layer] section
    if let Some(section) = ini.section(Some("layer")) {
        set_string(section, "base_url", &mut config.layer.base_url)?;
        set_string(section, "layer", &mut config.layer.layer)?;
        set_string(section, "style", &mut config.layer.style)?;
        set_string(section, "tile_matrix_set", &mut config.layer.tile_matrix_set)?;
        set_string(section, "extension", &mut config.layer.extension)?;
    }

    config.mosaic = mosaic;
    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_positive<T: FromStr + PartialOrd + Default>(
    section: &str,
    key: &str,
    value: &str,
) -> Result<T, ConfigError> {
    const REASON: &str = "must be a positive integer";
    let parsed: T = parse_number(section, key, value, REASON)?;
    if parsed <= T::default() {
        return Err(invalid(section, key, value, REASON));
    }
    Ok(parsed)
}

fn set_string(section: &Properties, key: &str, target: &mut String) -> Result<(), ConfigError> {
    if let Some(v) = section.get(key) {
        let v = v.trim();
        if v.is_empty() {
            return Err(invalid("layer", key, v, "must not be empty"));
        }
        *target = v.to_string();
    }
    Ok(())
}

/// Parses `none` or a fraction in `[0, 1]`.
fn parse_ratio(value: &str) -> Result<Option<f64>, ConfigError> {
    let v = value.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    match v.parse::<f64>() {
        Ok(ratio) if (0.0..=1.0).contains(&ratio) => Ok(Some(ratio)),
        _ => Err(invalid(
            "mosaic",
            "max_missing_ratio",
            value,
            "must be 'none' or a number between 0 and 1",
        )),
    }
}

/// Parses `r,g,b` or a six digit hex colour with optional `#`.
pub(super) fn parse_color(value: &str) -> Option<Rgb<u8>> {
    let v = value.trim();

    if v.contains(',') {
        let parts: Vec<u8> = v
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .ok()?;
        return match parts.as_slice() {
            [r, g, b] => Some(Rgb([*r, *g, *b])),
            _ => None,
        };
    }

    let hex = v.strip_prefix('#').unwrap_or(v);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

fn parse_compression(value: &str) -> Option<GeoTiffCompression> {
    match value.trim().to_lowercase().as_str() {
        "none" | "uncompressed" => Some(GeoTiffCompression::None),
        "lzw" => Some(GeoTiffCompression::Lzw),
        "deflate" | "zlib" => Some(GeoTiffCompression::Deflate),
        _ => None,
    }
}

fn parse_frame(value: &str) -> Option<GeoFrame> {
    match value.trim().to_lowercase().as_str() {
        "tile_grid" | "tilegrid" | "pixels" => Some(GeoFrame::TileGrid),
        "web_mercator" | "webmercator" | "meters" | "metres" => Some(GeoFrame::WebMercator),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MosaicConfig;
    use crate::provider::LayerParams;
    use std::path::Path;

    fn parse(content: &str) -> Result<ConfigFile, ConfigError> {
        ConfigFile::from_ini_str(content)
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
[download]
concurrency = 8
timeout = 45
retries = 2
progress_interval = 10

[mosaic]
tile_size = 512
background = 255, 255, 255
max_missing_ratio = 0.1

[output]
crs = EPSG:31287
compression = lzw
frame = web_mercator
work_dir = /tmp/tiles

[layer]
base_url = http://localhost:8080/wmts
layer = bmapgrau
style = grau
tile_matrix_set = google3857
extension = png
"#,
        )
        .unwrap();

        let mosaic = &config.mosaic;
        assert_eq!(mosaic.max_concurrency(), 8);
        assert_eq!(mosaic.request_timeout(), Duration::from_secs(45));
        assert_eq!(mosaic.max_retries(), 2);
        assert_eq!(mosaic.progress_interval(), 10);
        assert_eq!(mosaic.tile_size(), 512);
        assert_eq!(mosaic.background(), Rgb([255, 255, 255]));
        assert_eq!(mosaic.max_missing_ratio(), Some(0.1));
        assert_eq!(mosaic.crs().epsg(), 31287);
        assert_eq!(mosaic.compression(), GeoTiffCompression::Lzw);
        assert_eq!(mosaic.geo_frame(), GeoFrame::WebMercator);
        assert_eq!(mosaic.work_dir(), Path::new("/tmp/tiles"));

        assert_eq!(
            config.layer,
            LayerParams::new("http://localhost:8080/wmts")
                .with_layer("bmapgrau")
                .with_style("grau")
                .with_extension("png")
        );
    }

    #[test]
    fn test_partial_config() {
        let config = parse(
            r#"
[output]
compression = deflate
"#,
        )
        .unwrap();

        assert_eq!(config.mosaic.compression(), GeoTiffCompression::Deflate);
        assert_eq!(config.mosaic.max_concurrency(), 20);
        assert_eq!(config.layer, LayerParams::default());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = parse("[download]\nconcurrency = 0\n").unwrap_err();
        assert!(err.to_string().contains("download.concurrency"));
    }

    #[test]
    fn test_non_numeric_timeout_rejected() {
        let err = parse("[download]\ntimeout = soon\n").unwrap_err();
        assert!(err.to_string().contains("positive integer"));
    }

    #[test]
    fn test_zero_retries_allowed() {
        let config = parse("[download]\nretries = 0\n").unwrap();
        assert_eq!(config.mosaic.max_retries(), 0);
    }

    #[test]
    fn test_invalid_crs_rejected() {
        let err = parse("[output]\ncrs = mercator\n").unwrap_err();
        assert!(err.to_string().contains("EPSG:<code>"));
    }

    #[test]
    fn test_invalid_compression_rejected() {
        let err = parse("[output]\ncompression = jpeg\n").unwrap_err();
        assert!(err.to_string().contains("none, lzw, deflate"));
    }

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(parse_ratio("none").unwrap(), None);
        assert_eq!(parse_ratio(" 0.5 ").unwrap(), Some(0.5));
        assert!(parse_ratio("1.5").is_err());
        assert!(parse_ratio("-0.1").is_err());
        assert!(parse_ratio("half").is_err());
    }

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("0,0,0"), Some(Rgb([0, 0, 0])));
        assert_eq!(parse_color("ff8000"), Some(Rgb([255, 128, 0])));
        assert_eq!(parse_color("#FF8000"), Some(Rgb([255, 128, 0])));
        assert_eq!(parse_color("1,2"), None);
        assert_eq!(parse_color("256,0,0"), None);
        assert_eq!(parse_color("zzzzzz"), None);
    }

    #[test]
    fn test_empty_layer_value_rejected() {
        let err = parse("[layer]\nlayer =\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_unknown_sections_ignored() {
        let config = parse("[cache]\nmemory_size = 4GB\n").unwrap();
        assert_eq!(config.mosaic, MosaicConfig::default());
    }
}
