//! Engine configuration.
//!
//! Values come from built-in defaults, then an optional JSON file, then
//! environment variables. Later sources override earlier ones.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LutoolsError, LutoolsResult};
use crate::resample::ResizeFilter;

/// Default JPEG encoder quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;
/// Default preview bounding box edge.
pub const DEFAULT_PREVIEW_MAX: u32 = 512;
/// Default `TITLE` written into generated `.cube` files.
pub const DEFAULT_CUBE_TITLE: &str = "Generated LUT";

/// Overrides [`EngineConfig::jpeg_quality`].
pub const ENV_JPEG_QUALITY: &str = "LUTOOLS_JPEG_QUALITY";
/// Overrides the preview box, formatted `WxH`.
pub const ENV_PREVIEW_MAX: &str = "LUTOOLS_PREVIEW_MAX";

/// Runtime configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quality for `.jpg`/`.jpeg` output, `1..=100`.
    pub jpeg_quality: u8,
    /// Filter used for previews and explicit resizes.
    pub resize_filter: ResizeFilter,
    /// Preview bounding box width.
    pub preview_max_width: u32,
    /// Preview bounding box height.
    pub preview_max_height: u32,
    /// `TITLE` of generated `.cube` files.
    pub cube_title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            resize_filter: ResizeFilter::default(),
            preview_max_width: DEFAULT_PREVIEW_MAX,
            preview_max_height: DEFAULT_PREVIEW_MAX,
            cube_title: DEFAULT_CUBE_TITLE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> LutoolsResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> LutoolsResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| LutoolsError::io(path, e))?;
        Self::from_json(&text)
    }

    /// Parse and validate JSON text.
    pub fn from_json(text: &str) -> LutoolsResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| LutoolsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment overrides read through `lookup`. Unparseable or
    /// out-of-range values are skipped with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_JPEG_QUALITY) {
            match raw.trim().parse::<u8>() {
                Ok(q) if (1..=100).contains(&q) => self.jpeg_quality = q,
                _ => tracing::warn!("ignoring {ENV_JPEG_QUALITY}={raw:?}: expected 1..=100"),
            }
        }
        if let Some(raw) = lookup(ENV_PREVIEW_MAX) {
            match parse_dimensions(&raw) {
                Some((w, h)) => {
                    self.preview_max_width = w;
                    self.preview_max_height = h;
                }
                None => tracing::warn!("ignoring {ENV_PREVIEW_MAX}={raw:?}: expected WxH"),
            }
        }
    }

    /// Reject values the engine cannot use.
    pub fn validate(&self) -> LutoolsResult<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(LutoolsError::Config(format!(
                "jpeg_quality must be 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.preview_max_width == 0 || self.preview_max_height == 0 {
            return Err(LutoolsError::Config(format!(
                "preview bounds must be non-zero, got {}x{}",
                self.preview_max_width, self.preview_max_height
            )));
        }
        Ok(())
    }
}

/// Parse `WxH` (also accepts `X`) into non-zero dimensions.
pub fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.trim().split_once(['x', 'X'])?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults_match_native_library() {
        let config = EngineConfig::default();
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.resize_filter, ResizeFilter::Bilinear);
        assert_eq!((config.preview_max_width, config.preview_max_height), (512, 512));
        assert_eq!(config.cube_title, "Generated LUT");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"jpeg_quality": 80, "resize_filter": "nearest"}"#)
            .unwrap();
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.resize_filter, ResizeFilter::Nearest);
        assert_eq!(config.preview_max_width, 512);
    }

    #[test]
    fn test_invalid_json_values_rejected() {
        let err = EngineConfig::from_json(r#"{"jpeg_quality": 0}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = EngineConfig::from_json(r#"{"preview_max_height": 0}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = EngineConfig::from_json("not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        config.apply_env(|key| match key {
            ENV_JPEG_QUALITY => Some("70".into()),
            ENV_PREVIEW_MAX => Some("800x600".into()),
            _ => None,
        });
        assert_eq!(config.jpeg_quality, 70);
        assert_eq!((config.preview_max_width, config.preview_max_height), (800, 600));
    }

    #[test]
    fn test_bad_env_values_ignored() {
        let mut config = EngineConfig::default();
        config.apply_env(|key| match key {
            ENV_JPEG_QUALITY => Some("250".into()),
            ENV_PREVIEW_MAX => Some("wide".into()),
            _ => None,
        });
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lutools.json");
        std::fs::write(&path, r#"{"cube_title": "Studio"}"#).unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.cube_title, "Studio");

        let err = EngineConfig::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1024x768"), Some((1024, 768)));
        assert_eq!(parse_dimensions(" 64 X 32 "), Some((64, 32)));
        assert_eq!(parse_dimensions("0x10"), None);
        assert_eq!(parse_dimensions("10"), None);
    }
}
