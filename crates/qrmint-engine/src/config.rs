//! Configuration types for the qrmint engine.
//!
//! This module defines the configuration schema: default style, preview and
//! export settings, wait budgets and notification timing.

use crate::loader::LoadPolicy;
use crate::request::Style;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding qrmint configuration.
pub const CONFIG_DIR: &str = ".qrmint";

/// Main configuration for qrmint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Initial colors and size.
    #[serde(default)]
    pub style: Style,

    /// Edge length of the on-screen preview, independent of the export size.
    #[serde(default = "default_preview_size")]
    pub preview_size: u32,

    /// How long to wait for renderer output before failing.
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Encode the preview when the renderer yields no full-resolution source.
    #[serde(default = "default_allow_preview_fallback")]
    pub allow_preview_fallback: bool,

    /// Width of the host viewport, if known.
    #[serde(default)]
    pub viewport_width: Option<u32>,

    /// Viewports at most this wide scroll the preview into view.
    #[serde(default = "default_narrow_viewport_width")]
    pub narrow_viewport_width: u32,

    /// File name offered for downloads.
    #[serde(default = "default_download_filename")]
    pub download_filename: String,

    /// Directory downloads are saved into.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Interval between renderer availability checks.
    #[serde(default = "default_library_poll_interval_ms")]
    pub library_poll_interval_ms: u64,

    /// Availability checks before giving up.
    #[serde(default = "default_library_max_polls")]
    pub library_max_polls: u32,

    /// How long notifications stay visible.
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
}

fn default_preview_size() -> u32 {
    240
}

fn default_render_timeout_ms() -> u64 {
    2000
}

fn default_allow_preview_fallback() -> bool {
    true
}

fn default_narrow_viewport_width() -> u32 {
    768
}

fn default_download_filename() -> String {
    "qr-shirden.png".into()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_library_poll_interval_ms() -> u64 {
    100
}

fn default_library_max_polls() -> u32 {
    80
}

fn default_toast_duration_ms() -> u64 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            style: Style::default(),
            preview_size: default_preview_size(),
            render_timeout_ms: default_render_timeout_ms(),
            allow_preview_fallback: default_allow_preview_fallback(),
            viewport_width: None,
            narrow_viewport_width: default_narrow_viewport_width(),
            download_filename: default_download_filename(),
            download_dir: default_download_dir(),
            library_poll_interval_ms: default_library_poll_interval_ms(),
            library_max_polls: default_library_max_polls(),
            toast_duration_ms: default_toast_duration_ms(),
        }
    }
}

impl Config {
    /// Default location relative to the working directory.
    pub fn default_path() -> PathBuf {
        Path::new(CONFIG_DIR).join("config.json")
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config: Self = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview_size == 0 {
            return Err(ConfigError::Invalid("preview_size must be positive".into()));
        }
        if self.render_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "render_timeout_ms must be positive".into(),
            ));
        }
        if self.download_filename.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "download_filename must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    /// Poll policy for waiting on the renderer.
    pub fn load_policy(&self) -> LoadPolicy {
        LoadPolicy {
            poll_interval: Duration::from_millis(self.library_poll_interval_ms),
            max_polls: self.library_max_polls,
        }
    }

    /// Whether completed renders should scroll the preview into view.
    pub fn is_narrow_viewport(&self) -> bool {
        self.viewport_width
            .is_some_and(|w| w <= self.narrow_viewport_width)
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading or writing config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing config JSON.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Error serializing config to JSON.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.preview_size, 240);
        assert_eq!(config.style.size.pixels(), 300);
        assert_eq!(config.style.dark, Color::DEFAULT_DARK);
        assert_eq!(config.download_filename, "qr-shirden.png");
        assert_eq!(config.toast_duration(), Duration::from_secs(3));
        assert!(config.allow_preview_fallback);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.style.light = Color::rgb(0xf1, 0xf5, 0xf9);
        config.viewport_width = Some(390);

        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"render_timeout_ms": 500}"#).unwrap();
        assert_eq!(parsed.render_timeout(), Duration::from_millis(500));
        assert_eq!(parsed.preview_size, 240);
        assert_eq!(parsed.load_policy(), LoadPolicy::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_DIR).join("config.json");

        let mut config = Config::default();
        config.download_filename = "code.png".into();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.download_filename, "code.png");
    }

    #[test]
    fn test_load_or_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"preview_size": 0}"#).unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_narrow_viewport() {
        let mut config = Config::default();
        assert!(!config.is_narrow_viewport());

        config.viewport_width = Some(768);
        assert!(config.is_narrow_viewport());

        config.viewport_width = Some(1280);
        assert!(!config.is_narrow_viewport());
    }
}
