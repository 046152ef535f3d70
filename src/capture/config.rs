//! Capture policy configuration.
//!
//! The aspect tolerance, focus fallback delay and JPEG quality are policy
//! rather than mechanism, so they live here instead of in the code that
//! uses them.

use super::Viewport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the capture pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum aspect-ratio difference for a size to count as matching.
    pub aspect_tolerance: f64,
    /// Delay after which a capture is taken even if focus has not completed.
    pub focus_fallback_ms: u64,
    /// JPEG quality factor for stored artifacts (1-100).
    pub jpeg_quality: u8,
    /// Directory under the storage root that receives artifacts.
    pub subdirectory: String,
    /// Target used for size selection when no viewport is known.
    pub fallback_viewport: Viewport,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            aspect_tolerance: 0.1,
            focus_fallback_ms: 300,
            jpeg_quality: 50,
            subdirectory: "CameraTest".into(),
            fallback_viewport: Viewport::FALLBACK,
        }
    }
}

impl CaptureConfig {
    /// Returns the focus fallback delay.
    pub fn focus_fallback(&self) -> Duration {
        Duration::from_millis(self.focus_fallback_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.aspect_tolerance.is_finite() || self.aspect_tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.aspect_tolerance));
        }
        if self.focus_fallback_ms == 0 {
            return Err(ConfigError::InvalidDelay);
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::InvalidQuality(self.jpeg_quality));
        }
        if self.subdirectory.is_empty() {
            return Err(ConfigError::InvalidSubdirectory);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid aspect tolerance {0} (must be finite and non-negative)")]
    InvalidTolerance(f64),
    #[error("focus fallback delay must be non-zero")]
    InvalidDelay,
    #[error("invalid JPEG quality {0} (must be 1-100)")]
    InvalidQuality(u8),
    #[error("artifact subdirectory must not be empty")]
    InvalidSubdirectory,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the durable medium.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir(),
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.capture.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CaptureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.focus_fallback(), Duration::from_millis(300));
        assert_eq!(config.jpeg_quality, 50);
        assert_eq!(config.subdirectory, "CameraTest");
    }

    #[test]
    fn test_zero_quality_invalid() {
        let config = CaptureConfig {
            jpeg_quality: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidQuality(0))
        ));
    }

    #[test]
    fn test_negative_tolerance_invalid() {
        let config = CaptureConfig {
            aspect_tolerance: -0.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FileConfig::from_toml(
            r#"
            [capture]
            focus_fallback_ms = 500

            [storage]
            root = "/mnt/sdcard"
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.focus_fallback_ms, 500);
        assert_eq!(config.capture.aspect_tolerance, 0.1);
        assert_eq!(config.storage.root, PathBuf::from("/mnt/sdcard"));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = FileConfig::from_toml("[capture]\njpeg_quality = 200\n");
        assert!(matches!(result, Err(ConfigError::InvalidQuality(200))));
    }
}
