// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, FacingMode, FocusMode, StreamConstraints};
use crate::constants;
use crate::errors::ConfigError;
use crate::scanner::types::DecodeHints;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Camera settings used to build stream constraints
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Device node to use instead of picking by facing mode (e.g. /dev/video2)
    pub device_path: Option<String>,
    /// Ideal resolution width
    pub ideal_width: u32,
    /// Ideal resolution height
    pub ideal_height: u32,
    /// Preferred camera direction
    pub facing: FacingMode,
    /// Focus behaviour
    pub focus: FocusMode,
    /// Request image stabilization
    pub stabilization: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let constraints = StreamConstraints::default();
        Self {
            device_path: None,
            ideal_width: constraints.ideal_width,
            ideal_height: constraints.ideal_height,
            facing: constraints.facing,
            focus: constraints.focus,
            stabilization: constraints.stabilization,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend to use (V4L2 or file source)
    pub backend: CameraBackendType,
    /// Interval between frame samples in milliseconds
    pub sample_interval_ms: u64,
    /// Crop width as a fraction of the frame width
    pub crop_width_ratio: f32,
    /// Crop height as a fraction of the frame height
    pub crop_height_ratio: f32,
    /// Camera stream settings
    pub camera: CameraSettings,
    /// Decoder symbologies and effort
    pub decode: DecodeHints,
    /// Give up on camera acquisition after this many milliseconds (unset waits forever)
    pub acquisition_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            sample_interval_ms: constants::scanner::SAMPLE_INTERVAL.as_millis() as u64,
            crop_width_ratio: constants::scanner::CROP_WIDTH_RATIO,
            crop_height_ratio: constants::scanner::CROP_HEIGHT_RATIO,
            camera: CameraSettings::default(),
            decode: DecodeHints::default(),
            acquisition_timeout_ms: None,
        }
    }
}

impl Config {
    /// Default configuration file path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| {
                dir.join(constants::config::APP_DIR)
                    .join(constants::config::FILE_NAME)
            })
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    /// Save to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sample_interval_ms must be positive".to_string(),
            ));
        }
        for (name, ratio) in [
            ("crop_width_ratio", self.crop_width_ratio),
            ("crop_height_ratio", self.crop_height_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        if self.decode.formats.is_empty() {
            return Err(ConfigError::Invalid(
                "decode.formats must name at least one symbology".to_string(),
            ));
        }
        if self.camera.ideal_width == 0 || self.camera.ideal_height == 0 {
            return Err(ConfigError::Invalid(
                "camera ideal resolution must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn acquisition_timeout(&self) -> Option<Duration> {
        self.acquisition_timeout_ms.map(Duration::from_millis)
    }

    /// Stream constraints for the configured camera
    pub fn stream_constraints(&self) -> StreamConstraints {
        StreamConstraints {
            facing: self.camera.facing,
            ideal_width: self.camera.ideal_width,
            ideal_height: self.camera.ideal_height,
            focus: self.camera.focus,
            stabilization: self.camera.stabilization,
        }
    }
}
