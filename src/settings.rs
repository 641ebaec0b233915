use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of `config.toml`; every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub calibration: CalibrationSettings,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct AudioSettings {
    pub device: Option<String>,
    pub sample_rate: Option<u32>,
    pub block_size: Option<usize>,
    pub stall_timeout: Option<f32>,  // Seconds, 0 disables
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct DisplaySettings {
    pub frame_interval: Option<f32>,  // Seconds between frames
    pub color_bands: Option<u8>,
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct CalibrationSettings {
    pub peak_decay: Option<f32>,
    pub magnitude_scale: Option<f32>,
    pub min_db: Option<f32>,
    pub max_db: Option<f32>,
    pub noise_floor: Option<f64>,
    pub vu_peak_decay: Option<f32>,
}

impl Settings {
    /// Load the default config file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load an explicitly named config file; any failure is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Settings {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        Self::parse(&content).map_err(|e| Error::Settings {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fftvu")
            .join("config.toml")
    }
}
