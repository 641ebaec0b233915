use crate::error::{Error, Result};
use crate::settings::Settings;
use std::time::Duration;

/// Calibration defaults for the analysis and rendering pipeline.
///
/// These are tuned by eye against typical microphone input, not derived
/// from any physical unit.
pub mod defaults {
    /// Requested capture sample rate (Hz)
    pub const SAMPLE_RATE: u32 = 44_100;
    /// Samples per frame; must be a power of two
    pub const BLOCK_SIZE: usize = 1024;
    /// Delay after each rendered frame (seconds)
    pub const FRAME_INTERVAL: f32 = 0.05;

    /// Per-frame geometric decay of the spectrum peak envelope
    pub const PEAK_DECAY: f32 = 0.05;
    /// Divisor turning weighted magnitude into rows
    pub const MAGNITUDE_SCALE: f32 = 65_535.0;

    /// VU meter floor (dB), also the silence level
    pub const MIN_DB: f32 = -60.0;
    /// VU meter ceiling (dB)
    pub const MAX_DB: f32 = 0.0;
    /// RMS below this is reported as silence
    pub const NOISE_FLOOR: f64 = 1e-4;
    /// Linear decay of the VU peak (dB per frame)
    pub const VU_PEAK_DECAY: f32 = 0.4;

    /// Color bands for spectrum bars and VU rows
    pub const COLOR_BANDS: u8 = 15;
    /// Color bands for the waveform trace
    pub const WAVEFORM_BANDS: u8 = 7;

    /// Seconds without any captured sample before giving up (0 disables)
    pub const STALL_TIMEOUT: f32 = 5.0;

    pub const TITLE: &str = "FFT/VU v0.1";
}

/// Spectrum analyzer calibration
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrumConfig {
    pub peak_decay: f32,
    pub magnitude_scale: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            peak_decay: defaults::PEAK_DECAY,
            magnitude_scale: defaults::MAGNITUDE_SCALE,
        }
    }
}

/// Level meter calibration
#[derive(Clone, Debug, PartialEq)]
pub struct LevelConfig {
    pub min_db: f32,
    pub max_db: f32,
    pub noise_floor: f64,
    pub peak_decay_db: f32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            min_db: defaults::MIN_DB,
            max_db: defaults::MAX_DB,
            noise_floor: defaults::NOISE_FLOOR,
            peak_decay_db: defaults::VU_PEAK_DECAY,
        }
    }
}

/// Full runtime configuration for the visualizer
#[derive(Clone, Debug, PartialEq)]
pub struct VisualizerConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub frame_interval: f32,
    pub spectrum: SpectrumConfig,
    pub level: LevelConfig,
    pub color_bands: u8,
    pub waveform_bands: u8,
    pub title: String,
    pub device: Option<String>,
    pub stall_timeout: f32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            block_size: defaults::BLOCK_SIZE,
            frame_interval: defaults::FRAME_INTERVAL,
            spectrum: SpectrumConfig::default(),
            level: LevelConfig::default(),
            color_bands: defaults::COLOR_BANDS,
            waveform_bands: defaults::WAVEFORM_BANDS,
            title: defaults::TITLE.to_string(),
            device: None,
            stall_timeout: defaults::STALL_TIMEOUT,
        }
    }
}

impl VisualizerConfig {
    /// Overlay every value present in the settings file
    pub fn apply_settings(&mut self, settings: &Settings) {
        let audio = &settings.audio;
        if let Some(rate) = audio.sample_rate {
            self.sample_rate = rate;
        }
        if let Some(size) = audio.block_size {
            self.block_size = size;
        }
        if let Some(ref device) = audio.device {
            self.device = Some(device.clone());
        }
        if let Some(timeout) = audio.stall_timeout {
            self.stall_timeout = timeout;
        }

        let display = &settings.display;
        if let Some(interval) = display.frame_interval {
            self.frame_interval = interval;
        }
        if let Some(bands) = display.color_bands {
            self.color_bands = bands;
        }
        if let Some(ref title) = display.title {
            self.title = title.clone();
        }

        let cal = &settings.calibration;
        if let Some(decay) = cal.peak_decay {
            self.spectrum.peak_decay = decay;
        }
        if let Some(scale) = cal.magnitude_scale {
            self.spectrum.magnitude_scale = scale;
        }
        if let Some(min_db) = cal.min_db {
            self.level.min_db = min_db;
        }
        if let Some(max_db) = cal.max_db {
            self.level.max_db = max_db;
        }
        if let Some(floor) = cal.noise_floor {
            self.level.noise_floor = floor;
        }
        if let Some(decay) = cal.vu_peak_decay {
            self.level.peak_decay_db = decay;
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));

        if !self.block_size.is_power_of_two() || !(4..=16_384).contains(&self.block_size) {
            return invalid(format!(
                "block size {} must be a power of two between 4 and 16384",
                self.block_size
            ));
        }
        if self.sample_rate == 0 {
            return invalid("sample rate must be positive".into());
        }
        if !(self.frame_interval > 0.0) || Duration::try_from_secs_f32(self.frame_interval).is_err() {
            return invalid(format!("frame interval {} must be positive", self.frame_interval));
        }
        if !(0.0..1.0).contains(&self.spectrum.peak_decay) {
            return invalid(format!("peak decay {} must be in [0, 1)", self.spectrum.peak_decay));
        }
        if !(self.spectrum.magnitude_scale > 0.0) {
            return invalid("magnitude scale must be positive".into());
        }
        if !(self.level.min_db < self.level.max_db) {
            return invalid(format!(
                "min_db {} must be below max_db {}",
                self.level.min_db, self.level.max_db
            ));
        }
        if self.level.peak_decay_db < 0.0 {
            return invalid("VU peak decay must not be negative".into());
        }
        if !(1..=15).contains(&self.color_bands) {
            return invalid(format!("color bands {} must be within 1-15", self.color_bands));
        }
        if !(self.stall_timeout >= 0.0) || Duration::try_from_secs_f32(self.stall_timeout).is_err() {
            return invalid(format!("stall timeout {} must be a non-negative duration", self.stall_timeout));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(self.frame_interval)
    }

    /// Wall-clock length of one capture block
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        (self.stall_timeout > 0.0).then(|| Duration::from_secs_f32(self.stall_timeout))
    }
}
