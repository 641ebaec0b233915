//! RMS level meter with smoothing and a linearly decaying peak.

use crate::config::LevelConfig;

/// Digital full scale for signed 16-bit samples
const FULL_SCALE: f64 = 32768.0;

/// Loudness snapshot after one update (all values in dB)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelState {
    pub instant_db: f32,
    pub smoothed_db: f32,
    pub peak_db: f32,
}

impl LevelState {
    fn silent(floor: f32) -> Self {
        Self {
            instant_db: floor,
            smoothed_db: floor,
            peak_db: floor,
        }
    }
}

pub struct LevelMeter {
    config: LevelConfig,
    state: LevelState,
}

impl LevelMeter {
    pub fn new(config: LevelConfig) -> Self {
        let state = LevelState::silent(config.min_db);
        Self { config, state }
    }

    pub fn state(&self) -> LevelState {
        self.state
    }

    /// Instantaneous level of a block, clamped to the meter range.
    pub fn block_db(&self, block: &[i16]) -> f32 {
        if block.is_empty() {
            return self.config.min_db;
        }

        let sum_sq: f64 = block.iter().map(|&s| (s as f64) * (s as f64)).sum();
        let rms = (sum_sq / block.len() as f64).sqrt();
        if rms < self.config.noise_floor {
            return self.config.min_db;
        }

        let db = 20.0 * (rms / FULL_SCALE + 1e-10).log10();
        (db as f32).clamp(self.config.min_db, self.config.max_db)
    }

    /// Feed one block and return the new level state.
    ///
    /// The smoothed level is the mean of the previous smoothed level and the
    /// new instantaneous level. The peak falls by `peak_decay_db` per call but
    /// never below the instantaneous or smoothed level.
    pub fn update(&mut self, block: &[i16]) -> LevelState {
        let LevelConfig { min_db, max_db, peak_decay_db, .. } = self.config;

        let instant_db = self.block_db(block);
        let smoothed_db = ((self.state.smoothed_db + instant_db) / 2.0).clamp(min_db, max_db);
        let peak_db = (self.state.peak_db - peak_decay_db)
            .max(instant_db)
            .max(smoothed_db)
            .clamp(min_db, max_db);

        self.state = LevelState { instant_db, smoothed_db, peak_db };
        self.state
    }
}
