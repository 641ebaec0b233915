//! Log-frequency weighted magnitude spectrum with a peak-hold envelope.
//!
//! Each frame the block is transformed with a real-input FFT (no window, no
//! scaling). Every bin's magnitude is multiplied by `log10(1 + f)` so that
//! near-DC content is de-emphasised and upper partials stand out. The
//! envelope decays geometrically and is pushed back up by the current frame.

use crate::config::SpectrumConfig;
use spectrum_analyzer::{samples_fft_to_spectrum, FrequencyLimit};

pub struct SpectrumAnalyzer {
    config: SpectrumConfig,
    sample_rate: u32,
    block_size: usize,
    /// Center frequency of each bin (Hz)
    frequencies: Vec<f32>,
    /// Weighted magnitudes of the latest frame
    frame: Vec<f32>,
    /// Peak-hold envelope, persists across frames
    envelope: Vec<f32>,
    /// Reused FFT input buffer
    input: Vec<f32>,
}

impl SpectrumAnalyzer {
    /// `block_size` must be a power of two (checked by config validation).
    pub fn new(config: SpectrumConfig, sample_rate: u32, block_size: usize) -> Self {
        let bins = block_size / 2 + 1;
        let bin_width = sample_rate as f32 / block_size as f32;
        Self {
            config,
            sample_rate,
            block_size,
            frequencies: (0..bins).map(|i| i as f32 * bin_width).collect(),
            frame: vec![0.0; bins],
            envelope: vec![0.0; bins],
            input: vec![0.0; block_size],
        }
    }

    pub fn bins(&self) -> usize {
        self.frame.len()
    }

    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.block_size as f32
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    pub fn frame(&self) -> &[f32] {
        &self.frame
    }

    pub fn envelope(&self) -> &[f32] {
        &self.envelope
    }

    /// Transform one block and advance the peak envelope.
    ///
    /// Short blocks are zero-padded and long ones truncated to the block size.
    pub fn update(&mut self, block: &[i16]) -> (&[f32], &[f32]) {
        self.input.fill(0.0);
        for (dst, &s) in self.input.iter_mut().zip(block) {
            *dst = s as f32;
        }

        self.frame.fill(0.0);
        match samples_fft_to_spectrum(&self.input, self.sample_rate, FrequencyLimit::All, None) {
            Ok(spectrum) => {
                let bin_width = self.bin_width();
                for (freq, value) in spectrum.data() {
                    let idx = (freq.val() / bin_width).round() as usize;
                    if let Some(slot) = self.frame.get_mut(idx) {
                        *slot = value.val();
                    }
                }
            }
            Err(e) => tracing::warn!("spectrum analysis failed: {:?}", e),
        }

        let keep = 1.0 - self.config.peak_decay;
        for ((mag, env), &freq) in self.frame.iter_mut().zip(&mut self.envelope).zip(&self.frequencies) {
            *mag *= (1.0 + freq).log10();
            *env = (*env * keep).max(*mag);
        }

        (&self.frame, &self.envelope)
    }

    /// Bar height in rows for a weighted magnitude, capped at `rows`.
    pub fn bar_height(&self, value: f32, rows: usize) -> usize {
        ((value / self.config.magnitude_scale) as usize).min(rows)
    }

    /// Index of the loudest bin in the latest frame
    pub fn dominant_bin(&self) -> Option<usize> {
        self.frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}
