//! Frame layout and drawing.
//!
//! ```text
//! row 0      -12.34dB RMS        FFT/VU v0.1            -3.0dB
//!            ...                                          ...
//! rows 1..H  spectrum bars / waveform trace         VU scale + meter
//! row H+1    0Hz   430Hz   861Hz ...
//! ```
//!
//! The rightmost 9 columns hold the VU scale; everything left of it is the
//! plot area, one column per frequency bin or per sample.

use crate::colors::{self, ColorIndex, DEFAULT, PEAK_HOLD};
use crate::config::VisualizerConfig;
use crate::grid::Grid;
use crate::level::LevelState;
use crate::mode::VisualMode;
use crate::spectrum::SpectrumAnalyzer;

/// Columns reserved on the right for the VU scale
pub const VU_WIDTH: i32 = 9;
/// Rows below the plot (labels) plus the header
const RESERVED_ROWS: i32 = 2;
/// Approximate number of frequency labels across the plot
const LABEL_COUNT: i32 = 10;

const BAR_CHAR: char = '#';
const PEAK_CHAR: char = '\'';
const VU_PEAK_CHAR: char = '_';
const VU_FILL_CHAR: char = '#';
const WAVE_CHAR: char = '*';

/// Everything one frame needs from the analysis stage
pub struct FrameData<'a> {
    pub mode: VisualMode,
    pub spectrum: &'a SpectrumAnalyzer,
    pub level: LevelState,
    pub samples: &'a [i16],
}

/// Screen geometry derived from the grid size
#[derive(Clone, Copy, Debug, PartialEq)]
struct Layout {
    width: i32,
    /// Bottom plot row; also the number of plot rows
    plot_height: i32,
    plot_width: i32,
}

impl Layout {
    fn of(grid: &impl Grid) -> Self {
        let width = grid.width() as i32;
        Self {
            width,
            plot_height: (grid.height() as i32 - RESERVED_ROWS).max(0),
            plot_width: (width - VU_WIDTH).max(0),
        }
    }
}

pub struct FrameRenderer {
    title: String,
    color_bands: u8,
    waveform_bands: u8,
    min_db: f32,
    max_db: f32,
}

impl FrameRenderer {
    pub fn new(config: &VisualizerConfig) -> Self {
        Self {
            title: config.title.clone(),
            color_bands: config.color_bands,
            waveform_bands: config.waveform_bands,
            min_db: config.level.min_db,
            max_db: config.level.max_db,
        }
    }

    /// Draw one frame; the grid is expected to be cleared beforehand.
    pub fn render(&self, grid: &mut impl Grid, frame: &FrameData) {
        let layout = Layout::of(grid);

        self.draw_header(grid, &layout, &frame.level);

        if layout.plot_height == 0 {
            return;
        }

        if frame.mode.shows_spectrum() {
            self.draw_spectrum(grid, &layout, frame.spectrum);
            self.draw_frequency_labels(grid, &layout, frame.spectrum);
            self.draw_vu(grid, &layout, &frame.level);
        }
        if frame.mode.shows_waveform() {
            self.draw_waveform(grid, &layout, frame.samples);
        }
    }

    fn draw_header(&self, grid: &mut impl Grid, layout: &Layout, level: &LevelState) {
        grid.put_str(0, layout.width / 2 - 10, &self.title, DEFAULT);
        grid.put_str(0, 0, &format!("{:.2}dB RMS", level.smoothed_db), DEFAULT);
    }

    fn draw_spectrum(&self, grid: &mut impl Grid, layout: &Layout, spectrum: &SpectrumAnalyzer) {
        let rows = layout.plot_height as usize;
        let bottom = layout.plot_height;
        let columns = spectrum.bins().min(layout.plot_width as usize);

        for (col, (&mag, &peak)) in spectrum
            .frame()
            .iter()
            .zip(spectrum.envelope())
            .take(columns)
            .enumerate()
        {
            let col = col as i32;
            let height = spectrum.bar_height(mag, rows) as i32;
            let color = colors::band(height as f32, 0.0, rows as f32, self.color_bands);
            for j in 0..height {
                grid.put(bottom - j, col, BAR_CHAR, color);
            }

            let peak_height = spectrum.bar_height(peak, rows) as i32;
            grid.put(bottom - peak_height, col, PEAK_CHAR, PEAK_HOLD);
        }
    }

    /// Label roughly ten columns with the center frequency of the bin drawn there
    fn draw_frequency_labels(&self, grid: &mut impl Grid, layout: &Layout, spectrum: &SpectrumAnalyzer) {
        let row = layout.plot_height + 1;
        let step = (layout.plot_width / LABEL_COUNT).max(1) as usize;
        let freqs = spectrum.frequencies();

        for col in (0..layout.plot_width as usize).step_by(step) {
            if let Some(&freq) = freqs.get(col) {
                grid.put_str(row, col as i32, &format!("{}Hz", freq as i64), DEFAULT);
            }
        }
    }

    fn vu_row_db(&self, i: i32, rows: i32) -> f32 {
        self.min_db + (i as f32 / rows as f32) * (self.max_db - self.min_db)
    }

    fn vu_color(&self, db: f32) -> ColorIndex {
        colors::band(db, self.min_db, self.max_db, self.color_bands)
    }

    /// Right-edge scale: one dB label per row, a single peak mark, and a
    /// filled column up to the smoothed level.
    fn draw_vu(&self, grid: &mut impl Grid, layout: &Layout, level: &LevelState) {
        let rows = layout.plot_height;
        let label_col = layout.width - VU_WIDTH;
        let meter_col = layout.width - 1;
        let row_of = |i: i32| rows - i - 1;

        let mut peak_row = 0;
        for i in 0..rows {
            let db = self.vu_row_db(i, rows);
            grid.put_str(row_of(i), label_col, &format!("{:.1}dB", db), self.vu_color(db));
            if db <= level.peak_db {
                peak_row = i;
            }
        }

        for i in 0..rows {
            let db = self.vu_row_db(i, rows);
            if level.smoothed_db >= db {
                grid.put(row_of(i), meter_col, VU_FILL_CHAR, self.vu_color(db));
            }
        }

        // Over the fill, so a steady level still shows its marker
        let peak_db = self.vu_row_db(peak_row, rows);
        grid.put(row_of(peak_row), meter_col, VU_PEAK_CHAR, self.vu_color(peak_db));
    }

    fn draw_waveform(&self, grid: &mut impl Grid, layout: &Layout, samples: &[i16]) {
        let rows = layout.plot_height;
        let columns = samples.len().min(layout.plot_width as usize);

        for (col, &s) in samples.iter().take(columns).enumerate() {
            let y = (((s as f32 + 32768.0) / 65536.0) * rows as f32) as i32;
            let color = colors::band(y as f32, 0.0, rows as f32, self.waveform_bands);
            grid.put(rows - y, col as i32, WAVE_CHAR, color);
        }
    }
}
