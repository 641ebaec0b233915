//! Single-threaded tick loop: capture, analyse, draw, wait, read one key.

use crate::capture::Capture;
use crate::config::VisualizerConfig;
use crate::error::Result;
use crate::grid::Grid;
use crate::level::{LevelMeter, LevelState};
use crate::mode::{ModeController, Transition, VisualMode};
use crate::render::{FrameData, FrameRenderer};
use crate::spectrum::SpectrumAnalyzer;
use crossterm::event::{KeyCode, KeyModifiers};
use std::thread;

/// Output surface driven by the main loop
pub trait Display: Grid {
    /// Pick up size changes and clear the back buffer
    fn begin_frame(&mut self) -> Result<()>;
    /// Push the back buffer to the screen
    fn present(&mut self) -> Result<()>;
    /// At most one pending key, never blocks
    fn poll_key(&mut self) -> Result<Option<(KeyCode, KeyModifiers)>>;
}

pub struct App {
    config: VisualizerConfig,
    level: LevelMeter,
    spectrum: SpectrumAnalyzer,
    renderer: FrameRenderer,
    modes: ModeController,
}

impl App {
    /// `sample_rate` is the rate the capture device actually runs at.
    pub fn new(config: VisualizerConfig, sample_rate: u32) -> Self {
        Self {
            level: LevelMeter::new(config.level.clone()),
            spectrum: SpectrumAnalyzer::new(config.spectrum.clone(), sample_rate, config.block_size),
            renderer: FrameRenderer::new(&config),
            modes: ModeController::default(),
            config,
        }
    }

    pub fn mode(&self) -> VisualMode {
        self.modes.mode()
    }

    pub fn level(&self) -> LevelState {
        self.level.state()
    }

    pub fn spectrum(&self) -> &SpectrumAnalyzer {
        &self.spectrum
    }

    /// Run until the quit key or a fatal error
    pub fn run(&mut self, capture: &mut impl Capture, display: &mut impl Display) -> Result<()> {
        tracing::info!(
            "visualizer running: {} Hz, {} samples per frame",
            capture.sample_rate(),
            self.config.block_size
        );
        while self.tick(capture, display)? {}
        tracing::info!("quit requested");
        Ok(())
    }

    /// One frame. Returns `false` once quit was requested.
    pub fn tick(&mut self, capture: &mut impl Capture, display: &mut impl Display) -> Result<bool> {
        display.begin_frame()?;

        let block = capture.read_block(self.config.block_size)?;
        let level = self.level.update(&block);
        self.spectrum.update(&block);
        if let Some(bin) = self.spectrum.dominant_bin() {
            tracing::trace!(
                "level {:.1} dB (peak {:.1}), dominant {:.0} Hz",
                level.smoothed_db,
                level.peak_db,
                self.spectrum.frequencies()[bin]
            );
        }

        let frame = FrameData {
            mode: self.modes.mode(),
            spectrum: &self.spectrum,
            level,
            samples: &block,
        };
        self.renderer.render(display, &frame);
        display.present()?;

        thread::sleep(self.config.frame_interval());

        if let Some((code, modifiers)) = display.poll_key()? {
            match self.modes.handle_key(code, modifiers) {
                Transition::Quit => return Ok(false),
                Transition::Switched(mode) => tracing::debug!("mode -> {:?}", mode),
                Transition::Stay => {}
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::ColorIndex;
    use crate::error::Error;
    use crate::grid::CellBuffer;
    use std::collections::VecDeque;

    /// Replays scripted blocks, then fails like an unplugged device
    struct ScriptedCapture {
        blocks: VecDeque<Vec<i16>>,
        reads: usize,
    }

    impl ScriptedCapture {
        fn new(blocks: Vec<Vec<i16>>) -> Self {
            Self { blocks: blocks.into(), reads: 0 }
        }
    }

    impl Capture for ScriptedCapture {
        fn sample_rate(&self) -> u32 {
            44_100
        }

        fn read_block(&mut self, n: usize) -> Result<Vec<i16>> {
            self.reads += 1;
            let mut block = self
                .blocks
                .pop_front()
                .ok_or(Error::Stream(cpal::StreamError::DeviceNotAvailable))?;
            block.resize(n, 0);
            Ok(block)
        }
    }

    struct FakeDisplay {
        grid: CellBuffer,
        keys: VecDeque<Option<char>>,
        frames: usize,
    }

    impl FakeDisplay {
        fn new(keys: &[Option<char>]) -> Self {
            Self {
                grid: CellBuffer::new(80, 22),
                keys: keys.iter().copied().collect(),
                frames: 0,
            }
        }

        fn text(&self) -> String {
            (0..self.grid.height()).map(|r| self.grid.row_text(r) + "\n").collect()
        }
    }

    impl Grid for FakeDisplay {
        fn width(&self) -> u16 {
            self.grid.width()
        }

        fn height(&self) -> u16 {
            self.grid.height()
        }

        fn put(&mut self, row: i32, col: i32, ch: char, color: ColorIndex) {
            self.grid.put(row, col, ch, color);
        }
    }

    impl Display for FakeDisplay {
        fn begin_frame(&mut self) -> Result<()> {
            self.grid.clear();
            Ok(())
        }

        fn present(&mut self) -> Result<()> {
            self.frames += 1;
            Ok(())
        }

        fn poll_key(&mut self) -> Result<Option<(KeyCode, KeyModifiers)>> {
            Ok(self
                .keys
                .pop_front()
                .flatten()
                .map(|c| (KeyCode::Char(c), KeyModifiers::NONE)))
        }
    }

    fn app() -> App {
        let config = VisualizerConfig {
            frame_interval: 0.001,
            ..Default::default()
        };
        App::new(config, 44_100)
    }

    fn loud() -> Vec<i16> {
        (0..1024).map(|i| if i % 2 == 0 { 20_000 } else { -20_000 }).collect()
    }

    #[test]
    fn quit_key_ends_loop_after_current_frame() {
        let mut app = app();
        let mut capture = ScriptedCapture::new(vec![loud(); 10]);
        let mut display = FakeDisplay::new(&[None, None, Some('q')]);

        app.run(&mut capture, &mut display).unwrap();
        assert_eq!(display.frames, 3);
        assert_eq!(capture.reads, 3);
    }

    #[test]
    fn mode_keys_apply_one_per_frame() {
        let mut app = app();
        let mut capture = ScriptedCapture::new(vec![loud(); 10]);
        let mut display = FakeDisplay::new(&[Some('w'), Some('w'), Some('b'), Some('w')]);

        assert!(app.tick(&mut capture, &mut display).unwrap());
        assert_eq!(app.mode(), VisualMode::Waveform);
        assert!(app.tick(&mut capture, &mut display).unwrap());
        assert_eq!(app.mode(), VisualMode::Spectrum);
        assert!(app.tick(&mut capture, &mut display).unwrap());
        assert_eq!(app.mode(), VisualMode::Combined);
        assert!(app.tick(&mut capture, &mut display).unwrap());
        assert_eq!(app.mode(), VisualMode::Spectrum);
    }

    #[test]
    fn waveform_frame_has_no_vu_scale() {
        let mut app = app();
        let mut capture = ScriptedCapture::new(vec![loud(); 3]);
        let mut display = FakeDisplay::new(&[Some('w')]);

        app.tick(&mut capture, &mut display).unwrap();
        assert!(display.text().contains("-60.0dB"));

        app.tick(&mut capture, &mut display).unwrap();
        let text = display.text();
        assert!(!text.contains("-60.0dB"));
        assert!(text.contains('*'));
    }

    #[test]
    fn capture_failure_is_fatal() {
        let mut app = app();
        let mut capture = ScriptedCapture::new(vec![loud()]);
        let mut display = FakeDisplay::new(&[]);

        let result = app.run(&mut capture, &mut display);
        assert!(matches!(result, Err(Error::Stream(_))));
        assert_eq!(display.frames, 1);
    }

    #[test]
    fn state_carries_across_frames() {
        let mut app = app();
        let mut capture = ScriptedCapture::new(vec![loud(), vec![0; 1024]]);
        let mut display = FakeDisplay::new(&[]);

        app.tick(&mut capture, &mut display).unwrap();
        let after_loud = app.level();
        let held = app.spectrum().envelope().to_vec();

        app.tick(&mut capture, &mut display).unwrap();
        let after_silence = app.level();
        assert_eq!(after_silence.instant_db, -60.0);
        assert!((after_loud.peak_db - after_silence.peak_db - 0.4).abs() < 1e-4);
        assert!(app.spectrum().frame().iter().all(|&m| m == 0.0));
        for (now, before) in app.spectrum().envelope().iter().zip(&held) {
            assert!((now - before * 0.95).abs() <= before * 1e-5);
        }
    }

    #[test]
    fn short_capture_blocks_are_padded() {
        let mut app = app();
        let mut capture = ScriptedCapture::new(vec![vec![1000; 100]]);
        let mut display = FakeDisplay::new(&[]);
        assert!(app.tick(&mut capture, &mut display).unwrap());
        assert_eq!(app.spectrum().frame().len(), 513);
    }
}
