use crossterm::event::{KeyCode, KeyModifiers};

/// What the frame renderer draws
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisualMode {
    /// Spectrum bars, peak marks, frequency axis and VU scale
    #[default]
    Spectrum,
    /// Raw waveform trace only
    Waveform,
    /// Both of the above
    Combined,
}

impl VisualMode {
    pub fn shows_spectrum(self) -> bool {
        matches!(self, VisualMode::Spectrum | VisualMode::Combined)
    }

    pub fn shows_waveform(self) -> bool {
        matches!(self, VisualMode::Waveform | VisualMode::Combined)
    }
}

/// Result of feeding one key to the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Switched(VisualMode),
    Quit,
}

/// Owns the current visual mode and applies key presses to it
#[derive(Debug, Default)]
pub struct ModeController {
    mode: VisualMode,
}

impl ModeController {
    pub fn new(mode: VisualMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> VisualMode {
        self.mode
    }

    /// `w` swaps Spectrum and Waveform; from Combined it returns to Spectrum.
    pub fn toggle_waveform(&mut self) -> VisualMode {
        self.mode = match self.mode {
            VisualMode::Spectrum => VisualMode::Waveform,
            VisualMode::Waveform | VisualMode::Combined => VisualMode::Spectrum,
        };
        self.mode
    }

    /// `b` swaps Spectrum and Combined; from Waveform it returns to Spectrum.
    pub fn toggle_combined(&mut self) -> VisualMode {
        self.mode = match self.mode {
            VisualMode::Spectrum => VisualMode::Combined,
            VisualMode::Combined | VisualMode::Waveform => VisualMode::Spectrum,
        };
        self.mode
    }

    /// Handle one keypress
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Transition {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Transition::Quit,
            KeyCode::Char('q') | KeyCode::Esc => Transition::Quit,
            KeyCode::Char('w') => Transition::Switched(self.toggle_waveform()),
            KeyCode::Char('b') => Transition::Switched(self.toggle_combined()),
            _ => Transition::Stay,
        }
    }
}
