use crossterm::style::Color;

/// Index into the color-pair palette (0 = terminal default foreground)
pub type ColorIndex = u8;

/// Highest registered color pair
pub const PALETTE_SIZE: u8 = 16;

/// Fixed highlight pair for spectrum peak-hold marks
pub const PEAK_HOLD: ColorIndex = 7;

/// Pair used for plain text (header, frequency labels)
pub const DEFAULT: ColorIndex = 0;

/// Map `value` within `[min, max]` to a color band in `[0, bands]`.
///
/// Values near `max` get low band numbers, values near `min` get high ones.
/// A degenerate range maps everything to `bands`.
pub fn band(value: f32, min: f32, max: f32, bands: u8) -> ColorIndex {
    if !(max > min) || !value.is_finite() {
        return bands;
    }
    let t = (value - min) / (max - min);
    let level = bands as i32 - (t * bands as f32).floor() as i32;
    level.clamp(0, bands as i32) as ColorIndex
}

/// Foreground color registered for a pair index, against the default background.
///
/// Pairs 1-15 are the 16-color ANSI palette entries of the same number.
pub fn pair_color(index: ColorIndex) -> Option<Color> {
    match index {
        0 => None,
        i if i < PALETTE_SIZE => Some(Color::AnsiValue(i)),
        _ => Some(Color::White),
    }
}
