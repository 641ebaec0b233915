use crate::app::Display;
use crate::colors::{pair_color, ColorIndex};
use crate::error::Result;
use crate::grid::{CellBuffer, Grid};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{poll, read, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Print, ResetColor, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::io::{self, stdout, Write};
use std::time::Duration;

/// Full-screen terminal with a back buffer.
///
/// Entering raw mode, the alternate screen and hiding the cursor happen in
/// `new`; `Drop` undoes all three, including on error paths.
pub struct Terminal {
    buffer: CellBuffer,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let (width, height) = size()?;

        enable_raw_mode()?;
        rollback_on_err(
            execute!(stdout(), EnterAlternateScreen, Hide, Clear(ClearType::All)),
            || {
                let _ = disable_raw_mode();
            },
        )?;

        Ok(Self {
            buffer: CellBuffer::new(width, height),
        })
    }

    /// Follow terminal resizes; returns true if the size changed
    fn sync_size(&mut self) -> io::Result<bool> {
        let (width, height) = size()?;
        if (width, height) == (self.buffer.width(), self.buffer.height()) {
            return Ok(false);
        }
        tracing::debug!("terminal resized to {}x{}", width, height);
        self.buffer.resize(width, height);
        execute!(stdout(), Clear(ClearType::All))?;
        Ok(true)
    }

    /// Render the entire buffer to screen
    fn render(&self) -> io::Result<()> {
        let mut out = stdout().lock();
        let mut current: Option<ColorIndex> = None;

        for (y, row) in self.buffer.rows().enumerate() {
            queue!(out, MoveTo(0, y as u16))?;
            for cell in row {
                if current != Some(cell.color) {
                    match pair_color(cell.color) {
                        Some(color) => queue!(out, SetForegroundColor(color))?,
                        None => queue!(out, ResetColor)?,
                    }
                    current = Some(cell.color);
                }
                queue!(out, Print(cell.ch))?;
            }
        }

        queue!(out, ResetColor)?;
        out.flush()
    }
}

impl Grid for Terminal {
    fn width(&self) -> u16 {
        self.buffer.width()
    }

    fn height(&self) -> u16 {
        self.buffer.height()
    }

    fn put(&mut self, row: i32, col: i32, ch: char, color: ColorIndex) {
        self.buffer.put(row, col, ch, color);
    }
}

impl Display for Terminal {
    fn begin_frame(&mut self) -> Result<()> {
        self.sync_size()?;
        self.buffer.clear();
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        Ok(self.render()?)
    }

    /// Check for keypress (non-blocking)
    fn poll_key(&mut self) -> Result<Option<(KeyCode, KeyModifiers)>> {
        while poll(Duration::ZERO)? {
            match read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    return Ok(Some((key.code, key.modifiers)));
                }
                // Resizes are picked up by the next begin_frame
                _ => {}
            }
        }
        Ok(None)
    }
}

/// Run `undo` if `result` failed; `Drop` cannot clean up a half-built terminal.
fn rollback_on_err<T>(result: io::Result<T>, undo: impl FnOnce()) -> io::Result<T> {
    if result.is_err() {
        undo();
    }
    result
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = execute!(stdout(), ResetColor, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn failed_setup_restores_raw_mode() {
        let undone = Cell::new(false);
        let result: io::Result<()> =
            rollback_on_err(Err(io::Error::new(io::ErrorKind::Other, "no tty")), || undone.set(true));
        assert!(result.is_err());
        assert!(undone.get());
    }

    #[test]
    fn successful_setup_keeps_raw_mode() {
        let undone = Cell::new(false);
        assert_eq!(rollback_on_err(Ok(7), || undone.set(true)).unwrap(), 7);
        assert!(!undone.get());
    }
}
