//! Character grid that silently drops writes outside its bounds.

use crate::colors::{ColorIndex, DEFAULT};

/// A drawable surface of `width` x `height` character cells.
///
/// `put` must ignore coordinates outside the grid; renderers rely on this
/// and never check bounds themselves.
pub trait Grid {
    fn width(&self) -> u16;
    fn height(&self) -> u16;
    fn put(&mut self, row: i32, col: i32, ch: char, color: ColorIndex);

    /// Write a string left to right starting at `(row, col)`
    fn put_str(&mut self, row: i32, col: i32, s: &str, color: ColorIndex) {
        for (i, ch) in s.chars().enumerate() {
            self.put(row, col + i as i32, ch, color);
        }
    }
}

/// A single cell in the buffer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub color: ColorIndex,
}

impl Default for Cell {
    fn default() -> Self {
        Self { ch: ' ', color: DEFAULT }
    }
}

/// In-memory grid, row-major
#[derive(Clone, Debug)]
pub struct CellBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    /// Change dimensions; contents are cleared
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells = vec![Cell::default(); width as usize * height as usize];
    }

    pub fn get(&self, row: u16, col: u16) -> Option<Cell> {
        if row < self.height && col < self.width {
            Some(self.cells[row as usize * self.width as usize + col as usize])
        } else {
            None
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width.max(1) as usize)
    }

    /// Text of one row with trailing blanks removed
    pub fn row_text(&self, row: u16) -> String {
        let text: String = (0..self.width)
            .filter_map(|col| self.get(row, col))
            .map(|cell| cell.ch)
            .collect();
        text.trim_end().to_string()
    }
}

impl Grid for CellBuffer {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn put(&mut self, row: i32, col: i32, ch: char, color: ColorIndex) {
        if row >= 0 && row < self.height as i32 && col >= 0 && col < self.width as i32 {
            self.cells[row as usize * self.width as usize + col as usize] = Cell { ch, color };
        }
    }
}
