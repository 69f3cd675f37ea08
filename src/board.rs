//! Game board representation, collision detection and line clearing

use crate::tetromino::Shape;
use ratatui::style::Color;

/// Board dimensions, row 0 is the top
pub const COLS: usize = 10;
pub const ROWS: usize = 20;

/// Filler color for injected garbage rows
pub const GARBAGE_COLOR: Color = Color::Gray;

/// A cell on the board - either empty or filled with a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled(Color),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Cell::Filled(_))
    }
}

/// Result of a line-clear scan: which rows were full (top to bottom,
/// pre-removal indices) and the score delta they award.
#[derive(Debug, Clone)]
pub struct ClearOutcome {
    pub rows: Vec<usize>,
    pub points: u64,
}

/// Points awarded for clearing `count` rows at once
pub fn line_points(count: usize) -> u64 {
    match count {
        1 => 100,
        2 => 300,
        3 => 500,
        4 => 800,
        _ => 0,
    }
}

/// The game grid
#[derive(Debug, Clone)]
pub struct Board {
    /// Stored as [row][col], row 0 is the top
    cells: [[Cell; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; COLS]; ROWS],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row][col] = cell;
    }

    /// All rows, top to bottom
    pub fn rows(&self) -> &[[Cell; COLS]; ROWS] {
        &self.cells
    }

    /// Test whether `shape` placed with its top-left at (x, y) collides.
    ///
    /// A cell collides when it falls outside the horizontal bounds, below
    /// the floor, or on an occupied cell. Cells above row 0 only collide
    /// against the horizontal bounds so pieces may overhang the top edge.
    pub fn collides(&self, shape: &Shape, x: i32, y: i32) -> bool {
        for (i, j) in shape.cells() {
            let col = x + j as i32;
            let row = y + i as i32;
            if col < 0 || col >= COLS as i32 || row >= ROWS as i32 {
                return true;
            }
            if row >= 0 && self.cells[row as usize][col as usize].is_filled() {
                return true;
            }
        }
        false
    }

    /// Write `color` into every occupied cell of `shape` at (x, y).
    /// Cells above row 0 are dropped silently.
    pub fn merge(&mut self, shape: &Shape, x: i32, y: i32, color: Color) {
        for (i, j) in shape.cells() {
            let row = y + i as i32;
            if row >= 0 {
                self.cells[row as usize][(x + j as i32) as usize] = Cell::Filled(color);
            }
        }
    }

    fn is_row_full(&self, row: usize) -> bool {
        self.cells[row].iter().all(|cell| cell.is_filled())
    }

    /// Remove every full row, shifting the stack down and inserting empty
    /// rows at the top. The outcome reports the removed row indices in
    /// top-to-bottom order plus the score delta.
    pub fn clear_full_rows(&mut self) -> ClearOutcome {
        let full: Vec<usize> = (0..ROWS).filter(|&r| self.is_row_full(r)).collect();
        if full.is_empty() {
            return ClearOutcome {
                rows: full,
                points: 0,
            };
        }

        let mut compacted = [[Cell::Empty; COLS]; ROWS];
        let mut write = ROWS;
        for read in (0..ROWS).rev() {
            if !self.is_row_full(read) {
                write -= 1;
                compacted[write] = self.cells[read];
            }
        }
        self.cells = compacted;

        let points = line_points(full.len());
        ClearOutcome { rows: full, points }
    }

    /// Drop the top row and append a garbage row at the bottom: fully
    /// occupied except a single escape hole at `hole`.
    pub fn add_garbage_row(&mut self, hole: usize, color: Color) {
        for row in 0..ROWS - 1 {
            self.cells[row] = self.cells[row + 1];
        }
        let mut garbage = [Cell::Filled(color); COLS];
        garbage[hole] = Cell::Empty;
        self.cells[ROWS - 1] = garbage;
    }

    /// Empty the entire grid
    pub fn wipe(&mut self) {
        self.cells = [[Cell::Empty; COLS]; ROWS];
    }

    pub fn is_empty(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(|cell| cell.is_empty()))
    }
}
