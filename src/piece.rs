//! Active falling piece logic

use crate::board::{Board, COLS};
use crate::tetromino::{Shape, TetrominoKind};
use ratatui::style::Color;

/// An active falling piece
#[derive(Debug, Clone)]
pub struct Piece {
    /// The kind of tetromino
    pub kind: TetrominoKind,
    /// Current rotation of the shape matrix
    pub shape: Shape,
    /// Grid coordinates of the shape's top-left corner
    pub x: i32,
    pub y: i32,
}

impl Piece {
    /// Create a new piece centered at the top of the board
    pub fn spawn(kind: TetrominoKind) -> Self {
        let shape = kind.base_shape();
        let x = COLS as i32 / 2 - shape.width() as i32 / 2;
        Self { kind, shape, x, y: 0 }
    }

    pub fn color(&self) -> Color {
        self.kind.color()
    }

    /// Absolute grid coordinates of the occupied cells
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .cells()
            .map(|(i, j)| (self.y + i as i32, self.x + j as i32))
    }

    /// Try to shift the piece by (dx, dy), returns true if it moved
    pub fn try_move(&mut self, board: &Board, dx: i32, dy: i32) -> bool {
        if board.collides(&self.shape, self.x + dx, self.y + dy) {
            false
        } else {
            self.x += dx;
            self.y += dy;
            true
        }
    }

    /// Try to rotate the piece 90 degrees clockwise in place.
    ///
    /// Naive rotation: the anchor does not shift and no kick offsets are
    /// tried, so rotations blocked by a wall or the stack are rejected
    /// outright. This matches the rule set, it is not a missing feature.
    pub fn try_rotate(&mut self, board: &Board) -> bool {
        let rotated = self.shape.rotated();
        if board.collides(&rotated, self.x, self.y) {
            false
        } else {
            self.shape = rotated;
            true
        }
    }

    /// Drop the piece to its lowest valid position, returning the number
    /// of rows descended
    pub fn hard_drop(&mut self, board: &Board) -> u32 {
        let mut distance = 0;
        while self.try_move(board, 0, 1) {
            distance += 1;
        }
        distance
    }
}
