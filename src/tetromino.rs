//! Tetromino definitions and shapes
//!
//! Shapes are boolean matrices rotated with a closed-form transform
//! (transpose + reversed row order), not a table of fixed orientations.

use ratatui::style::Color;

/// The 7 tetromino kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoKind {
    I, // Cyan - long bar
    J, // Blue - J-shape
    L, // Orange - L-shape
    O, // Yellow - square
    S, // Green - S-shape
    T, // Purple - T-shape
    Z, // Red - Z-shape
}

impl TetrominoKind {
    /// Get the color for this tetromino
    pub fn color(&self) -> Color {
        match self {
            TetrominoKind::I => Color::Cyan,
            TetrominoKind::J => Color::Blue,
            TetrominoKind::L => Color::Rgb(255, 165, 0), // Orange
            TetrominoKind::O => Color::Yellow,
            TetrominoKind::S => Color::Green,
            TetrominoKind::T => Color::Magenta,
            TetrominoKind::Z => Color::Red,
        }
    }

    /// All kinds, in the order spawn selection indexes them
    pub fn all() -> [TetrominoKind; 7] {
        [
            TetrominoKind::I,
            TetrominoKind::J,
            TetrominoKind::L,
            TetrominoKind::O,
            TetrominoKind::S,
            TetrominoKind::T,
            TetrominoKind::Z,
        ]
    }

    /// The unrotated shape matrix for this kind
    pub fn base_shape(&self) -> Shape {
        let rows: Vec<Vec<bool>> = match self {
            TetrominoKind::I => vec![vec![true, true, true, true]],
            TetrominoKind::J => vec![vec![true, false, false], vec![true, true, true]],
            TetrominoKind::L => vec![vec![false, false, true], vec![true, true, true]],
            TetrominoKind::O => vec![vec![true, true], vec![true, true]],
            TetrominoKind::S => vec![vec![false, true, true], vec![true, true, false]],
            TetrominoKind::T => vec![vec![false, true, false], vec![true, true, true]],
            TetrominoKind::Z => vec![vec![true, true, false], vec![false, true, true]],
        };
        Shape { rows }
    }
}

/// A rectangular boolean matrix describing which cells a piece occupies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    rows: Vec<Vec<bool>>,
}

impl Shape {
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// A new shape rotated 90 degrees clockwise
    pub fn rotated(&self) -> Shape {
        let h = self.height();
        let w = self.width();
        let rows = (0..w)
            .map(|i| (0..h).map(|j| self.rows[h - 1 - j][i]).collect())
            .collect();
        Shape { rows }
    }

    /// Iterate the occupied (row, col) offsets within the matrix
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, occupied)| **occupied)
                .map(move |(j, _)| (i, j))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_o_rotation_is_identity() {
        let shape = TetrominoKind::O.base_shape();
        assert_eq!(shape.rotated(), shape);
    }

    #[test]
    fn test_four_rotations_return_original() {
        for kind in TetrominoKind::all() {
            let shape = kind.base_shape();
            let quad = shape.rotated().rotated().rotated().rotated();
            assert_eq!(quad, shape, "{:?} did not survive four rotations", kind);
        }
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let shape = TetrominoKind::I.base_shape();
        assert_eq!((shape.width(), shape.height()), (4, 1));
        let rotated = shape.rotated();
        assert_eq!((rotated.width(), rotated.height()), (1, 4));
    }

    #[test]
    fn test_rotation_preserves_cell_count() {
        for kind in TetrominoKind::all() {
            let shape = kind.base_shape();
            assert_eq!(shape.rotated().cells().count(), shape.cells().count());
        }
    }

    #[test]
    fn test_no_degenerate_shapes() {
        // Every base matrix has at least one occupied cell per row and column
        for kind in TetrominoKind::all() {
            let shape = kind.base_shape();
            for i in 0..shape.height() {
                assert!(
                    shape.cells().any(|(r, _)| r == i),
                    "{:?} has an empty row",
                    kind
                );
            }
            for j in 0..shape.width() {
                assert!(
                    shape.cells().any(|(_, c)| c == j),
                    "{:?} has an empty column",
                    kind
                );
            }
        }
    }

    #[test]
    fn test_t_rotation_matches_transform() {
        // .X.        X.
        // XXX   ->   XX
        //            X.
        let rotated = TetrominoKind::T.base_shape().rotated();
        let cells: Vec<_> = rotated.cells().collect();
        assert_eq!(cells, vec![(0, 0), (1, 0), (1, 1), (2, 0)]);
    }
}
