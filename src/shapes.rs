//! Shape table: 7 kinds x 4 orientations, each a 4x4 grid of tile columns.
//!
//! A cell value of 0 is empty; any other value is the sprite-sheet tile column
//! used to texture that mino when it is stamped into sand.

use crate::config::SHAPE_GRID_SIZE;

const N: usize = SHAPE_GRID_SIZE;

/// Tetromino kinds (I, O, T, J, L, S, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    I,
    O,
    T,
    J,
    L,
    S,
    Z,
}

impl ShapeKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::J, Self::L, Self::S, Self::Z];

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I => "I",
            Self::O => "O",
            Self::T => "T",
            Self::J => "J",
            Self::L => "L",
            Self::S => "S",
            Self::Z => "Z",
        }
    }
}

/// Rotation state; `Up` is the canonical spawn orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Up,
    Right,
    Down,
    Left,
}

impl Orientation {
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Next orientation clockwise, wrapping Left -> Up.
    pub fn cw(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// One 4x4 occupancy/paint grid, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeGrid([u8; N * N]);

impl ShapeGrid {
    /// Tile column at logical `(col, row)`; 0 when empty or outside the grid.
    #[inline]
    pub fn tile(&self, col: usize, row: usize) -> u8 {
        if col >= N || row >= N {
            return 0;
        }
        self.0[row * N + col]
    }

    #[inline]
    pub fn is_occupied(&self, col: usize, row: usize) -> bool {
        self.tile(col, row) != 0
    }

    /// Occupied cells as `(col, row, tile)`.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, t)| **t != 0)
            .map(|(i, t)| (i % N, i / N, *t))
    }

    pub fn occupied_count(&self) -> usize {
        self.0.iter().filter(|t| **t != 0).count()
    }

    fn column_empty(&self, col: usize) -> bool {
        (0..N).all(|row| !self.is_occupied(col, row))
    }

    fn row_empty(&self, row: usize) -> bool {
        (0..N).all(|col| !self.is_occupied(col, row))
    }

    /// Empty columns on the left edge, in minos.
    pub fn left_padding(&self) -> usize {
        (0..N).take_while(|&c| self.column_empty(c)).count()
    }

    /// Empty columns on the right edge, in minos.
    pub fn right_padding(&self) -> usize {
        (0..N).rev().take_while(|&c| self.column_empty(c)).count()
    }

    /// Empty rows along the bottom edge, in minos.
    pub fn bottom_padding(&self) -> usize {
        (0..N).rev().take_while(|&r| self.row_empty(r)).count()
    }
}

/// Expand a 0/1 mask into a grid painted with `tile`.
const fn paint(mask: [u8; N * N], tile: u8) -> ShapeGrid {
    let mut out = [0u8; N * N];
    let mut i = 0;
    while i < N * N {
        if mask[i] != 0 {
            out[i] = tile;
        }
        i += 1;
    }
    ShapeGrid(out)
}

const TILE_LONG: u8 = 1;
const TILE_BENT: u8 = 2;
const TILE_SKEW: u8 = 3;

/// Number of distinct tile columns the table references.
pub const TILE_COLUMNS: u8 = 3;

#[rustfmt::skip]
static SHAPES: [[ShapeGrid; 4]; 7] = [
    // I
    [
        paint([0,0,0,0, 1,1,1,1, 0,0,0,0, 0,0,0,0], TILE_LONG),
        paint([0,0,1,0, 0,0,1,0, 0,0,1,0, 0,0,1,0], TILE_LONG),
        paint([0,0,0,0, 0,0,0,0, 1,1,1,1, 0,0,0,0], TILE_LONG),
        paint([0,1,0,0, 0,1,0,0, 0,1,0,0, 0,1,0,0], TILE_LONG),
    ],
    // O
    [
        paint([0,0,0,0, 0,1,1,0, 0,1,1,0, 0,0,0,0], TILE_LONG),
        paint([0,0,0,0, 0,1,1,0, 0,1,1,0, 0,0,0,0], TILE_LONG),
        paint([0,0,0,0, 0,1,1,0, 0,1,1,0, 0,0,0,0], TILE_LONG),
        paint([0,0,0,0, 0,1,1,0, 0,1,1,0, 0,0,0,0], TILE_LONG),
    ],
    // T
    [
        paint([0,1,0,0, 1,1,1,0, 0,0,0,0, 0,0,0,0], TILE_BENT),
        paint([0,1,0,0, 0,1,1,0, 0,1,0,0, 0,0,0,0], TILE_BENT),
        paint([0,0,0,0, 1,1,1,0, 0,1,0,0, 0,0,0,0], TILE_BENT),
        paint([0,1,0,0, 1,1,0,0, 0,1,0,0, 0,0,0,0], TILE_BENT),
    ],
    // J
    [
        paint([1,0,0,0, 1,1,1,0, 0,0,0,0, 0,0,0,0], TILE_BENT),
        paint([0,1,1,0, 0,1,0,0, 0,1,0,0, 0,0,0,0], TILE_BENT),
        paint([0,0,0,0, 1,1,1,0, 0,0,1,0, 0,0,0,0], TILE_BENT),
        paint([0,1,0,0, 0,1,0,0, 1,1,0,0, 0,0,0,0], TILE_BENT),
    ],
    // L
    [
        paint([0,0,1,0, 1,1,1,0, 0,0,0,0, 0,0,0,0], TILE_BENT),
        paint([0,1,0,0, 0,1,0,0, 0,1,1,0, 0,0,0,0], TILE_BENT),
        paint([0,0,0,0, 1,1,1,0, 1,0,0,0, 0,0,0,0], TILE_BENT),
        paint([1,1,0,0, 0,1,0,0, 0,1,0,0, 0,0,0,0], TILE_BENT),
    ],
    // S
    [
        paint([0,1,1,0, 1,1,0,0, 0,0,0,0, 0,0,0,0], TILE_SKEW),
        paint([0,1,0,0, 0,1,1,0, 0,0,1,0, 0,0,0,0], TILE_SKEW),
        paint([0,0,0,0, 0,1,1,0, 1,1,0,0, 0,0,0,0], TILE_SKEW),
        paint([1,0,0,0, 1,1,0,0, 0,1,0,0, 0,0,0,0], TILE_SKEW),
    ],
    // Z
    [
        paint([1,1,0,0, 0,1,1,0, 0,0,0,0, 0,0,0,0], TILE_SKEW),
        paint([0,0,1,0, 0,1,1,0, 0,1,0,0, 0,0,0,0], TILE_SKEW),
        paint([0,0,0,0, 1,1,0,0, 0,1,1,0, 0,0,0,0], TILE_SKEW),
        paint([0,1,0,0, 1,1,0,0, 1,0,0,0, 0,0,0,0], TILE_SKEW),
    ],
];

/// Table entry for `(kind, orientation)`.
#[inline]
pub fn shape(kind: ShapeKind, orientation: Orientation) -> &'static ShapeGrid {
    &SHAPES[kind.index()][orientation.index()]
}
