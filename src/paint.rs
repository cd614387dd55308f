//! Colour classes, paint-index encoding and the sprite sheet used to stamp minos.
//!
//! A paint index is what a sand cell stores: 0 is empty, otherwise it packs a
//! colour class and a shade so the renderer can recover both without any
//! per-pixel side table.

use crate::shapes::TILE_COLUMNS;

/// Shades per colour class (base, highlight, shadow, speck).
pub const SHADES: u8 = 4;

pub const SHADE_BASE: u8 = 0;
pub const SHADE_HIGHLIGHT: u8 = 1;
pub const SHADE_SHADOW: u8 = 2;
pub const SHADE_SPECK: u8 = 3;

/// Piece colour. `Wildcard` is the rare "matches any colour" category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorClass {
    #[default]
    Red,
    Green,
    Blue,
    Yellow,
    Wildcard,
}

impl ColorClass {
    pub const ALL: [Self; 5] = [
        Self::Red,
        Self::Green,
        Self::Blue,
        Self::Yellow,
        Self::Wildcard,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Wildcard => "wildcard",
        }
    }
}

/// Pack `(class, shade)` into a non-zero cell value.
#[inline]
pub fn encode(class: ColorClass, shade: u8) -> u8 {
    1 + class.index() as u8 * SHADES + shade.min(SHADES - 1)
}

/// Unpack a cell value; `None` for the empty sentinel or an unknown value.
#[inline]
pub fn decode(paint: u8) -> Option<(ColorClass, u8)> {
    if paint == 0 {
        return None;
    }
    let v = paint - 1;
    let class = ColorClass::from_index((v / SHADES) as usize)?;
    Some((class, v % SHADES))
}

/// Where stamped pixels get their paint from.
pub trait PaintSource {
    /// Paint for pixel `(dx, dy)` inside a mino drawn with `tile` in `class`.
    fn paint(&self, tile: u8, class: ColorClass, dx: usize, dy: usize) -> u8;
}

/// Precomputed mino textures, one per (colour class, tile column).
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    mino_size: usize,
    pixels: Vec<u8>,
}

impl SpriteSheet {
    pub fn new(mino_size: usize) -> Self {
        let m = mino_size.max(1);
        let tiles = TILE_COLUMNS as usize;
        let mut pixels = vec![0u8; ColorClass::ALL.len() * tiles * m * m];
        for class in ColorClass::ALL {
            for tile in 1..=TILE_COLUMNS {
                for dy in 0..m {
                    for dx in 0..m {
                        let i = Self::offset(m, class, tile, dx, dy);
                        pixels[i] = encode(class, texture(tile, dx, dy, m));
                    }
                }
            }
        }
        Self {
            mino_size: m,
            pixels,
        }
    }

    pub fn mino_size(&self) -> usize {
        self.mino_size
    }

    fn offset(m: usize, class: ColorClass, tile: u8, dx: usize, dy: usize) -> usize {
        let tiles = TILE_COLUMNS as usize;
        ((class.index() * tiles + (tile as usize - 1)) * m + dy) * m + dx
    }
}

impl PaintSource for SpriteSheet {
    fn paint(&self, tile: u8, class: ColorClass, dx: usize, dy: usize) -> u8 {
        let m = self.mino_size;
        if tile == 0 || tile > TILE_COLUMNS || dx >= m || dy >= m {
            return encode(class, SHADE_BASE);
        }
        self.pixels[Self::offset(m, class, tile, dx, dy)]
    }
}

/// Shade pattern of one tile column.
fn texture(tile: u8, dx: usize, dy: usize, m: usize) -> u8 {
    let last = m - 1;
    match tile {
        // Shadowed bottom/right edge.
        1 => {
            if m > 1 && (dx == last || dy == last) {
                SHADE_SHADOW
            } else {
                SHADE_BASE
            }
        }
        // Bevel: lit top-left, shaded bottom-right.
        2 => {
            if m > 1 && (dx == 0 || dy == 0) {
                SHADE_HIGHLIGHT
            } else if m > 1 && (dx == last || dy == last) {
                SHADE_SHADOW
            } else {
                SHADE_BASE
            }
        }
        // Speckled grain.
        _ => {
            if (dx + dy) % 2 == 1 {
                SHADE_SPECK
            } else {
                SHADE_BASE
            }
        }
    }
}
