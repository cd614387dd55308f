//! Settled-sand cellular automaton.
//!
//! The grid owns the authoritative cell array; renderers borrow it through
//! [`SandGrid::cells`]. Motion is driven by a sparse per-row wake list so a
//! tick only touches pixels that might move. Rows are processed on alternating
//! parity: even rows on one tick, odd rows on the next.

use crate::paint::PaintSource;
use crate::tetromino::Tetromino;
use rand::Rng;

const WORD_BITS: usize = u64::BITS as usize;

/// Per-row set of awake x-columns, stored as bitsets.
#[derive(Debug, Clone)]
struct ActivityTracker {
    words_per_row: usize,
    bits: Vec<u64>,
    row_len: Vec<u32>,
    len: usize,
}

impl ActivityTracker {
    fn new(width: usize, height: usize) -> Self {
        let words_per_row = width.div_ceil(WORD_BITS).max(1);
        Self {
            words_per_row,
            bits: vec![0; words_per_row * height],
            row_len: vec![0; height],
            len: 0,
        }
    }

    #[inline]
    fn insert(&mut self, x: usize, y: usize) {
        let word = y * self.words_per_row + x / WORD_BITS;
        let mask = 1u64 << (x % WORD_BITS);
        if self.bits[word] & mask == 0 {
            self.bits[word] |= mask;
            self.row_len[y] += 1;
            self.len += 1;
        }
    }

    #[inline]
    fn contains(&self, x: usize, y: usize) -> bool {
        let word = y * self.words_per_row + x / WORD_BITS;
        self.bits[word] & (1u64 << (x % WORD_BITS)) != 0
    }

    #[inline]
    fn row_is_empty(&self, y: usize) -> bool {
        self.row_len[y] == 0
    }

    /// Move row `y` into `out`, leaving the row empty.
    fn take_row(&mut self, y: usize, out: &mut [u64]) {
        let start = y * self.words_per_row;
        let row = &mut self.bits[start..start + self.words_per_row];
        out.copy_from_slice(row);
        row.fill(0);
        self.len -= self.row_len[y] as usize;
        self.row_len[y] = 0;
    }

    fn clear(&mut self) {
        self.bits.fill(0);
        self.row_len.fill(0);
        self.len = 0;
    }
}

#[inline]
fn bit_set(words: &[u64], x: usize) -> bool {
    words[x / WORD_BITS] & (1u64 << (x % WORD_BITS)) != 0
}

/// Sand playfield: `width x height` cells, 0 = empty, otherwise a paint index.
#[derive(Debug, Clone)]
pub struct SandGrid {
    width: usize,
    height: usize,
    /// Display row of grid row 0 (the status bar sits above it).
    origin_y: i32,
    cells: Vec<u8>,
    active: ActivityTracker,
    /// Row scratch for `step`, allocated once.
    scratch: Vec<u64>,
    odd_rows: bool,
}

impl SandGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_origin(width, height, 0)
    }

    /// Grid whose row 0 sits at display row `origin_y`.
    pub fn with_origin(width: usize, height: usize, origin_y: i32) -> Self {
        let active = ActivityTracker::new(width, height);
        let scratch = vec![0; active.words_per_row];
        Self {
            width,
            height,
            origin_y,
            cells: vec![0; width * height],
            active,
            scratch,
            odd_rows: false,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn origin_y(&self) -> i32 {
        self.origin_y
    }

    /// Raw row-major cell array for renderers.
    #[inline]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Cell value, or `None` outside the grid.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(self.cells[self.index(x as usize, y as usize)])
    }

    /// Passable for collision purposes: outside the grid or holding no sand.
    #[inline]
    pub fn is_empty_at(&self, x: i32, y: i32) -> bool {
        self.get(x, y).is_none_or(|v| v == 0)
    }

    /// In the grid and holding no sand: a legal destination for a grain.
    #[inline]
    fn is_vacant(&self, x: i32, y: i32) -> bool {
        self.get(x, y) == Some(0)
    }

    /// Write a cell and wake it plus the cells resting on it.
    pub fn set(&mut self, x: i32, y: i32, paint: u8) {
        debug_assert!(self.in_bounds(x, y), "set out of bounds: ({x}, {y})");
        if !self.in_bounds(x, y) {
            return;
        }
        let i = self.index(x as usize, y as usize);
        self.cells[i] = paint;
        self.wake(x, y);
        self.wake_above(x, y);
    }

    /// Mark a cell as a motion candidate. Coordinates outside the grid are ignored.
    #[inline]
    pub fn wake(&mut self, x: i32, y: i32) {
        if self.in_bounds(x, y) {
            self.active.insert(x as usize, y as usize);
        }
    }

    #[inline]
    fn wake_above(&mut self, x: i32, y: i32) {
        self.wake(x - 1, y - 1);
        self.wake(x, y - 1);
        self.wake(x + 1, y - 1);
    }

    pub fn is_awake(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.active.contains(x as usize, y as usize)
    }

    /// Number of awake entries across all rows.
    pub fn active_count(&self) -> usize {
        self.active.len
    }

    /// True once no pixel is a motion candidate.
    pub fn is_settled(&self) -> bool {
        self.active.len == 0
    }

    /// Number of non-empty cells.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
        self.active.clear();
        self.odd_rows = false;
    }

    /// Convert the piece into sand at its current position.
    ///
    /// Every pixel of every occupied mino is painted from `paint` and woken.
    /// Pixels that fall outside the grid are dropped. Returns the number of
    /// pixels written.
    pub fn stamp_tetromino<P: PaintSource + ?Sized>(&mut self, piece: &Tetromino, paint: &P) -> usize {
        let m = piece.mino_size() as i32;
        let class = piece.color();
        let mut written = 0;
        for (col, row, tile) in piece.occupied_cells().occupied() {
            let left = piece.x() + col as i32 * m;
            let top = piece.y() + row as i32 * m - self.origin_y;
            for dy in 0..m {
                for dx in 0..m {
                    let (x, y) = (left + dx, top + dy);
                    if !self.in_bounds(x, y) {
                        continue;
                    }
                    let i = self.index(x as usize, y as usize);
                    self.cells[i] = paint.paint(tile, class, dx as usize, dy as usize);
                    self.wake(x, y);
                    written += 1;
                }
            }
        }
        written
    }

    /// Advance the automaton one tick. Returns how many grains moved.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let parity = usize::from(self.odd_rows);
        self.odd_rows = !self.odd_rows;
        if self.active.len == 0 {
            return 0;
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        let mut moved = 0;
        for y in (0..self.height).rev().filter(|y| y % 2 == parity) {
            if self.active.row_is_empty(y) {
                continue;
            }
            self.active.take_row(y, &mut scratch);
            let left_to_right = rng.random_bool(0.5);
            for i in 0..self.width {
                let x = if left_to_right { i } else { self.width - 1 - i };
                if bit_set(&scratch, x) && self.update(x as i32, y as i32, rng) {
                    moved += 1;
                }
            }
        }
        self.scratch = scratch;
        log::trace!("sand step: moved={moved} awake={}", self.active.len);
        moved
    }

    /// Try to move one awake grain. Returns true if it moved.
    fn update<R: Rng + ?Sized>(&mut self, x: i32, y: i32, rng: &mut R) -> bool {
        if self.is_empty_at(x, y) {
            return false;
        }
        if self.is_vacant(x, y + 1) {
            self.move_grain(x, y, x, y + 1);
            return true;
        }
        // The grain below is about to fall; it is not a pivot yet.
        if self.is_vacant(x, y + 2) {
            self.active.insert(x as usize, y as usize);
            return false;
        }
        let dirs = if rng.random_bool(0.5) { [-1, 1] } else { [1, -1] };
        for dx in dirs {
            if self.is_vacant(x + dx, y + 1) {
                self.move_grain(x, y, x + dx, y + 1);
                return true;
            }
        }
        false
    }

    fn move_grain(&mut self, sx: i32, sy: i32, dx: i32, dy: i32) {
        let src = self.index(sx as usize, sy as usize);
        let dst = self.index(dx as usize, dy as usize);
        self.cells[dst] = self.cells[src];
        self.cells[src] = 0;
        self.wake(dx, dy);
        self.wake_above(sx, sy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::paint::{ColorClass, SpriteSheet};
    use crate::shapes::ShapeKind;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    /// Step until grain at the given row parity gets its turn.
    fn step_both_parities(grid: &mut SandGrid, rng: &mut Pcg32) -> usize {
        grid.step(rng) + grid.step(rng)
    }

    #[test]
    fn test_out_of_bounds_is_empty() {
        let grid = SandGrid::new(10, 10);
        assert!(grid.is_empty_at(-1, 0));
        assert!(grid.is_empty_at(0, -1));
        assert!(grid.is_empty_at(10, 0));
        assert!(grid.is_empty_at(0, 10));
        assert_eq!(grid.get(10, 0), None);
    }

    #[test]
    fn test_single_grain_falls_straight_down() {
        let mut grid = SandGrid::new(10, 10);
        let mut r = rng();
        grid.set(5, 0, 3);
        // Row 0 is even; the first step processes even rows.
        assert_eq!(grid.step(&mut r), 1);
        assert_eq!(grid.get(5, 0), Some(0));
        assert_eq!(grid.get(5, 1), Some(3));
    }

    #[test]
    fn test_blocked_grain_slides_to_exactly_one_diagonal() {
        for seed in 0..32 {
            let mut grid = SandGrid::new(10, 3);
            let mut r = Pcg32::seed_from_u64(seed);
            grid.set(5, 0, 2);
            grid.set(5, 1, 4);
            grid.set(5, 2, 4);
            grid.step(&mut r);
            let left = grid.get(4, 1) == Some(2);
            let right = grid.get(6, 1) == Some(2);
            assert!(left ^ right, "seed {seed}");
            assert_eq!(grid.get(5, 0), Some(0));
            assert_eq!(grid.get(5, 1), Some(4));
        }
    }

    #[test]
    fn test_rests_on_floor() {
        let mut grid = SandGrid::new(4, 2);
        let mut r = rng();
        grid.set(1, 1, 1);
        for _ in 0..4 {
            step_both_parities(&mut grid, &mut r);
        }
        assert_eq!(grid.get(1, 1), Some(1));
        assert!(grid.is_settled());
    }

    #[test]
    fn test_does_not_pivot_on_falling_grain() {
        // (2,0) sits on (2,1) which is itself unsupported.
        let mut grid = SandGrid::new(5, 5);
        let mut r = rng();
        grid.set(2, 0, 1);
        grid.set(2, 1, 2);
        grid.step(&mut r);
        // Even rows processed first: (2,0) must stay put rather than slide.
        assert_eq!(grid.get(2, 0), Some(1));
        assert_eq!(grid.get(1, 1), Some(0));
        assert_eq!(grid.get(3, 1), Some(0));
        assert!(grid.is_awake(2, 0));
    }

    #[test]
    fn test_column_collapses_into_pile() {
        let mut grid = SandGrid::new(7, 6);
        let mut r = rng();
        for y in 0..4 {
            grid.set(3, y, 1);
        }
        for _ in 0..50 {
            grid.step(&mut r);
        }
        assert!(grid.is_settled());
        assert_eq!(grid.filled_count(), 4);
        assert_eq!(grid.get(3, 5), Some(1));
    }

    #[test]
    fn test_settled_step_is_cheap_noop() {
        let mut grid = SandGrid::new(4, 4);
        let mut r = rng();
        assert_eq!(grid.step(&mut r), 0);
        assert!(grid.is_settled());
    }

    #[test]
    fn test_stamp_writes_each_mino_pixel() {
        let config = Config::default();
        let mut grid = SandGrid::with_origin(
            config.playfield_width(),
            config.playfield_height(),
            config.status_bar_height as i32,
        );
        let sheet = SpriteSheet::new(config.mino_size);
        let piece = Tetromino::new(&config, ShapeKind::O, ColorClass::Green);
        let written = grid.stamp_tetromino(&piece, &sheet);
        assert_eq!(written, 4 * 9);
        assert_eq!(grid.filled_count(), 36);
        assert_eq!(grid.active_count(), 36);
        // O occupies logical (1,1): pixel (x+3, y+3) in display space.
        let (px, py) = piece.position();
        let gy = py + 3 - config.status_bar_height as i32;
        assert_ne!(grid.get(px + 3, gy), Some(0));
        assert_eq!(grid.get(px, gy - 3), Some(0));
    }

    #[test]
    fn test_stamp_clips_outside_grid() {
        let config = Config {
            spawn_x: Some(-3),
            ..Config::default()
        };
        // Origin below the piece top so the first mino row is off-grid.
        let mut grid = SandGrid::with_origin(config.playfield_width(), config.playfield_height(), 8);
        let sheet = SpriteSheet::new(config.mino_size);
        let piece = Tetromino::new(&config, ShapeKind::T, ColorClass::Red);
        let written = grid.stamp_tetromino(&piece, &sheet);
        assert!(written < 4 * 9);
        assert_eq!(grid.filled_count(), written);
    }

    #[test]
    fn test_wide_grid_uses_multiple_words() {
        let mut grid = SandGrid::new(130, 4);
        let mut r = rng();
        grid.set(129, 0, 1);
        grid.set(64, 0, 1);
        assert_eq!(grid.active_count(), 2);
        grid.step(&mut r);
        assert_eq!(grid.get(129, 1), Some(1));
        assert_eq!(grid.get(64, 1), Some(1));
    }

    fn random_grid(width: usize, height: usize, cells: &[(usize, usize, u8)]) -> SandGrid {
        let mut grid = SandGrid::new(width, height);
        for &(x, y, v) in cells {
            grid.set((x % width) as i32, (y % height) as i32, v);
        }
        grid
    }

    proptest! {
        #[test]
        fn prop_step_conserves_grains(
            seed in any::<u64>(),
            cells in prop::collection::vec((0usize..12, 0usize..16, 1u8..20), 0..80),
        ) {
            let mut grid = random_grid(12, 16, &cells);
            let mut r = Pcg32::seed_from_u64(seed);
            let before = grid.filled_count();
            for _ in 0..40 {
                grid.step(&mut r);
                prop_assert_eq!(grid.filled_count(), before);
            }
        }

        #[test]
        fn prop_settling_terminates(
            seed in any::<u64>(),
            cells in prop::collection::vec((0usize..10, 0usize..12, 1u8..20), 0..60),
        ) {
            let mut grid = random_grid(10, 12, &cells);
            let mut r = Pcg32::seed_from_u64(seed);
            let mut steps = 0;
            while !grid.is_settled() {
                grid.step(&mut r);
                steps += 1;
                prop_assert!(steps < 10_000, "did not settle");
            }
            // Settled really means nothing can move.
            for y in 0..12i32 {
                for x in 0..10i32 {
                    if grid.get(x, y) != Some(0) && y + 1 < 12 {
                        prop_assert!(!grid.is_vacant(x, y + 1));
                        prop_assert!(!grid.is_vacant(x - 1, y + 1));
                        prop_assert!(!grid.is_vacant(x + 1, y + 1));
                    }
                }
            }
        }

        #[test]
        fn prop_no_diagonal_move_past_unsupported_grain(
            seed in any::<u64>(),
            cells in prop::collection::vec((0usize..8, 0usize..10, 1u8..20), 0..50),
        ) {
            let mut grid = random_grid(8, 10, &cells);
            let mut r = Pcg32::seed_from_u64(seed);
            for _ in 0..30 {
                let before = grid.clone();
                grid.step(&mut r);
                for y in 0..10i32 {
                    for x in 0..8i32 {
                        let was = before.get(x, y).unwrap_or(0);
                        if was == 0 || grid.get(x, y) != Some(0) {
                            continue;
                        }
                        // Grain left (x, y). If it did not go straight down it went
                        // diagonally, which requires a supported pivot below.
                        if before.get(x, y + 1) != Some(0) {
                            prop_assert!(!before.is_vacant(x, y + 2));
                        }
                    }
                }
            }
        }
    }
}
