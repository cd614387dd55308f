//! Piece-vs-playfield checks and rotation resolution.
//!
//! All checks work on the piece's visual footprint (the 4x4 box minus its
//! empty padding rows/columns), never the full box.

use crate::config::SHAPE_GRID_SIZE;
use crate::sand::SandGrid;
use crate::tetromino::Tetromino;

/// Result of a rotation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Rotated in place.
    Rotated,
    /// Rotated and shifted horizontally by this many pixels.
    Kicked(i32),
    /// Orientation and position left unchanged.
    Rejected,
}

/// True if the piece at `(x, y)` would sink through the floor or overlap sand.
///
/// `(x, y)` is in display coordinates; the grid's origin row is subtracted.
pub fn would_collide_vertically(piece: &Tetromino, x: i32, y: i32, grid: &SandGrid) -> bool {
    let m = piece.mino_size() as i32;
    let occupied_rows = (SHAPE_GRID_SIZE - piece.bottom_padding()) as i32;
    let bottom = y - grid.origin_y() + occupied_rows * m - 1;
    if bottom >= grid.height() as i32 {
        return true;
    }
    for (col, row, _) in piece.occupied_cells().occupied() {
        let left = x + col as i32 * m;
        let top = y - grid.origin_y() + row as i32 * m;
        for dy in 0..m {
            for dx in 0..m {
                if !grid.is_empty_at(left + dx, top + dy) {
                    return true;
                }
            }
        }
    }
    false
}

/// True if the visual footprint at column `x` pokes past either side wall.
pub fn would_hit_wall(piece: &Tetromino, x: i32, playfield_width: usize) -> bool {
    let m = piece.mino_size() as i32;
    let left = x + piece.left_padding() as i32 * m;
    let right = x + piece.box_size() - 1 - piece.right_padding() as i32 * m;
    left < 0 || right >= playfield_width as i32
}

/// Rotate clockwise, kicking sideways off walls if needed.
///
/// A rotation that hits the floor or sand is rejected outright. A wall hit
/// searches offsets `+1, -1, +2, -2, ...` up to `max_shifts` and takes the
/// first that clears both walls and sand. On rejection the piece is exactly
/// as it was before the call.
pub fn resolve_rotation(piece: &mut Tetromino, grid: &SandGrid, max_shifts: i32) -> RotationOutcome {
    let orientation = piece.orientation();
    let (x, y) = piece.position();
    let width = grid.width();

    piece.rotate();
    if would_collide_vertically(piece, x, y, grid) {
        piece.restore_orientation(orientation);
        log::debug!("rotation rejected: blocked at ({x}, {y})");
        return RotationOutcome::Rejected;
    }
    if !would_hit_wall(piece, x, width) {
        return RotationOutcome::Rotated;
    }

    for magnitude in 1..=max_shifts.max(0) {
        for offset in [magnitude, -magnitude] {
            let kx = x + offset;
            if !would_hit_wall(piece, kx, width) && !would_collide_vertically(piece, kx, y, grid) {
                piece.commit_move(kx, y);
                log::debug!("rotation kicked by {offset}");
                return RotationOutcome::Kicked(offset);
            }
        }
    }

    piece.restore_orientation(orientation);
    piece.commit_move(x, y);
    log::debug!("rotation rejected: no kick within {max_shifts}");
    RotationOutcome::Rejected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::paint::ColorClass;
    use crate::shapes::{Orientation, ShapeKind};
    use proptest::prelude::*;

    /// Grid matching the default config's playfield and status-bar offset.
    fn grid(config: &Config) -> SandGrid {
        SandGrid::with_origin(
            config.playfield_width(),
            config.playfield_height(),
            config.status_bar_height as i32,
        )
    }

    fn piece_at(config: &Config, kind: ShapeKind, x: i32, y: i32) -> Tetromino {
        let config = Config {
            spawn_x: Some(x),
            spawn_y: Some(y),
            ..config.clone()
        };
        Tetromino::new(&config, kind, ColorClass::Blue)
    }

    fn rotated(mut t: Tetromino, times: usize) -> Tetromino {
        for _ in 0..times {
            t.rotate();
        }
        t
    }

    #[test]
    fn test_wall_uses_left_padding() {
        let config = Config::default();
        // I pointing right: two empty mino columns on the left.
        let vertical_i = rotated(piece_at(&config, ShapeKind::I, 0, 5), 1);
        assert_eq!(vertical_i.left_padding(), 2);
        assert!(!would_hit_wall(&vertical_i, -1, config.playfield_width()));
        assert!(!would_hit_wall(&vertical_i, -6, config.playfield_width()));
        assert!(would_hit_wall(&vertical_i, -7, config.playfield_width()));

        let flat_i = piece_at(&config, ShapeKind::I, 0, 5);
        assert_eq!(flat_i.left_padding(), 0);
        assert!(would_hit_wall(&flat_i, -1, config.playfield_width()));
    }

    #[test]
    fn test_wall_uses_right_padding() {
        let config = Config::default();
        let t = piece_at(&config, ShapeKind::T, 0, 5);
        // T up spans three minos (9 px) from its box origin.
        assert!(!would_hit_wall(&t, 32 - 9, 32));
        assert!(would_hit_wall(&t, 32 - 8, 32));
    }

    #[test]
    fn test_floor_uses_bottom_padding() {
        let config = Config::default();
        let g = grid(&config);
        // O up: rows 1 and 2 occupied, bottom edge at y + 8 (display).
        let floor_display = config.display_height as i32;
        let resting_y = floor_display - 9;
        let o = piece_at(&config, ShapeKind::O, 10, resting_y);
        assert!(!would_collide_vertically(&o, 10, resting_y, &g));
        assert!(would_collide_vertically(&o, 10, resting_y + 1, &g));
    }

    #[test]
    fn test_sand_overlap_collides() {
        let config = Config::default();
        let mut g = grid(&config);
        let o = piece_at(&config, ShapeKind::O, 10, 5);
        // O's lowest pixel row sits at display y = 5 + 8 = 13 -> grid row 8.
        g.set(13, 9, 1);
        assert!(!would_collide_vertically(&o, 10, 5, &g));
        assert!(would_collide_vertically(&o, 10, 6, &g));
        // Sand next to the footprint but inside the empty padding is ignored.
        let mut g = grid(&config);
        g.set(10, 1, 1);
        assert!(!would_collide_vertically(&o, 10, 5, &g));
    }

    #[test]
    fn test_rotation_in_open_space() {
        let config = Config::default();
        let g = grid(&config);
        let mut t = piece_at(&config, ShapeKind::T, 10, 20);
        assert_eq!(resolve_rotation(&mut t, &g, 2), RotationOutcome::Rotated);
        assert_eq!(t.orientation(), Orientation::Right);
        assert_eq!(t.position(), (10, 20));
    }

    #[test]
    fn test_rotation_kicks_off_left_wall() {
        let config = Config::default();
        let g = grid(&config);
        // Vertical I near the left wall; rotating flat needs x >= 0.
        let mut t = rotated(piece_at(&config, ShapeKind::I, -6, 20), 3);
        assert_eq!(t.orientation(), Orientation::Left);
        t.commit_move(-3, 20);
        // Flat I needs a +3 shift; two is not enough.
        let outcome = resolve_rotation(&mut t, &g, 2);
        assert_eq!(outcome, RotationOutcome::Rejected);
        assert_eq!(t.orientation(), Orientation::Left);
        assert_eq!(t.position(), (-3, 20));

        let mut t = rotated(piece_at(&config, ShapeKind::T, -1, 20), 1);
        // T right has one empty column on the left, so x = -3 is legal.
        t.commit_move(-3, 20);
        assert!(!would_hit_wall(&t, -3, 32));
        let outcome = resolve_rotation(&mut t, &g, 3);
        assert_eq!(outcome, RotationOutcome::Kicked(3));
        assert_eq!(t.orientation(), Orientation::Down);
        assert_eq!(t.position(), (0, 20));
    }

    #[test]
    fn test_rotation_kick_prefers_right_then_left() {
        let config = Config::default();
        let g = grid(&config);
        let mut t = rotated(piece_at(&config, ShapeKind::T, 0, 20), 3);
        // T left: empty rightmost two columns; moving to the right wall.
        t.commit_move(32 - 6, 20);
        assert!(!would_hit_wall(&t, 32 - 6, 32));
        let outcome = resolve_rotation(&mut t, &g, 4);
        assert_eq!(outcome, RotationOutcome::Kicked(-3));
        assert_eq!(t.position(), (32 - 9, 20));
    }

    #[test]
    fn test_rotation_into_sand_is_rejected() {
        let config = Config::default();
        let mut g = grid(&config);
        let mut t = piece_at(&config, ShapeKind::I, 10, 20);
        // Vertical I occupies column 2 (x 16..18) rows 0..3 of the box.
        g.set(16, 20 - 5 + 11, 1);
        assert_eq!(resolve_rotation(&mut t, &g, 2), RotationOutcome::Rejected);
        assert_eq!(t.orientation(), Orientation::Up);
        assert_eq!(t.position(), (10, 20));
    }

    proptest! {
        #[test]
        fn prop_wall_check_matches_footprint(
            kind_i in 0usize..7,
            turns in 0usize..4,
            x in -15i32..40,
        ) {
            let config = Config::default();
            let t = rotated(piece_at(&config, ShapeKind::ALL[kind_i], 0, 5), turns);
            let m = config.mino_size as i32;
            let inside = t
                .occupied_cells()
                .occupied()
                .all(|(col, _, _)| {
                    let left = x + col as i32 * m;
                    left >= 0 && left + m - 1 < config.playfield_width() as i32
                });
            prop_assert_eq!(would_hit_wall(&t, x, config.playfield_width()), !inside);
        }

        #[test]
        fn prop_floor_always_collides(
            kind_i in 0usize..7,
            turns in 0usize..4,
            y in 0i32..80,
        ) {
            let config = Config::default();
            let g = grid(&config);
            let t = rotated(piece_at(&config, ShapeKind::ALL[kind_i], 10, 5), turns);
            let m = config.mino_size as i32;
            let lowest_row = t.occupied_cells().occupied().map(|(_, r, _)| r as i32).max().unwrap_or(0);
            let bottom_edge = y - config.status_bar_height as i32 + lowest_row * m + m - 1;
            if bottom_edge >= config.playfield_height() as i32 {
                prop_assert!(would_collide_vertically(&t, 10, y, &g));
            } else {
                prop_assert!(!would_collide_vertically(&t, 10, y, &g));
            }
        }

        #[test]
        fn prop_rejected_rotation_restores_piece(
            kind_i in 0usize..7,
            turns in 0usize..4,
            x in -9i32..32,
            y in 5i32..64,
            shifts in 0i32..4,
            sand in prop::collection::vec((0i32..32, 0i32..59), 0..40),
        ) {
            let config = Config::default();
            let mut g = grid(&config);
            for (sx, sy) in sand {
                g.set(sx, sy, 1);
            }
            let mut t = rotated(piece_at(&config, ShapeKind::ALL[kind_i], x, y), turns);
            let before = (t.orientation(), t.position());
            let outcome = resolve_rotation(&mut t, &g, shifts);
            match outcome {
                RotationOutcome::Rejected => {
                    prop_assert_eq!((t.orientation(), t.position()), before);
                }
                RotationOutcome::Rotated => {
                    prop_assert_eq!(t.position(), before.1);
                    prop_assert_eq!(t.orientation(), before.0.cw());
                }
                RotationOutcome::Kicked(off) => {
                    prop_assert!(off != 0 && off.abs() <= shifts);
                    prop_assert_eq!(t.position(), (before.1.0 + off, before.1.1));
                    prop_assert!(!would_hit_wall(&t, t.x(), config.playfield_width()));
                }
            }
        }
    }
}
