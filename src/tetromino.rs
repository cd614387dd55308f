//! The single active falling piece: shape, rotation, colour, pixel position and gravity.

use crate::config::{Config, FallRateStep, SHAPE_GRID_SIZE};
use crate::input::Tilt;
use crate::paint::ColorClass;
use crate::shapes::{self, Orientation, ShapeGrid, ShapeKind};

/// Active piece. Position is the top-left pixel of its 4x4 box in display coordinates.
#[derive(Debug, Clone)]
pub struct Tetromino {
    kind: ShapeKind,
    orientation: Orientation,
    color: ColorClass,
    x: i32,
    y: i32,
    /// Seconds per pixel of descent.
    fall_rate: f32,
    /// Accumulated seconds since the last committed descent.
    gravity_timer: f32,
    mino_size: usize,
    spawn: (i32, i32),
    fall_rate_floor: f32,
    fall_rate_step: FallRateStep,
}

impl Tetromino {
    pub fn new(config: &Config, kind: ShapeKind, color: ColorClass) -> Self {
        let spawn = config.spawn_position();
        Self {
            kind,
            orientation: Orientation::Up,
            color,
            x: spawn.0,
            y: spawn.1,
            fall_rate: config.initial_fall_rate.max(config.fall_rate_floor()),
            gravity_timer: 0.0,
            mino_size: config.mino_size,
            spawn,
            fall_rate_floor: config.fall_rate_floor(),
            fall_rate_step: config.fall_rate_step,
        }
    }

    /// Occupancy/paint grid for the current kind and orientation.
    #[inline]
    pub fn occupied_cells(&self) -> &'static ShapeGrid {
        shapes::shape(self.kind, self.orientation)
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn color(&self) -> ColorClass {
        self.color
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn fall_rate(&self) -> f32 {
        self.fall_rate
    }

    pub fn gravity_timer(&self) -> f32 {
        self.gravity_timer
    }

    #[inline]
    pub fn mino_size(&self) -> usize {
        self.mino_size
    }

    /// Edge of the 4x4 bounding box in pixels.
    #[inline]
    pub fn box_size(&self) -> i32 {
        (SHAPE_GRID_SIZE * self.mino_size) as i32
    }

    /// Where the piece wants to be after `dt` seconds with the given tilt.
    ///
    /// Only the gravity timer advances; position is untouched until `commit_move`.
    pub fn next_proposed_position(&mut self, dt: f32, tilt: Tilt) -> (i32, i32) {
        self.gravity_timer += dt;
        let x = match tilt {
            Tilt::Left => self.x - 1,
            Tilt::None => self.x,
            Tilt::Right => self.x + 1,
        };
        let y = if self.gravity_timer >= self.fall_rate {
            self.y + 1
        } else {
            self.y
        };
        (x, y)
    }

    /// Apply an approved position. A downward step consumes one fall period
    /// from the timer and keeps the remainder.
    pub fn commit_move(&mut self, x: i32, y: i32) {
        if y > self.y {
            self.gravity_timer = (self.gravity_timer - self.fall_rate).max(0.0);
        }
        self.x = x;
        self.y = y;
    }

    /// Advance orientation clockwise. Legality is the resolver's concern.
    pub fn rotate(&mut self) {
        self.orientation = self.orientation.cw();
    }

    /// Put back an orientation recorded before a rejected rotation.
    pub(crate) fn restore_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Speed up, never past one pixel per tick.
    pub fn decrement_fall_rate(&mut self) {
        let next = match self.fall_rate_step {
            FallRateStep::Decrement(d) => self.fall_rate - d,
            FallRateStep::Factor(f) => self.fall_rate * f,
        };
        self.fall_rate = next.max(self.fall_rate_floor);
    }

    /// Re-seed at the spawn point, upright, with a new shape and colour.
    pub fn reset(&mut self, kind: ShapeKind, color: ColorClass) {
        self.kind = kind;
        self.color = color;
        self.orientation = Orientation::Up;
        self.x = self.spawn.0;
        self.y = self.spawn.1;
        self.gravity_timer = 0.0;
    }

    /// Empty mino columns on the left of the bounding box.
    pub fn left_padding(&self) -> usize {
        self.occupied_cells().left_padding()
    }

    /// Empty mino columns on the right of the bounding box.
    pub fn right_padding(&self) -> usize {
        self.occupied_cells().right_padding()
    }

    /// Empty mino rows at the bottom of the bounding box.
    pub fn bottom_padding(&self) -> usize {
        self.occupied_cells().bottom_padding()
    }
}
