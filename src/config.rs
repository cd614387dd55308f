//! Configuration surface: playfield geometry, timing, fall speed, colour draw table.
//!
//! Built once at startup (defaults, optional JSON file, then CLI overrides) and
//! never mutated afterwards. The core only ever reads it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Matrix width in pixels (64x32 panel mounted portrait).
pub const DISPLAY_WIDTH: usize = 32;
/// Matrix height in pixels.
pub const DISPLAY_HEIGHT: usize = 64;
/// Rows reserved at the top of the matrix for the status bar.
pub const STATUS_BAR_HEIGHT: usize = 5;
/// Pixels per mino edge.
pub const MINO_SIZE: usize = 3;
/// Logical shape grid edge (every shape lives in a 4x4 box).
pub const SHAPE_GRID_SIZE: usize = 4;

/// How `decrement_fall_rate` shrinks the seconds-per-pixel value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallRateStep {
    /// Subtract a fixed number of seconds.
    Decrement(f32),
    /// Multiply by a factor in (0, 1).
    Factor(f32),
}

impl Default for FallRateStep {
    fn default() -> Self {
        Self::Factor(0.85)
    }
}

/// Relative draw weight of each colour class. Wildcard is kept rare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorWeights {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub yellow: u32,
    pub wildcard: u32,
}

impl Default for ColorWeights {
    fn default() -> Self {
        Self {
            red: 24,
            green: 24,
            blue: 24,
            yellow: 24,
            wildcard: 4,
        }
    }
}

impl ColorWeights {
    /// Weights in `ColorClass::ALL` order.
    pub fn as_array(&self) -> [u32; 5] {
        [self.red, self.green, self.blue, self.yellow, self.wildcard]
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("mino size must be at least 1 pixel")]
    ZeroMinoSize,
    #[error("playfield {width}x{height} cannot hold a {min}x{min} piece")]
    PlayfieldTooSmall { width: usize, height: usize, min: usize },
    #[error("tick rate must be a positive finite number, got {0}")]
    InvalidTickRate(f64),
    #[error("fall rate must be positive, got {0}")]
    InvalidFallRate(f32),
    #[error("fall rate factor must be in (0, 1), got {0}")]
    InvalidFallFactor(f32),
    #[error("probability `{name}` must be in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("colour weights must not all be zero")]
    NoColorWeight,
    #[error("locks per level must be at least 1")]
    ZeroLevelThreshold,
}

/// All tunables for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display_width: usize,
    pub display_height: usize,
    pub status_bar_height: usize,
    pub mino_size: usize,
    /// Logic ticks per second.
    pub tick_rate: f64,
    /// Seconds per pixel of descent for a fresh session.
    pub initial_fall_rate: f32,
    /// Floor for the fall rate. Never effective below one tick period.
    pub min_fall_rate: f32,
    pub fall_rate_step: FallRateStep,
    /// Lock events between speed-ups.
    pub locks_per_level: u32,
    /// Tilt angle (degrees) beyond which the piece drifts sideways.
    pub tilt_threshold_deg: f32,
    pub max_kick_shifts: i32,
    pub color_weights: ColorWeights,
    /// Chance that the next piece keeps the previous colour.
    pub keep_color_probability: f64,
    /// Spawn pixel position in display coordinates; `None` centres the piece.
    pub spawn_x: Option<i32>,
    pub spawn_y: Option<i32>,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_width: DISPLAY_WIDTH,
            display_height: DISPLAY_HEIGHT,
            status_bar_height: STATUS_BAR_HEIGHT,
            mino_size: MINO_SIZE,
            tick_rate: 100.0,
            initial_fall_rate: 0.12,
            min_fall_rate: 0.01,
            fall_rate_step: FallRateStep::default(),
            locks_per_level: 10,
            tilt_threshold_deg: 15.0,
            max_kick_shifts: 2,
            color_weights: ColorWeights::default(),
            keep_color_probability: 0.35,
            spawn_x: None,
            spawn_y: None,
            seed: None,
        }
    }
}

impl Config {
    /// Read a JSON config file; keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&s)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mino_size == 0 {
            return Err(ConfigError::ZeroMinoSize);
        }
        let min = SHAPE_GRID_SIZE * self.mino_size;
        if self.playfield_width() < min || self.playfield_height() < min {
            return Err(ConfigError::PlayfieldTooSmall {
                width: self.playfield_width(),
                height: self.playfield_height(),
                min,
            });
        }
        let period = std::time::Duration::try_from_secs_f64(1.0 / self.tick_rate);
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 || period.is_err() {
            return Err(ConfigError::InvalidTickRate(self.tick_rate));
        }
        if self.initial_fall_rate.is_nan() || self.initial_fall_rate <= 0.0 {
            return Err(ConfigError::InvalidFallRate(self.initial_fall_rate));
        }
        if self.min_fall_rate.is_nan() || self.min_fall_rate <= 0.0 {
            return Err(ConfigError::InvalidFallRate(self.min_fall_rate));
        }
        match self.fall_rate_step {
            FallRateStep::Factor(f) if f.is_nan() || f <= 0.0 || f >= 1.0 => {
                return Err(ConfigError::InvalidFallFactor(f));
            }
            FallRateStep::Decrement(d) if d.is_nan() || d < 0.0 => {
                return Err(ConfigError::InvalidFallRate(d));
            }
            _ => {}
        }
        if self.locks_per_level == 0 {
            return Err(ConfigError::ZeroLevelThreshold);
        }
        if !(0.0..=1.0).contains(&self.keep_color_probability) {
            return Err(ConfigError::InvalidProbability {
                name: "keep_color_probability",
                value: self.keep_color_probability,
            });
        }
        if self.color_weights.as_array().iter().all(|&w| w == 0) {
            return Err(ConfigError::NoColorWeight);
        }
        Ok(())
    }

    #[inline]
    pub fn playfield_width(&self) -> usize {
        self.display_width
    }

    #[inline]
    pub fn playfield_height(&self) -> usize {
        self.display_height.saturating_sub(self.status_bar_height)
    }

    /// Seconds per logic tick.
    #[inline]
    pub fn tick_period(&self) -> f32 {
        (1.0 / self.tick_rate) as f32
    }

    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_rate)
    }

    /// Lowest fall rate the piece may reach: one pixel per tick at most.
    pub fn fall_rate_floor(&self) -> f32 {
        self.min_fall_rate.max(self.tick_period())
    }

    /// Piece spawn point in display coordinates.
    pub fn spawn_position(&self) -> (i32, i32) {
        let box_px = (SHAPE_GRID_SIZE * self.mino_size) as i32;
        let x = self
            .spawn_x
            .unwrap_or_else(|| (self.playfield_width() as i32 - box_px) / 2);
        let y = self.spawn_y.unwrap_or(self.status_bar_height as i32);
        (x, y)
    }
}
