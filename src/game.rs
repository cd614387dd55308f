//! Game loop controller: one fixed-rate tick of input, motion, locking and sand physics.

use crate::collision::{self, RotationOutcome};
use crate::config::{Config, ConfigError};
use crate::input::InputRecord;
use crate::paint::{ColorClass, SpriteSheet};
use crate::sand::SandGrid;
use crate::shapes::ShapeKind;
use crate::tetromino::Tetromino;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::fmt::Debug;

/// Hook for clearing matched sand after each physics step.
///
/// Returns the number of cleared pixels, which is added to the score. The
/// matching rule is left to implementors.
pub trait LineClear: Debug {
    fn clear(&mut self, grid: &mut SandGrid) -> u32;
}

/// Never clears anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLineClear;

impl LineClear for NoLineClear {
    fn clear(&mut self, _grid: &mut SandGrid) -> u32 {
        0
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub rotation: Option<RotationOutcome>,
    /// The piece was stamped into sand and replaced.
    pub locked: bool,
    /// Pixels written into the grid by the lock.
    pub stamped: usize,
    pub level_up: bool,
    /// Horizontal motion was refused at a wall.
    pub wall_blocked: bool,
    pub grains_moved: usize,
    pub cleared: u32,
}

/// One play session: sand, active piece, next-piece preview and the shared RNG.
#[derive(Debug)]
pub struct Game {
    config: Config,
    seed: u64,
    rng: Pcg32,
    sand: SandGrid,
    piece: Tetromino,
    sheet: SpriteSheet,
    colors: WeightedIndex<u32>,
    next_shape: ShapeKind,
    next_color: ColorClass,
    drop_count: u32,
    level: u32,
    score: u64,
    ticks: u64,
    line_clear: Box<dyn LineClear>,
}

impl Game {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let colors = WeightedIndex::new(config.color_weights.as_array())
            .map_err(|_| ConfigError::NoColorWeight)?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = Pcg32::seed_from_u64(seed);

        let first_shape = random_shape(&mut rng);
        let first_color = ColorClass::ALL[colors.sample(&mut rng)];
        let next_shape = random_shape(&mut rng);
        let next_color = ColorClass::ALL[colors.sample(&mut rng)];

        let sand = SandGrid::with_origin(
            config.playfield_width(),
            config.playfield_height(),
            config.status_bar_height as i32,
        );
        let piece = Tetromino::new(&config, first_shape, first_color);
        let sheet = SpriteSheet::new(config.mino_size);
        log::info!(
            "new game: seed={seed} playfield={}x{} mino={} tick={}Hz",
            config.playfield_width(),
            config.playfield_height(),
            config.mino_size,
            config.tick_rate
        );

        Ok(Self {
            config,
            seed,
            rng,
            sand,
            piece,
            sheet,
            colors,
            next_shape,
            next_color,
            drop_count: 0,
            level: 1,
            score: 0,
            ticks: 0,
            line_clear: Box::new(NoLineClear),
        })
    }

    /// Replace the line-clear rule.
    pub fn with_line_clear(mut self, rule: Box<dyn LineClear>) -> Self {
        self.line_clear = rule;
        self
    }

    /// Run one tick with the given input.
    pub fn tick(&mut self, input: InputRecord) -> TickReport {
        let mut report = TickReport::default();
        self.ticks += 1;

        if input.rotate_requested {
            report.rotation = Some(collision::resolve_rotation(
                &mut self.piece,
                &self.sand,
                self.config.max_kick_shifts,
            ));
        }

        let (x, y) = self
            .piece
            .next_proposed_position(self.config.tick_period(), input.tilt);
        let hits_wall = collision::would_hit_wall(&self.piece, x, self.sand.width());
        // A wall-clamped move lands at the old column, which needs its own check.
        let colliding = collision::would_collide_vertically(&self.piece, x, y, &self.sand)
            || (hits_wall
                && collision::would_collide_vertically(&self.piece, self.piece.x(), y, &self.sand));

        if colliding {
            let (stamped, level_up) = self.lock_piece();
            report.locked = true;
            report.stamped = stamped;
            report.level_up = level_up;
        } else {
            let x = if hits_wall {
                report.wall_blocked = true;
                self.piece.x()
            } else {
                x
            };
            self.piece.commit_move(x, y);
        }

        report.grains_moved = self.sand.step(&mut self.rng);
        report.cleared = self.line_clear.clear(&mut self.sand);
        self.score += u64::from(report.cleared);
        report
    }

    /// Stamp the piece, maybe speed up, and bring in the next one.
    fn lock_piece(&mut self) -> (usize, bool) {
        let stamped = self.sand.stamp_tetromino(&self.piece, &self.sheet);
        log::debug!(
            "lock #{}: {} {} at {:?}, {stamped} px",
            self.drop_count + 1,
            self.piece.kind().name(),
            self.piece.color().name(),
            self.piece.position()
        );

        self.drop_count += 1;
        let level_up = self.drop_count % self.config.locks_per_level == 0;
        if level_up {
            self.piece.decrement_fall_rate();
            self.level += 1;
            log::info!(
                "level {}: fall rate {:.4}s/px",
                self.level,
                self.piece.fall_rate()
            );
        }

        self.piece.reset(self.next_shape, self.next_color);
        self.next_shape = random_shape(&mut self.rng);
        if !self.rng.random_bool(self.config.keep_color_probability) {
            self.next_color = ColorClass::ALL[self.colors.sample(&mut self.rng)];
        }
        (stamped, level_up)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Seed of the session RNG; replaying it reproduces the session.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn sand(&self) -> &SandGrid {
        &self.sand
    }

    pub fn piece(&self) -> &Tetromino {
        &self.piece
    }

    pub fn sprite_sheet(&self) -> &SpriteSheet {
        &self.sheet
    }

    pub fn next_shape(&self) -> ShapeKind {
        self.next_shape
    }

    pub fn next_color(&self) -> ColorClass {
        self.next_color
    }

    pub fn drop_count(&self) -> u32 {
        self.drop_count
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The current piece already overlaps sand where it stands. Checked right
    /// after a respawn, this means the stack has reached the spawn point.
    pub fn is_topped_out(&self) -> bool {
        let (x, y) = self.piece.position();
        collision::would_collide_vertically(&self.piece, x, y, &self.sand)
    }

    /// Locks remaining until the next speed-up.
    pub fn locks_to_next_level(&self) -> u32 {
        let per = self.config.locks_per_level;
        per - self.drop_count % per
    }
}

fn random_shape<R: Rng + ?Sized>(rng: &mut R) -> ShapeKind {
    ShapeKind::ALL[rng.random_range(0..ShapeKind::ALL.len())]
}
