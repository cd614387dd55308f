//! Matrix Sandtris - falling-sand tetrominoes for small LED matrices
//!
//! Core modules:
//! - `sand`: Sand grid and its falling-sand automaton
//! - `tetromino`: The active piece, its gravity and rotation state
//! - `collision`: Floor/sand/wall checks and rotation with wall kicks
//! - `game`: Fixed-tick controller tying input, piece and sand together
//! - `input`: Per-tick tilt/rotate record and the keyboard stand-in
//! - `ui`, `app`, `theme`: Terminal matrix emulator

pub mod app;
pub mod collision;
pub mod config;
pub mod game;
pub mod input;
pub mod paint;
pub mod sand;
pub mod shapes;
pub mod tetromino;
pub mod theme;
pub mod ui;

pub use config::{Config, ConfigError};
pub use game::{Game, LineClear, NoLineClear, TickReport};
pub use input::{InputRecord, InputSource, Tilt};
pub use sand::SandGrid;
pub use tetromino::Tetromino;
pub use theme::{Palette, Theme};
