//! matrix-sandtris: falling-sand tetromino game on an emulated 32x64 LED matrix.

use anyhow::{Context, Result};
use clap::Parser;
use matrix_sandtris::app::App;
use matrix_sandtris::config::Config;
use matrix_sandtris::theme::{Palette, Theme};
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let config = build_config(&args)?;
    let theme = match Theme::load(args.theme.as_deref(), args.palette) {
        Ok(theme) => theme,
        Err(e) => {
            log::warn!("theme not loaded, using defaults: {e}");
            Theme::default_with(args.palette)
        }
    };
    log::info!("matrix-sandtris {} starting", env!("CARGO_PKG_VERSION"));

    let mut app = App::new(config, theme, args.no_effects)?;
    app.run()?;
    Ok(())
}

/// Logs go to `--log-file` since the terminal belongs to the game. Without a
/// file nothing is logged unless RUST_LOG asks for it.
fn init_logging(path: Option<&std::path::Path>) -> Result<()> {
    let mut builder = match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            let mut b = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
            b.target(env_logger::Target::Pipe(Box::new(file)));
            b
        }
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")),
    };
    builder.init();
    Ok(())
}

/// Defaults, then the JSON file, then command-line overrides.
fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(rate) = args.tick_rate {
        config.tick_rate = rate;
    }
    if let Some(rate) = args.fall_rate {
        config.initial_fall_rate = rate;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate().context("invalid configuration")?;
    log::debug!("config: {config:?}");
    Ok(config)
}

/// Falling-sand tetromino game on an emulated LED matrix.
#[derive(Debug, Parser)]
#[command(
    name = "matrix-sandtris",
    version,
    about = "Falling-sand tetrominoes on an emulated 32x64 LED matrix. Locked pieces crumble into sand.",
    long_about = "matrix-sandtris emulates a small LED matrix in the terminal.\n\n\
        Tilt the board to steer the falling piece and tap to rotate it. When a piece lands it \
        turns into coloured sand that settles under gravity. The game ends when the sand \
        reaches the spawn point.\n\n\
        CONTROLS:\n  Left/Right h/l a/d  Tilt      Up k w Space Enter  Rotate\n  P  Pause    R  Restart    Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// JSON config file; missing keys keep their defaults.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logic ticks per second.
    #[arg(long, value_name = "HZ")]
    pub tick_rate: Option<f64>,

    /// Starting fall rate in seconds per pixel.
    #[arg(long, value_name = "SECS")]
    pub fall_rate: Option<f32>,

    /// RNG seed; the same seed and inputs replay the same game.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs here (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Disable the game-over fade.
    #[arg(long)]
    pub no_effects: bool,
}
