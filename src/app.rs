//! App: terminal init, fixed-rate main loop, tick and key handling.

use crate::config::Config;
use crate::game::Game;
use crate::input::{self, Action, KeyboardTilt};
use crate::theme::Theme;
use crate::ui::{self, Effects};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

pub struct App {
    config: Config,
    theme: Theme,
    game: Game,
    input: KeyboardTilt,
    screen: Screen,
    paused: bool,
    no_effects: bool,
    effects: Effects,
    tick_period: Duration,
    next_tick: Instant,
}

impl App {
    pub fn new(config: Config, theme: Theme, no_effects: bool) -> Result<Self> {
        let game = Game::new(config.clone())?;
        let input = KeyboardTilt::new(config.tilt_threshold_deg);
        let tick_period = config.tick_duration();
        Ok(Self {
            config,
            theme,
            game,
            input,
            screen: Screen::Playing,
            paused: false,
            no_effects,
            effects: Effects::default(),
            tick_period,
            next_tick: Instant::now() + tick_period,
        })
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    fn restart(&mut self) -> Result<()> {
        self.game = Game::new(self.config.clone())?;
        self.input.clear();
        self.effects.reset();
        self.screen = Screen::Playing;
        self.paused = false;
        self.next_tick = Instant::now() + self.tick_period;
        log::info!("restart: seed={}", self.game.seed());
        Ok(())
    }

    /// Returns true when the player asked to quit.
    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Result<bool> {
        let action = self.input.handle_key(key, now);
        if key.kind != KeyEventKind::Press {
            return Ok(false);
        }
        match (self.screen, action) {
            (_, Action::Quit) => return Ok(true),
            (_, Action::Restart) => self.restart()?,
            (Screen::Playing, Action::Pause) => {
                self.paused = !self.paused;
                self.input.clear();
                log::debug!("paused={}", self.paused);
            }
            _ => {}
        }
        Ok(false)
    }

    /// One logic tick: sample input, step the game, detect top-out.
    fn tick(&mut self) {
        if self.screen != Screen::Playing || self.paused {
            return;
        }
        let record = input::read_or_neutral(&mut self.input);
        let report = self.game.tick(record);
        if report.locked && self.game.is_topped_out() {
            log::info!(
                "game over: {} drops, level {}, seed={}",
                self.game.drop_count(),
                self.game.level(),
                self.game.seed()
            );
            self.screen = Screen::GameOver;
            self.input.clear();
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events let a held tilt end exactly when the key comes up.
        if let Err(e) = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        ) {
            log::debug!("keyboard enhancement unavailable: {e}");
        }

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        let result = self.run_loop(&mut terminal);

        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.next_tick = Instant::now() + self.tick_period;
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                ui::draw(
                    f,
                    self.screen,
                    &self.game,
                    &self.theme,
                    self.paused,
                    &mut self.effects,
                    self.no_effects,
                    now,
                );
            })?;

            let timeout = self.next_tick.saturating_duration_since(Instant::now());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key, Instant::now())? {
                            return Ok(());
                        }
                    }
                }
            }

            let now = Instant::now();
            if now < self.next_tick {
                continue;
            }
            self.tick();
            // Fixed rate without catch-up: a late tick pushes the schedule back.
            self.next_tick += self.tick_period;
            if self.next_tick <= now {
                log::trace!("tick overran by {:?}", now - self.next_tick);
                self.next_tick = now + self.tick_period;
            }
        }
    }
}
