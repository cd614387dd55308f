//! Input contract: a per-tick `{tilt, rotate_requested}` record, plus key bindings
//! and a keyboard stand-in for the accelerometer.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Angle reported while a tilt key is held, in degrees.
const KEY_TILT_ANGLE_DEG: f32 = 30.0;
/// Without key-release reporting a tilt lapses this long after the last press/repeat.
const KEY_TILT_HOLD_MS: u64 = 180;

/// Horizontal intent derived from the board tilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tilt {
    Left,
    #[default]
    None,
    Right,
}

impl Tilt {
    /// Map a signed tilt angle against symmetric thresholds. Negative is left.
    pub fn from_angle(angle_deg: f32, threshold_deg: f32) -> Self {
        let t = threshold_deg.abs();
        if angle_deg < -t {
            Self::Left
        } else if angle_deg > t {
            Self::Right
        } else {
            Self::None
        }
    }
}

/// Normalized input for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputRecord {
    pub tilt: Tilt,
    pub rotate_requested: bool,
}

impl InputRecord {
    pub const NEUTRAL: Self = Self {
        tilt: Tilt::None,
        rotate_requested: false,
    };
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input device disconnected")]
    Disconnected,
}

/// Anything that can produce one input record per tick.
pub trait InputSource {
    fn read(&mut self) -> Result<InputRecord, InputError>;
}

/// Read a record; device faults degrade to the neutral record.
pub fn read_or_neutral<S: InputSource + ?Sized>(source: &mut S) -> InputRecord {
    match source.read() {
        Ok(record) => record,
        Err(e) => {
            log::warn!("input degraded to neutral: {e}");
            InputRecord::NEUTRAL
        }
    }
}

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TiltLeft,
    TiltRight,
    Rotate,
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to action. Arrows and vim keys both work.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h' | 'a') => Action::TiltLeft,
        KeyCode::Right | KeyCode::Char('l' | 'd') => Action::TiltRight,
        KeyCode::Up | KeyCode::Char('k' | 'w' | ' ') | KeyCode::Enter => Action::Rotate,
        _ => Action::None,
    }
}

/// Keyboard stand-in for the accelerometer: held arrow keys become a tilt
/// angle, rotate presses become a one-shot tap.
#[derive(Debug, Clone)]
pub struct KeyboardTilt {
    angle_deg: f32,
    threshold_deg: f32,
    last_tilt_at: Option<Instant>,
    hold: Duration,
    rotate_pending: bool,
}

impl KeyboardTilt {
    pub fn new(threshold_deg: f32) -> Self {
        Self {
            angle_deg: 0.0,
            threshold_deg,
            last_tilt_at: None,
            hold: Duration::from_millis(KEY_TILT_HOLD_MS),
            rotate_pending: false,
        }
    }

    /// Feed one key event. Returns the mapped action so the caller can handle
    /// the non-gameplay ones (pause, quit, restart).
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        let action = key_to_action(key);
        match (action, key.kind) {
            (Action::TiltLeft | Action::TiltRight, KeyEventKind::Release) => {
                let releasing_left = action == Action::TiltLeft && self.angle_deg < 0.0;
                let releasing_right = action == Action::TiltRight && self.angle_deg > 0.0;
                if releasing_left || releasing_right {
                    self.level();
                }
            }
            (Action::TiltLeft, _) => {
                self.angle_deg = -KEY_TILT_ANGLE_DEG;
                self.last_tilt_at = Some(now);
            }
            (Action::TiltRight, _) => {
                self.angle_deg = KEY_TILT_ANGLE_DEG;
                self.last_tilt_at = Some(now);
            }
            (Action::Rotate, KeyEventKind::Press) => self.rotate_pending = true,
            _ => {}
        }
        action
    }

    /// Current record; consumes the pending rotate tap.
    pub fn sample(&mut self, now: Instant) -> InputRecord {
        if self
            .last_tilt_at
            .is_some_and(|t| now.saturating_duration_since(t) > self.hold)
        {
            self.level();
        }
        let record = InputRecord {
            tilt: Tilt::from_angle(self.angle_deg, self.threshold_deg),
            rotate_requested: self.rotate_pending,
        };
        self.rotate_pending = false;
        record
    }

    /// Drop any held tilt or pending tap.
    pub fn clear(&mut self) {
        self.level();
        self.rotate_pending = false;
    }

    fn level(&mut self) {
        self.angle_deg = 0.0;
        self.last_tilt_at = None;
    }
}

impl InputSource for KeyboardTilt {
    fn read(&mut self) -> Result<InputRecord, InputError> {
        Ok(self.sample(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    struct Broken;

    impl InputSource for Broken {
        fn read(&mut self) -> Result<InputRecord, InputError> {
            Err(InputError::Disconnected)
        }
    }

    #[test]
    fn test_tilt_thresholds_are_symmetric() {
        assert_eq!(Tilt::from_angle(-20.0, 15.0), Tilt::Left);
        assert_eq!(Tilt::from_angle(20.0, 15.0), Tilt::Right);
        assert_eq!(Tilt::from_angle(15.0, 15.0), Tilt::None);
        assert_eq!(Tilt::from_angle(-15.0, 15.0), Tilt::None);
        assert_eq!(Tilt::from_angle(3.0, -15.0), Tilt::None);
    }

    #[test]
    fn test_failed_read_is_neutral() {
        assert_eq!(read_or_neutral(&mut Broken), InputRecord::NEUTRAL);
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_to_action(key(KeyCode::Left, KeyEventKind::Press)), Action::TiltLeft);
        assert_eq!(key_to_action(key(KeyCode::Char('l'), KeyEventKind::Press)), Action::TiltRight);
        assert_eq!(key_to_action(key(KeyCode::Up, KeyEventKind::Press)), Action::Rotate);
        assert_eq!(key_to_action(key(KeyCode::Esc, KeyEventKind::Press)), Action::Quit);
        assert_eq!(key_to_action(key(KeyCode::Char('x'), KeyEventKind::Press)), Action::None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
    }

    #[test]
    fn test_held_key_tilts_until_release() {
        let now = Instant::now();
        let mut k = KeyboardTilt::new(15.0);
        k.handle_key(key(KeyCode::Left, KeyEventKind::Press), now);
        assert_eq!(k.sample(now).tilt, Tilt::Left);
        assert_eq!(k.sample(now).tilt, Tilt::Left);
        k.handle_key(key(KeyCode::Left, KeyEventKind::Release), now);
        assert_eq!(k.sample(now).tilt, Tilt::None);
    }

    #[test]
    fn test_tilt_lapses_without_release_events() {
        let now = Instant::now();
        let mut k = KeyboardTilt::new(15.0);
        k.handle_key(key(KeyCode::Right, KeyEventKind::Press), now);
        let later = now + Duration::from_millis(KEY_TILT_HOLD_MS + 50);
        assert_eq!(k.sample(later).tilt, Tilt::None);
    }

    #[test]
    fn test_rotate_is_one_shot() {
        let now = Instant::now();
        let mut k = KeyboardTilt::new(15.0);
        k.handle_key(key(KeyCode::Up, KeyEventKind::Press), now);
        assert!(k.sample(now).rotate_requested);
        assert!(!k.sample(now).rotate_requested);
    }

    #[test]
    fn test_stale_release_does_not_cancel_other_side() {
        let now = Instant::now();
        let mut k = KeyboardTilt::new(15.0);
        k.handle_key(key(KeyCode::Left, KeyEventKind::Press), now);
        k.handle_key(key(KeyCode::Right, KeyEventKind::Press), now);
        k.handle_key(key(KeyCode::Left, KeyEventKind::Release), now);
        assert_eq!(k.sample(now).tilt, Tilt::Right);
    }
}
