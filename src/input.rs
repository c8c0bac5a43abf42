//! Key bindings, held-key tracking and the intent handed to the player.

use crate::physics::Vec2;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

/// Gamepad axis readings below this magnitude count as centred.
pub const GAMEPAD_DEAD_ZONE: f32 = 0.2;

/// Without release events a press counts as held this long (key repeat refreshes it).
const HOLD_WINDOW: Duration = Duration::from_millis(160);

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Left,
    Right,
    Down,
    /// Counter-clockwise.
    RotatePositive,
    /// Clockwise.
    RotateNegative,
    Pause,
    Confirm,
    Quit,
    None,
}

/// Map key event to game action: arrows or WASD-style letters, Z/X or `,`/`.` to rotate.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Left | KeyCode::Char('a' | 'A') => Action::Left,
        KeyCode::Right | KeyCode::Char('d' | 'D') => Action::Right,
        KeyCode::Down | KeyCode::Char('s' | 'S') => Action::Down,
        KeyCode::Char(' ' | 'z' | 'Z' | ',') => Action::RotatePositive,
        KeyCode::Char('x' | 'X' | '.') => Action::RotateNegative,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Enter => Action::Confirm,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        _ => Action::None,
    }
}

/// Desired motion: direction in [-1, 1]², rotation in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Intent {
    pub direction: Vec2,
    pub rotation: f32,
}

/// Raw gamepad axes: left stick x, left stick y (down positive), right stick x.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PadAxes {
    pub axes: [f32; 3],
}

impl PadAxes {
    /// Zero every axis whose magnitude is under `threshold`.
    pub fn dead_zoned(self, threshold: f32) -> Self {
        Self {
            axes: self.axes.map(|a| if a.abs() < threshold { 0.0 } else { a }),
        }
    }
}

/// Everything the input collaborators report for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Controls {
    pub keys: Intent,
    pub pad: Option<PadAxes>,
}

impl Controls {
    /// Merge keyboard and gamepad into a single clamped intent.
    ///
    /// The stick can only push down, never up.
    pub fn intent(&self) -> Intent {
        let mut x = self.keys.direction.x;
        let mut y = self.keys.direction.y;
        let mut rotation = self.keys.rotation;
        if let Some(pad) = self.pad {
            let [ax, ay, ar] = pad.dead_zoned(GAMEPAD_DEAD_ZONE).axes;
            x += ax;
            y -= ay.max(0.0);
            rotation -= ar;
        }
        Intent {
            direction: Vec2::new(x.clamp(-1.0, 1.0), y.clamp(-1.0, 0.0)),
            rotation: rotation.clamp(-1.0, 1.0),
        }
    }
}

/// Which movement keys are currently held.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    left: Option<Instant>,
    right: Option<Instant>,
    down: Option<Instant>,
    rotate_positive: Option<Instant>,
    rotate_negative: Option<Instant>,
    /// Set once the terminal has sent a release event; holds then last until released.
    reports_release: bool,
}

impl KeyState {
    fn slot(&mut self, action: Action) -> Option<&mut Option<Instant>> {
        match action {
            Action::Left => Some(&mut self.left),
            Action::Right => Some(&mut self.right),
            Action::Down => Some(&mut self.down),
            Action::RotatePositive => Some(&mut self.rotate_positive),
            Action::RotateNegative => Some(&mut self.rotate_negative),
            _ => None,
        }
    }

    /// Track a key event; returns the action for presses (not repeats or releases).
    pub fn handle(&mut self, key: KeyEvent, now: Instant) -> Option<Action> {
        let action = key_to_action(key);
        match key.kind {
            KeyEventKind::Release => {
                self.reports_release = true;
                if let Some(slot) = self.slot(action) {
                    *slot = None;
                }
                None
            }
            KeyEventKind::Repeat => {
                if let Some(slot) = self.slot(action) {
                    *slot = Some(now);
                }
                None
            }
            KeyEventKind::Press => {
                if let Some(slot) = self.slot(action) {
                    *slot = Some(now);
                }
                Some(action)
            }
        }
    }

    fn held(&self, since: Option<Instant>, now: Instant) -> bool {
        since.is_some_and(|t| self.reports_release || now.saturating_duration_since(t) < HOLD_WINDOW)
    }

    pub fn clear(&mut self) {
        let reports_release = self.reports_release;
        *self = Self {
            reports_release,
            ..Self::default()
        };
    }

    /// Keyboard intent at `now`.
    pub fn intent(&self, now: Instant) -> Intent {
        let axis = |neg: Option<Instant>, pos: Option<Instant>| {
            f32::from(u8::from(self.held(pos, now))) - f32::from(u8::from(self.held(neg, now)))
        };
        Intent {
            direction: Vec2::new(axis(self.left, self.right), -f32::from(u8::from(self.held(self.down, now)))),
            rotation: axis(self.rotate_negative, self.rotate_positive),
        }
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

    #[test]
    fn test_bindings() {
        let press = |c| key_to_action(key(c, KeyEventKind::Press));
        assert_eq!(press(KeyCode::Left), Action::Left);
        assert_eq!(press(KeyCode::Char('d')), Action::Right);
        assert_eq!(press(KeyCode::Char('S')), Action::Down);
        assert_eq!(press(KeyCode::Char(' ')), Action::RotatePositive);
        assert_eq!(press(KeyCode::Char('.')), Action::RotateNegative);
        assert_eq!(press(KeyCode::Enter), Action::Confirm);
        assert_eq!(press(KeyCode::Char('p')), Action::Pause);
        assert_eq!(press(KeyCode::Esc), Action::Quit);
    }

    #[test]
    fn test_dead_zone_zeroes_small_axes() {
        let pad = PadAxes {
            axes: [0.1, -0.19, 0.5],
        };
        assert_eq!(pad.dead_zoned(GAMEPAD_DEAD_ZONE).axes, [0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_intent_combines_and_clamps() {
        let controls = Controls {
            keys: Intent {
                direction: Vec2::new(1.0, -1.0),
                rotation: 1.0,
            },
            pad: Some(PadAxes {
                axes: [0.8, 0.9, -0.6],
            }),
        };
        let intent = controls.intent();
        assert_eq!(intent.direction, Vec2::new(1.0, -1.0));
        assert_eq!(intent.rotation, 1.0);
    }

    #[test]
    fn test_stick_cannot_push_up() {
        let controls = Controls {
            keys: Intent::default(),
            pad: Some(PadAxes {
                axes: [0.0, -1.0, 0.0],
            }),
        };
        assert_eq!(controls.intent().direction.y, 0.0);
    }

    #[test]
    fn test_hold_expires_without_release_events() {
        let mut keys = KeyState::default();
        let t0 = Instant::now();
        keys.handle(key(KeyCode::Left, KeyEventKind::Press), t0);
        assert_eq!(keys.intent(t0).direction.x, -1.0);
        assert_eq!(keys.intent(t0 + Duration::from_millis(500)).direction.x, 0.0);
    }

    #[test]
    fn test_release_ends_hold() {
        let mut keys = KeyState::default();
        let t0 = Instant::now();
        keys.handle(key(KeyCode::Char('x'), KeyEventKind::Press), t0);
        keys.handle(key(KeyCode::Char('x'), KeyEventKind::Release), t0);
        keys.handle(key(KeyCode::Down, KeyEventKind::Press), t0);
        let later = t0 + Duration::from_secs(2);
        let intent = keys.intent(later);
        assert_eq!(intent.rotation, 0.0);
        assert_eq!(intent.direction.y, -1.0);
    }
}
