//! Event types for the pulse-monitor capture pipeline.
//!
//! Backends emit [`RawInput`] records straight off the OS callbacks; the
//! per-monitor ingest thread enriches them into [`InputEvent`]s (key hold
//! durations, pointer movement derivatives) before they enter the buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key identifier released by the capture backend when pressing the
/// session-wide panic key. Releasing it stops the whole session.
pub const PANIC_KEY: &str = "esc";

/// A raw event as delivered by a capture backend, before enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInput {
    /// Timestamp when the OS callback fired
    pub timestamp: DateTime<Utc>,
    pub kind: RawInputKind,
}

/// The low-level action behind a [`RawInput`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RawInputKind {
    KeyDown { key: String },
    KeyUp { key: String },
    PointerMove { x: f64, y: f64 },
    PointerButton { x: f64, y: f64, button: PointerButton, pressed: bool },
    PointerScroll { x: f64, y: f64, dx: f64, dy: f64 },
}

impl RawInput {
    /// Create a raw event stamped with the current time.
    pub fn now(kind: RawInputKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Whether a key event is the press or the release half of a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyPhase {
    Down,
    Up,
}

/// A single key press or release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
    /// Canonical key identifier ("a", "space", "backspace", ...)
    pub key: String,
    pub phase: KeyPhase,
    /// Hold duration in seconds. Populated on `Up` when the matching
    /// unmatched `Down` is found in the buffer; 0 otherwise.
    pub held_secs: f64,
}

impl KeyEvent {
    pub fn is_down(&self) -> bool {
        self.phase == KeyPhase::Down
    }

    /// Canonical name or the literal backspace control character.
    pub fn is_backspace(&self) -> bool {
        self.key == "backspace" || self.key == "\u{8}"
    }

    /// Canonical name or the literal space character.
    pub fn is_space(&self) -> bool {
        self.key == "space" || self.key == " "
    }
}

/// Pointer button classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// A pointer movement sample enriched with derivatives relative to the
/// previous move of the same capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerMoveEvent {
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    /// Distance from the previous move sample; 0 for the first sample.
    pub distance: f64,
    /// Distance over elapsed time; 0 for the first sample or zero elapsed.
    pub speed: f64,
}

/// A pointer button press or release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerClickEvent {
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub button: PointerButton,
    pub pressed: bool,
}

/// A scroll step with wheel deltas in notches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerScrollEvent {
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

/// Unified enriched event type stored in the event buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InputEvent {
    Key(KeyEvent),
    PointerMove(PointerMoveEvent),
    PointerClick(PointerClickEvent),
    PointerScroll(PointerScrollEvent),
}

impl InputEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            InputEvent::Key(e) => e.timestamp,
            InputEvent::PointerMove(e) => e.timestamp,
            InputEvent::PointerClick(e) => e.timestamp,
            InputEvent::PointerScroll(e) => e.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, phase: KeyPhase) -> KeyEvent {
        KeyEvent {
            timestamp: Utc::now(),
            key: name.to_string(),
            phase,
            held_secs: 0.0,
        }
    }

    #[test]
    fn test_backspace_classification() {
        assert!(key("backspace", KeyPhase::Down).is_backspace());
        assert!(key("\u{8}", KeyPhase::Down).is_backspace());
        assert!(!key("b", KeyPhase::Down).is_backspace());
    }

    #[test]
    fn test_space_classification() {
        assert!(key("space", KeyPhase::Down).is_space());
        assert!(key(" ", KeyPhase::Down).is_space());
        assert!(!key("s", KeyPhase::Down).is_space());
    }

    #[test]
    fn test_event_timestamp_accessor() {
        let ts = Utc::now();
        let event = InputEvent::PointerScroll(PointerScrollEvent {
            timestamp: ts,
            x: 1.0,
            y: 2.0,
            dx: 0.0,
            dy: -1.0,
        });
        assert_eq!(event.timestamp(), ts);
    }
}
