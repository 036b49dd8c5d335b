//! Pointer and keyboard events delivered by the host.

use crate::timer::Instant;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer event in page-local surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up { position: Point },
}

impl PointerEvent {
    /// Position carried by the event.
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position }
            | PointerEvent::Move { position }
            | PointerEvent::Up { position } => *position,
        }
    }
}

/// Keyboard event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    /// Printable text typed by the user.
    Text(String),
    Backspace,
    Enter,
    Delete,
    Escape,
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(500);
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Detects double clicks from a stream of pointer-down events.
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    last_click: Option<(Instant, Point)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pointer-down and report whether it completes a double click.
    pub fn register(&mut self, position: Point, now: Instant) -> bool {
        if let Some((time, last_pos)) = self.last_click {
            let elapsed = now.saturating_duration_since(time);
            if elapsed < DOUBLE_CLICK_TIME && last_pos.distance(position) < DOUBLE_CLICK_DISTANCE {
                // Reset so a triple click is not reported as a second double click
                self.last_click = None;
                return true;
            }
        }
        self.last_click = Some((now, position));
        false
    }

    pub fn reset(&mut self) {
        self.last_click = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_click_detection() {
        let mut clicks = ClickTracker::new();
        let t0 = Instant::now();
        let pos = Point::new(100.0, 100.0);

        assert!(!clicks.register(pos, t0));
        assert!(clicks.register(pos, t0 + Duration::from_millis(200)));
        // Third click starts a new sequence
        assert!(!clicks.register(pos, t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_double_click_too_far() {
        let mut clicks = ClickTracker::new();
        let t0 = Instant::now();

        assert!(!clicks.register(Point::new(100.0, 100.0), t0));
        assert!(!clicks.register(Point::new(200.0, 200.0), t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_double_click_too_slow() {
        let mut clicks = ClickTracker::new();
        let t0 = Instant::now();
        let pos = Point::new(10.0, 10.0);

        assert!(!clicks.register(pos, t0));
        assert!(!clicks.register(pos, t0 + Duration::from_millis(900)));
    }

    #[test]
    fn test_event_position() {
        let event = PointerEvent::Move { position: Point::new(3.0, 4.0) };
        assert_eq!(event.position(), Point::new(3.0, 4.0));
    }
}
