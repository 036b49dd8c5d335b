//! Cancelable deferred timers for the single-threaded event loop.
//!
//! Nothing here sleeps or spawns. A timer is a deadline that the host advances by calling
//! `poll(now)` from its frame/tick callback, so every deferred action runs on the caller's
//! execution context, in deadline order.

use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;

#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;

/// Trailing-edge debounce: fires once `delay` after the most recent trigger.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    /// Create an idle debounce timer.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// The configured quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arm the timer. A pending deadline is replaced, not kept.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop the pending deadline, if any. Returns whether something was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether a deadline is armed.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// The armed deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire if the quiet period has elapsed. Returns `true` exactly once per armed deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Finalize a pending deadline immediately, as if it had elapsed.
    pub fn take_pending(&mut self) -> bool {
        self.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);

    #[test]
    fn test_idle_never_fires() {
        let mut timer = Debounce::new(DELAY);
        assert!(!timer.poll(Instant::now() + Duration::from_secs(10)));
    }

    #[test]
    fn test_fires_once_after_delay() {
        let mut timer = Debounce::new(DELAY);
        let t0 = Instant::now();
        timer.trigger(t0);

        assert!(!timer.poll(t0 + Duration::from_millis(999)));
        assert!(timer.poll(t0 + DELAY));
        assert!(!timer.poll(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_retrigger_restarts_quiet_period() {
        let mut timer = Debounce::new(DELAY);
        let t0 = Instant::now();
        timer.trigger(t0);
        timer.trigger(t0 + Duration::from_millis(800));

        assert!(!timer.poll(t0 + Duration::from_millis(1000)));
        assert!(timer.poll(t0 + Duration::from_millis(1800)));
    }

    #[test]
    fn test_cancel_and_take_pending() {
        let mut timer = Debounce::new(DELAY);
        let t0 = Instant::now();

        assert!(!timer.take_pending());
        timer.trigger(t0);
        assert!(timer.take_pending());
        assert!(!timer.is_pending());

        timer.trigger(t0);
        assert!(timer.cancel());
        assert!(!timer.poll(t0 + DELAY));
    }
}
