//! Debounced persistence of live-scene edits.
//!
//! Every mutation of the live scene restarts a trailing timer. When the page has been quiet
//! for the configured period, `poll` reports that the whole scene should be serialized.
//! Mutations that happen while a scene is being loaded are ignored, so a programmatic load
//! never schedules a write-back of the data it just read.

use crate::timer::{Debounce, Instant};
use std::time::Duration;

/// Default quiet period before a save.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Trailing-debounce save scheduler with a load guard.
#[derive(Debug, Clone)]
pub struct PersistenceScheduler {
    timer: Debounce,
    loading: bool,
    serializations: u64,
    ignored: u64,
}

impl Default for PersistenceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_DEBOUNCE)
    }
}

impl PersistenceScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            timer: Debounce::new(delay),
            loading: false,
            serializations: 0,
            ignored: 0,
        }
    }

    /// Enter a programmatic load. Mutations are ignored until [`Self::end_load`].
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    pub fn end_load(&mut self) {
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Record a mutation of the live scene. Returns whether it armed the timer.
    pub fn notify(&mut self, now: Instant) -> bool {
        if self.loading {
            self.ignored += 1;
            return false;
        }
        self.timer.trigger(now);
        true
    }

    /// Whether a save is waiting for its quiet period.
    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Returns `true` exactly once when the quiet period has elapsed; the caller then
    /// serializes the live scene.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.timer.poll(now) {
            self.serializations += 1;
            true
        } else {
            false
        }
    }

    /// Finalize a pending save right away. Returns `true` when the caller must write now.
    pub fn take_pending(&mut self) -> bool {
        if self.timer.take_pending() {
            self.serializations += 1;
            true
        } else {
            false
        }
    }

    /// Drop a pending save without writing.
    pub fn cancel(&mut self) -> bool {
        self.timer.cancel()
    }

    /// Number of saves that fired, by timer or by `take_pending`.
    pub fn serializations(&self) -> u64 {
        self.serializations
    }

    /// Number of mutations dropped by the load guard.
    pub fn ignored(&self) -> u64 {
        self.ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_burst_coalesces_into_one_save() {
        let mut scheduler = PersistenceScheduler::default();
        let t0 = Instant::now();

        // Five edits, each 400 ms apart
        for i in 0..5 {
            scheduler.notify(t0 + ms(i * 400));
            assert!(!scheduler.poll(t0 + ms(i * 400 + 399)));
        }
        let last = t0 + ms(1600);

        assert!(!scheduler.poll(last + ms(999)));
        assert!(scheduler.poll(last + ms(1000)));
        assert!(!scheduler.poll(last + ms(5000)));
        assert_eq!(scheduler.serializations(), 1);
    }

    #[test]
    fn test_load_guard_ignores_mutations() {
        let mut scheduler = PersistenceScheduler::default();
        let t0 = Instant::now();

        scheduler.begin_load();
        for _ in 0..10 {
            assert!(!scheduler.notify(t0));
        }
        scheduler.end_load();

        assert!(!scheduler.is_pending());
        assert!(!scheduler.poll(t0 + ms(10_000)));
        assert_eq!(scheduler.serializations(), 0);
        assert_eq!(scheduler.ignored(), 10);
    }

    #[test]
    fn test_take_pending_finalizes_synchronously() {
        let mut scheduler = PersistenceScheduler::default();
        let t0 = Instant::now();

        assert!(!scheduler.take_pending());
        scheduler.notify(t0);
        assert!(scheduler.take_pending());
        // Timer is consumed: it does not fire a second time later
        assert!(!scheduler.poll(t0 + ms(2000)));
        assert_eq!(scheduler.serializations(), 1);
    }

    #[test]
    fn test_cancel_drops_pending_save() {
        let mut scheduler = PersistenceScheduler::new(ms(50));
        let t0 = Instant::now();
        scheduler.notify(t0);
        assert!(scheduler.cancel());
        assert!(!scheduler.poll(t0 + ms(100)));
        assert_eq!(scheduler.serializations(), 0);
    }
}
