//! Monotonic clock abstraction.
//!
//! The state machine, the debouncer and the control loop never call
//! `Instant::now()` themselves. They read an injected [`Clock`], which lets
//! tests step time forward without sleeping.
//!
//! ```
//! use lockbox_core::{Clock, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now() - start, Duration::from_secs(5));
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-independent system clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Clones share the same underlying instant, so a test can keep one handle
/// and advance the time seen by every component holding another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-cadence deadline tracker for polled loops.
///
/// [`IntervalTimer::due`] returns `true` at most once per interval and
/// restarts the interval from the instant it fired. Missed periods are not
/// caught up.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    interval: Duration,
    last: Instant,
}

impl IntervalTimer {
    /// Start a timer whose first period ends at `start + interval`.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last: start,
        }
    }

    pub fn due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) < self.interval {
            return false;
        }
        self.last = now;
        true
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_timer_fires_once_per_period() {
        let t0 = Instant::now();
        let mut timer = IntervalTimer::new(Duration::from_secs(30), t0);

        assert!(!timer.due(t0));
        assert!(!timer.due(t0 + Duration::from_secs(29)));
        assert!(timer.due(t0 + Duration::from_secs(30)));
        assert!(!timer.due(t0 + Duration::from_secs(31)));
        // Late tick restarts the period from when it fired.
        assert!(timer.due(t0 + Duration::from_secs(100)));
        assert!(!timer.due(t0 + Duration::from_secs(129)));
        assert!(timer.due(t0 + Duration::from_secs(130)));
    }

    #[test]
    fn test_manual_clock_is_frozen_until_advanced() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now() - t0, Duration::from_millis(250));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let t0 = other.now();

        clock.advance(Duration::from_secs(1));
        assert_eq!(other.now() - t0, Duration::from_secs(1));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
