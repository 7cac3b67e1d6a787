//! Push button debouncer.
//!
//! Turns a noisy sampled signal into discrete [`ToggleEvent`]s. An event is
//! emitted on the inactive-to-active edge (HIGH→LOW for an active-low
//! button) unless it falls within the debounce window of the previously
//! *accepted* edge. Suppressed edges do not extend the window.
//!
//! The first sample only seeds the edge detector, so a button that is held
//! while the device boots does not toggle the lock.
//!
//! # Examples
//!
//! ```
//! use lockbox_hardware::debounce::ButtonDebouncer;
//! use lockbox_hardware::traits::{Polarity, SignalLevel};
//! use std::time::{Duration, Instant};
//!
//! let mut button = ButtonDebouncer::new(Polarity::ActiveLow, Duration::from_millis(200));
//! let t0 = Instant::now();
//!
//! assert!(button.poll(SignalLevel::High, t0).is_none());
//! assert!(button.poll(SignalLevel::Low, t0 + Duration::from_millis(10)).is_some());
//! ```

use std::time::{Duration, Instant};

use crate::traits::{Polarity, SignalLevel};

/// One accepted button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleEvent {
    pub at: Instant,
}

/// Edge detector with a minimum spacing between accepted edges.
#[derive(Debug, Clone)]
pub struct ButtonDebouncer {
    polarity: Polarity,
    debounce: Duration,
    last_level: Option<SignalLevel>,
    last_accepted: Option<Instant>,
}

impl ButtonDebouncer {
    pub fn new(polarity: Polarity, debounce: Duration) -> Self {
        Self {
            polarity,
            debounce,
            last_level: None,
            last_accepted: None,
        }
    }

    /// Feed one raw sample taken at `now`.
    ///
    /// Returns `Some` exactly when an accepted press edge was detected.
    pub fn poll(&mut self, raw: SignalLevel, now: Instant) -> Option<ToggleEvent> {
        let previous = self.last_level.replace(raw);
        let was_active = self.polarity.is_active(previous?);
        let is_active = self.polarity.is_active(raw);
        if was_active || !is_active {
            return None;
        }

        if let Some(last) = self.last_accepted
            && now.saturating_duration_since(last) < self.debounce
        {
            tracing::trace!("Suppressed button edge inside debounce window");
            return None;
        }

        self.last_accepted = Some(now);
        Some(ToggleEvent { at: now })
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(200);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Press (falling edge) at `at_ms`, release 5ms later.
    fn press(button: &mut ButtonDebouncer, t0: Instant, at_ms: u64) -> Option<ToggleEvent> {
        let event = button.poll(SignalLevel::Low, t0 + ms(at_ms));
        assert!(button.poll(SignalLevel::High, t0 + ms(at_ms + 5)).is_none());
        event
    }

    fn idle_button(t0: Instant) -> ButtonDebouncer {
        let mut button = ButtonDebouncer::new(Polarity::ActiveLow, DEBOUNCE);
        assert!(button.poll(SignalLevel::High, t0).is_none());
        button
    }

    #[test]
    fn test_first_sample_only_seeds() {
        let t0 = Instant::now();
        let mut button = ButtonDebouncer::new(Polarity::ActiveLow, DEBOUNCE);
        // Held at boot: no event.
        assert!(button.poll(SignalLevel::Low, t0).is_none());
        assert!(button.poll(SignalLevel::Low, t0 + ms(10)).is_none());
    }

    #[test]
    fn test_edges_closer_than_debounce_produce_one_event() {
        let t0 = Instant::now();
        let mut button = idle_button(t0);

        assert!(press(&mut button, t0, 10).is_some());
        assert!(press(&mut button, t0, 10 + 150).is_none());
    }

    #[test]
    fn test_edges_further_than_debounce_produce_two_events() {
        let t0 = Instant::now();
        let mut button = idle_button(t0);

        assert!(press(&mut button, t0, 10).is_some());
        assert!(press(&mut button, t0, 10 + 250).is_some());
    }

    #[test]
    fn test_suppressed_edge_does_not_extend_window() {
        let t0 = Instant::now();
        let mut button = idle_button(t0);

        assert!(press(&mut button, t0, 0).is_some());
        assert!(press(&mut button, t0, 150).is_none());
        // 210ms after the accepted edge, 60ms after the suppressed one.
        assert!(press(&mut button, t0, 210).is_some());
    }

    #[test]
    fn test_holding_does_not_repeat() {
        let t0 = Instant::now();
        let mut button = idle_button(t0);

        assert!(button.poll(SignalLevel::Low, t0 + ms(10)).is_some());
        for i in 1..100 {
            assert!(button.poll(SignalLevel::Low, t0 + ms(10 + i * 10)).is_none());
        }
    }

    #[test]
    fn test_active_high_polarity() {
        let t0 = Instant::now();
        let mut button = ButtonDebouncer::new(Polarity::ActiveHigh, DEBOUNCE);
        assert!(button.poll(SignalLevel::Low, t0).is_none());
        // Falling edge is a release for an active-high button.
        assert!(button.poll(SignalLevel::High, t0 + ms(10)).is_some());
        assert!(button.poll(SignalLevel::Low, t0 + ms(400)).is_none());
    }
}
