//! Relay driver and lock actuator.
//!
//! A [`Relay`] drives a single output line through its [`Polarity`]. The
//! [`LockActuator`] bundles the relay that energizes the solenoid with an
//! optional status indicator (typically the board LED) that mirrors it.
//!
//! There is no position sensor on the lock, so the actuator only knows what
//! it last commanded. A failed write is reported to the caller but does not
//! change what the actuator believes it commanded.

use tracing::{debug, warn};

use crate::Result;
use crate::traits::{OutputLine, Polarity};

/// Single output line driven through a polarity.
///
/// # Examples
///
/// ```
/// use lockbox_hardware::mock::MockOutputLine;
/// use lockbox_hardware::relay::Relay;
/// use lockbox_hardware::traits::{Polarity, SignalLevel};
///
/// let (line, handle) = MockOutputLine::new("relay");
/// let mut relay = Relay::new(line, Polarity::ActiveLow);
///
/// relay.set_active(true).unwrap();
/// assert_eq!(handle.level(), Some(SignalLevel::Low));
/// ```
#[derive(Debug)]
pub struct Relay<O: OutputLine> {
    line: O,
    polarity: Polarity,
    active: bool,
}

impl<O: OutputLine> Relay<O> {
    /// Wrap a line. The line is not driven until the first `set_active`.
    pub fn new(line: O, polarity: Polarity) -> Self {
        Self {
            line,
            polarity,
            active: false,
        }
    }

    /// Drive the line to its active or inactive level.
    ///
    /// # Errors
    ///
    /// Propagates the line's write error.
    pub fn set_active(&mut self, active: bool) -> Result<()> {
        self.active = active;
        let level = self.polarity.level_for(active);
        debug!(line = self.line.name(), ?level, active, "Driving line");
        self.line.write(level)
    }

    /// Last commanded state.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn name(&self) -> &str {
        self.line.name()
    }
}

/// Electromechanical lock actuator.
///
/// Construction drives the relay to its released state, so a freshly
/// started device always holds the box closed.
///
/// # Examples
///
/// ```
/// use lockbox_hardware::mock::MockOutputLine;
/// use lockbox_hardware::relay::{LockActuator, Relay};
/// use lockbox_hardware::traits::{Polarity, SignalLevel};
///
/// let (line, relay_handle) = MockOutputLine::new("relay");
/// let actuator = LockActuator::new(Relay::new(line, Polarity::ActiveLow), None);
///
/// assert!(!actuator.is_engaged());
/// assert_eq!(relay_handle.level(), Some(SignalLevel::High));
/// ```
#[derive(Debug)]
pub struct LockActuator<O: OutputLine> {
    relay: Relay<O>,
    indicator: Option<Relay<O>>,
}

impl<O: OutputLine> LockActuator<O> {
    pub fn new(relay: Relay<O>, indicator: Option<Relay<O>>) -> Self {
        let mut actuator = Self { relay, indicator };
        if let Err(e) = actuator.release() {
            warn!(error = %e, "Failed to release lock relay at startup");
        }
        actuator
    }

    /// Energize the solenoid (unlock).
    ///
    /// # Errors
    ///
    /// Returns the relay write error. Indicator failures are only logged.
    pub fn engage(&mut self) -> Result<()> {
        self.drive(true)
    }

    /// De-energize the solenoid (lock).
    ///
    /// # Errors
    ///
    /// Returns the relay write error. Indicator failures are only logged.
    pub fn release(&mut self) -> Result<()> {
        self.drive(false)
    }

    /// Whether the solenoid was last commanded to unlock.
    pub fn is_engaged(&self) -> bool {
        self.relay.is_active()
    }

    fn drive(&mut self, active: bool) -> Result<()> {
        let result = self.relay.set_active(active);
        if let Some(indicator) = self.indicator.as_mut()
            && let Err(e) = indicator.set_active(active)
        {
            warn!(line = indicator.name(), error = %e, "Indicator write failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockOutputLine;
    use crate::traits::SignalLevel;
    use rstest::rstest;

    #[rstest]
    #[case(Polarity::ActiveLow, SignalLevel::Low, SignalLevel::High)]
    #[case(Polarity::ActiveHigh, SignalLevel::High, SignalLevel::Low)]
    fn test_relay_polarity(
        #[case] polarity: Polarity,
        #[case] engaged: SignalLevel,
        #[case] released: SignalLevel,
    ) {
        let (line, handle) = MockOutputLine::new("relay");
        let mut actuator = LockActuator::new(Relay::new(line, polarity), None);
        assert_eq!(handle.level(), Some(released));

        actuator.engage().unwrap();
        assert_eq!(handle.level(), Some(engaged));
        assert!(actuator.is_engaged());

        actuator.release().unwrap();
        assert_eq!(handle.level(), Some(released));
        assert!(!actuator.is_engaged());
    }

    #[test]
    fn test_indicator_mirrors_relay() {
        let (relay_line, _relay) = MockOutputLine::new("relay");
        let (led_line, led) = MockOutputLine::new("led");
        let mut actuator = LockActuator::new(
            Relay::new(relay_line, Polarity::ActiveLow),
            Some(Relay::new(led_line, Polarity::ActiveLow)),
        );
        assert_eq!(led.level(), Some(SignalLevel::High));

        actuator.engage().unwrap();
        assert_eq!(led.level(), Some(SignalLevel::Low));
    }

    #[test]
    fn test_indicator_failure_does_not_fail_engage() {
        let (relay_line, relay) = MockOutputLine::new("relay");
        let (led_line, led) = MockOutputLine::new("led");
        let mut actuator = LockActuator::new(
            Relay::new(relay_line, Polarity::ActiveHigh),
            Some(Relay::new(led_line, Polarity::ActiveHigh)),
        );

        led.set_failing(true);
        assert!(actuator.engage().is_ok());
        assert_eq!(relay.level(), Some(SignalLevel::High));
    }

    #[test]
    fn test_relay_failure_is_reported_but_state_is_commanded() {
        let (relay_line, relay) = MockOutputLine::new("relay");
        let mut actuator = LockActuator::new(Relay::new(relay_line, Polarity::ActiveLow), None);

        relay.set_failing(true);
        assert!(actuator.engage().is_err());
        assert!(actuator.is_engaged());
    }
}
