//! Mock output line.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    HardwareError, Result,
    traits::{OutputLine, SignalLevel},
};

#[derive(Debug, Default)]
struct OutputState {
    level: Option<SignalLevel>,
    writes: Vec<SignalLevel>,
    failing: bool,
}

/// Mock output line for testing and development.
///
/// Records every write. The paired [`MockOutputLineHandle`] observes the
/// current level and can make subsequent writes fail.
///
/// # Examples
///
/// ```
/// use lockbox_hardware::mock::MockOutputLine;
/// use lockbox_hardware::traits::{OutputLine, SignalLevel};
///
/// let (mut relay, handle) = MockOutputLine::new("relay");
/// relay.write(SignalLevel::Low).unwrap();
///
/// assert_eq!(handle.level(), Some(SignalLevel::Low));
/// assert_eq!(handle.writes(), vec![SignalLevel::Low]);
/// ```
#[derive(Debug)]
pub struct MockOutputLine {
    name: String,
    state: Arc<Mutex<OutputState>>,
}

impl MockOutputLine {
    /// Create a new mock output line.
    ///
    /// Returns a tuple of (MockOutputLine, MockOutputLineHandle).
    pub fn new(name: impl Into<String>) -> (Self, MockOutputLineHandle) {
        let state = Arc::new(Mutex::new(OutputState::default()));
        let line = Self {
            name: name.into(),
            state: Arc::clone(&state),
        };
        (line, MockOutputLineHandle { state })
    }
}

impl OutputLine for MockOutputLine {
    fn write(&mut self, level: SignalLevel) -> Result<()> {
        let mut state = lock(&self.state);
        if state.failing {
            return Err(HardwareError::communication(format!(
                "{}: simulated driver fault",
                self.name
            )));
        }
        state.level = Some(level);
        state.writes.push(level);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for observing a mock output line.
#[derive(Debug, Clone)]
pub struct MockOutputLineHandle {
    state: Arc<Mutex<OutputState>>,
}

impl MockOutputLineHandle {
    /// Last level written, or `None` if the line was never driven.
    pub fn level(&self) -> Option<SignalLevel> {
        lock(&self.state).level
    }

    /// Every successful write, oldest first.
    pub fn writes(&self) -> Vec<SignalLevel> {
        lock(&self.state).writes.clone()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        lock(&self.state).failing = failing;
    }
}

fn lock(state: &Mutex<OutputState>) -> MutexGuard<'_, OutputState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line_is_undriven() {
        let (line, handle) = MockOutputLine::new("led");
        assert_eq!(line.name(), "led");
        assert_eq!(handle.level(), None);
        assert!(handle.writes().is_empty());
    }

    #[test]
    fn test_writes_are_recorded() {
        let (mut line, handle) = MockOutputLine::new("relay");
        line.write(SignalLevel::High).unwrap();
        line.write(SignalLevel::Low).unwrap();

        assert_eq!(handle.level(), Some(SignalLevel::Low));
        assert_eq!(handle.writes(), vec![SignalLevel::High, SignalLevel::Low]);
    }

    #[test]
    fn test_failing_write_keeps_previous_level() {
        let (mut line, handle) = MockOutputLine::new("relay");
        line.write(SignalLevel::High).unwrap();

        handle.set_failing(true);
        assert!(line.write(SignalLevel::Low).is_err());
        assert_eq!(handle.level(), Some(SignalLevel::High));

        handle.set_failing(false);
        line.write(SignalLevel::Low).unwrap();
        assert_eq!(handle.level(), Some(SignalLevel::Low));
    }
}
