//! Mock input line.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    HardwareError, Result,
    traits::{InputLine, SignalLevel},
};

#[derive(Debug)]
struct InputState {
    level: SignalLevel,
    connected: bool,
}

/// Mock input line for testing and development.
///
/// The level is set through the paired [`MockInputLineHandle`]; every
/// [`read`](InputLine::read) returns whatever was set last.
///
/// # Examples
///
/// ```
/// use lockbox_hardware::mock::MockInputLine;
/// use lockbox_hardware::traits::{InputLine, SignalLevel};
///
/// let (mut button, handle) = MockInputLine::new("button", SignalLevel::High);
/// assert_eq!(button.read().unwrap(), SignalLevel::High);
///
/// handle.set_level(SignalLevel::Low);
/// assert_eq!(button.read().unwrap(), SignalLevel::Low);
/// ```
#[derive(Debug)]
pub struct MockInputLine {
    name: String,
    state: Arc<Mutex<InputState>>,
}

impl MockInputLine {
    /// Create a new mock input line resting at `initial`.
    pub fn new(name: impl Into<String>, initial: SignalLevel) -> (Self, MockInputLineHandle) {
        let state = Arc::new(Mutex::new(InputState {
            level: initial,
            connected: true,
        }));
        let line = Self {
            name: name.into(),
            state: Arc::clone(&state),
        };
        (line, MockInputLineHandle { state })
    }
}

impl InputLine for MockInputLine {
    fn read(&mut self) -> Result<SignalLevel> {
        let state = lock(&self.state);
        if !state.connected {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        Ok(state.level)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for driving a mock input line.
#[derive(Debug, Clone)]
pub struct MockInputLineHandle {
    state: Arc<Mutex<InputState>>,
}

impl MockInputLineHandle {
    /// Set the level returned by subsequent reads.
    pub fn set_level(&self, level: SignalLevel) {
        lock(&self.state).level = level;
    }

    /// Make subsequent reads fail as if the line was released.
    pub fn disconnect(&self) {
        lock(&self.state).connected = false;
    }
}

fn lock(state: &Mutex<InputState>) -> MutexGuard<'_, InputState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
