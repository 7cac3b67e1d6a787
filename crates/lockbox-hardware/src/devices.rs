//! Enum wrappers for line dispatch.
//!
//! The controller is generic over its lines, which keeps the hot path free
//! of dynamic dispatch. The binary still has to pick a concrete backend at
//! runtime, so these enums provide concrete type dispatch over every line
//! implementation the build supports.
//!
//! # Examples
//!
//! ```
//! use lockbox_hardware::devices::AnyOutputLine;
//! use lockbox_hardware::mock::MockOutputLine;
//! use lockbox_hardware::traits::{OutputLine, SignalLevel};
//!
//! let (relay, handle) = MockOutputLine::new("relay");
//! let mut relay = AnyOutputLine::Mock(relay);
//!
//! relay.write(SignalLevel::High).unwrap();
//! assert_eq!(handle.level(), Some(SignalLevel::High));
//! ```

use crate::Result;
use crate::mock::{MockInputLine, MockOutputLine};
use crate::traits::{InputLine, OutputLine, SignalLevel};

/// Enum wrapper for output line dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyOutputLine {
    /// Simulated line for development and testing.
    Mock(MockOutputLine),
}

impl OutputLine for AnyOutputLine {
    fn write(&mut self, level: SignalLevel) -> Result<()> {
        match self {
            Self::Mock(line) => line.write(level),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Mock(line) => line.name(),
        }
    }
}

/// Enum wrapper for input line dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyInputLine {
    /// Simulated line for development and testing.
    Mock(MockInputLine),
}

impl InputLine for AnyInputLine {
    fn read(&mut self) -> Result<SignalLevel> {
        match self {
            Self::Mock(line) => line.read(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Mock(line) => line.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_dispatch() {
        let (line, handle) = MockInputLine::new("button", SignalLevel::High);
        let mut line = AnyInputLine::Mock(line);
        assert_eq!(line.name(), "button");

        handle.set_level(SignalLevel::Low);
        assert_eq!(line.read().unwrap(), SignalLevel::Low);
    }

    #[test]
    fn test_output_dispatch() {
        let (line, handle) = MockOutputLine::new("led");
        let mut line = AnyOutputLine::Mock(line);
        assert_eq!(line.name(), "led");

        line.write(SignalLevel::Low).unwrap();
        assert_eq!(handle.level(), Some(SignalLevel::Low));
    }
}
