//! Hardware abstraction layer for the lockbox controller.
//!
//! This crate covers the physical side of the device: the relay that drives
//! the solenoid lock, the status indicator, and the push button. Raw line
//! access sits behind the [`OutputLine`] and [`InputLine`] traits so the
//! controller can run against simulated lines in tests and development.
//!
//! # Components
//!
//! - [`traits`]: signal levels, polarity, line traits
//! - [`relay`]: polarity-aware [`Relay`] and the [`LockActuator`]
//! - [`debounce`]: [`ButtonDebouncer`] turning raw samples into toggle events
//! - [`mock`]: simulated lines with observation handles
//! - [`devices`]: enum dispatch over line implementations
//!
//! # Example
//!
//! ```
//! use lockbox_hardware::mock::MockOutputLine;
//! use lockbox_hardware::{LockActuator, Polarity, Relay, SignalLevel};
//!
//! let (line, handle) = MockOutputLine::new("relay");
//! let mut actuator = LockActuator::new(Relay::new(line, Polarity::ActiveLow), None);
//!
//! actuator.engage().unwrap();
//! assert_eq!(handle.level(), Some(SignalLevel::Low));
//! ```
//!
//! [`OutputLine`]: traits::OutputLine
//! [`InputLine`]: traits::InputLine

pub mod debounce;
pub mod devices;
pub mod error;
pub mod mock;
pub mod relay;
pub mod traits;

// Re-export commonly used types for convenience
pub use debounce::{ButtonDebouncer, ToggleEvent};
pub use devices::{AnyInputLine, AnyOutputLine};
pub use error::{HardwareError, Result};
pub use relay::{LockActuator, Relay};
pub use traits::{InputLine, OutputLine, Polarity, SignalLevel};
