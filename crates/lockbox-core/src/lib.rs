//! Shared domain types for the lockbox access controller.
//!
//! Everything the other crates agree on lives here: identities, commands,
//! lock and reporting states, the configuration surface and the clock
//! abstraction used to make timing deterministic in tests.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use clock::{Clock, IntervalTimer, ManualClock, SystemClock};
pub use config::DeviceConfig;
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
