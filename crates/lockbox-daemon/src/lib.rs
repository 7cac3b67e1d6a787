//! Device runtime for the lockbox controller.
//!
//! Wires the lock, the button, the message bus and the outbound HTTP
//! collaborators into one [`DeviceContext`], and drives it from a single
//! cooperative [`ControlLoop`]. The binary in `main.rs` only adds process
//! setup around these pieces.

pub mod context;
pub mod control_loop;
pub mod handlers;
pub mod host;
pub mod telemetry;

pub use context::{DeviceContext, DeviceLines};
pub use control_loop::{ControlLoop, TICK};
