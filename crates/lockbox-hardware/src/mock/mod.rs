//! Mock line implementations for testing and development.
//!
//! This module provides simulated lines that can be observed and driven
//! programmatically without requiring physical hardware. Each constructor
//! returns the line together with a cloneable handle sharing its state.

pub mod input;
pub mod output;

// Re-export commonly used types
pub use input::{MockInputLine, MockInputLineHandle};
pub use output::{MockOutputLine, MockOutputLineHandle};
