//! Lock control core.
//!
//! This crate owns the single authoritative lock state of the device
//! ([`LockStateMachine`]) and the only way to change it
//! ([`CommandArbitrator`]).

pub mod arbitrator;
pub mod state_machine;

pub use arbitrator::{CommandArbitrator, Rejection};
pub use state_machine::{LockState, LockStateMachine, StateTransition, TransitionCause};
