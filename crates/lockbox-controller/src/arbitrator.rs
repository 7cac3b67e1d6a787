//! Command arbitrator.
//!
//! Single point of mutation for the lock. Every entry point (direct HTTP,
//! bus, button, kiosk PIN flow) turns its input into a [`Command`] and hands
//! it to [`CommandArbitrator::submit`]. Accepted transitions are queued so the
//! caller can forward each one to the status reporter after the lock has
//! already moved.

use std::collections::VecDeque;
use std::time::Instant;

use lockbox_core::{BoxId, Command, LockAction, PhysicalState};
use lockbox_hardware::OutputLine;
use thiserror::Error;
use tracing::{debug, warn};

use crate::state_machine::{LockState, LockStateMachine, StateTransition, TransitionCause};

/// Why a command was refused.
///
/// Rejected commands never touch the lock state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Rejection {
    #[error("Box ID mismatch: this device controls box {expected}, command claimed {claimed}")]
    IdentityMismatch { expected: BoxId, claimed: i64 },
}

impl Rejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::IdentityMismatch { .. } => "IDENTITY_MISMATCH",
        }
    }
}

/// Validates commands and applies them to the lock state machine.
///
/// Owned by the control loop. `submit` takes `&mut self`, so commands are
/// resolved one at a time without any locking.
#[derive(Debug)]
pub struct CommandArbitrator<O: OutputLine> {
    box_id: BoxId,
    machine: LockStateMachine<O>,
    pending: VecDeque<StateTransition>,
}

impl<O: OutputLine> CommandArbitrator<O> {
    pub fn new(box_id: BoxId, machine: LockStateMachine<O>) -> Self {
        Self {
            box_id,
            machine,
            pending: VecDeque::new(),
        }
    }

    /// Check an identity claim against this device's box.
    ///
    /// Local sources carry no claim and always pass.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::IdentityMismatch`] when the claim names another box.
    pub fn check_identity(&self, claimed: Option<i64>) -> Result<(), Rejection> {
        match claimed {
            Some(claimed) if !self.box_id.matches(claimed) => Err(Rejection::IdentityMismatch {
                expected: self.box_id,
                claimed,
            }),
            _ => Ok(()),
        }
    }

    /// Validate and apply one command.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when validation fails. The lock state is left
    /// unchanged in that case.
    pub fn submit(&mut self, command: Command, now: Instant) -> Result<StateTransition, Rejection> {
        if let Err(rejection) = self.check_identity(command.claimed_identity) {
            warn!(
                source = %command.source,
                action = %command.action,
                box_id = self.box_id.as_i64(),
                claimed = command.claimed_identity,
                "Rejected command"
            );
            return Err(rejection);
        }

        // Settle a lapsed window first so the command applies to the real state.
        self.tick(now);

        let cause = TransitionCause::Command(command.source);
        let transition = match command.action {
            LockAction::Open => self.machine.open(now, cause),
            LockAction::Close => self.machine.close(now, cause),
        };
        debug!(
            source = %command.source,
            from = %transition.from,
            to = %transition.to,
            "Command applied"
        );
        self.pending.push_back(transition);
        Ok(transition)
    }

    /// Apply auto-relock if due. The resulting transition is queued like any
    /// other accepted transition.
    pub fn tick(&mut self, now: Instant) -> Option<StateTransition> {
        let transition = self.machine.expire(now)?;
        self.pending.push_back(transition);
        Some(transition)
    }

    /// Current physical state after applying auto-relock.
    pub fn state(&mut self, now: Instant) -> PhysicalState {
        self.tick(now);
        self.machine.physical()
    }

    /// Drain transitions accepted since the last call, oldest first.
    pub fn take_transitions(&mut self) -> Vec<StateTransition> {
        self.pending.drain(..).collect()
    }

    pub fn has_pending_transitions(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn lock_state(&self) -> LockState {
        self.machine.lock_state()
    }

    pub fn box_id(&self) -> BoxId {
        self.box_id
    }

    pub fn machine(&self) -> &LockStateMachine<O> {
        &self.machine
    }
}
