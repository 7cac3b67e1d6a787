//! Lock state machine.
//!
//! Owns the one authoritative [`LockState`] of the device and the actuator
//! that mirrors it.
//!
//! # States
//!
//! - `Closed`: initial and safe state; the solenoid is de-energized
//! - `Open`: solenoid energized, always bounded by an unlock deadline
//!
//! # Transitions
//!
//! - `open`: Closed → Open, or Open → Open with the deadline re-armed
//! - `close`: Open → Closed, or Closed → Closed (no-op on the state)
//! - `poll` / `expire`: Open → Closed once `now >= deadline` (auto-relock)
//!
//! Both commanded transitions are total: they never fail. The lock has no
//! position sensor, so the actuator is commanded optimistically and a driver
//! fault is logged without affecting the state.
//!
//! The deadline is set if and only if the state is `Open`.
//!
//! # Examples
//!
//! ```
//! use lockbox_controller::{LockStateMachine, TransitionCause};
//! use lockbox_core::{CommandSource, PhysicalState};
//! use lockbox_hardware::mock::MockOutputLine;
//! use lockbox_hardware::{LockActuator, Polarity, Relay};
//! use std::time::{Duration, Instant};
//!
//! let (line, _handle) = MockOutputLine::new("relay");
//! let actuator = LockActuator::new(Relay::new(line, Polarity::ActiveLow), None);
//! let mut machine = LockStateMachine::new(actuator, Duration::from_secs(5));
//!
//! let t0 = Instant::now();
//! machine.open(t0, TransitionCause::Command(CommandSource::Button));
//! assert_eq!(machine.poll(t0 + Duration::from_secs(4)), PhysicalState::Open);
//! assert_eq!(machine.poll(t0 + Duration::from_secs(5)), PhysicalState::Closed);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use lockbox_core::constants::MAX_HISTORY_SIZE;
use lockbox_core::{CommandSource, PhysicalState};
use lockbox_hardware::{LockActuator, OutputLine};
use tracing::{info, warn};

/// Snapshot of the authoritative lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    pub physical: PhysicalState,
    pub unlock_deadline: Option<Instant>,
}

impl LockState {
    fn closed() -> Self {
        Self {
            physical: PhysicalState::Closed,
            unlock_deadline: None,
        }
    }
}

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// An accepted command from the given source.
    Command(CommandSource),
    /// The unlock window elapsed.
    AutoRelock,
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionCause::Command(source) => write!(f, "{source}"),
            TransitionCause::AutoRelock => write!(f, "AUTO_RELOCK"),
        }
    }
}

/// A single recorded lock transition.
///
/// Self-transitions (re-open while open, close while closed) are recorded
/// too; they are still accepted commands and are reported as such.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: PhysicalState,
    pub to: PhysicalState,
    pub cause: TransitionCause,
    pub at: Instant,
}

impl StateTransition {
    /// Returns `true` if the physical state actually changed.
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// State machine owning the lock state and its actuator.
///
/// # Thread Safety
///
/// Not synchronized. It is owned by the control loop and only mutated
/// through the arbitrator.
#[derive(Debug)]
pub struct LockStateMachine<O: OutputLine> {
    state: LockState,
    unlock_duration: Duration,
    actuator: LockActuator<O>,
    history: VecDeque<StateTransition>,
}

impl<O: OutputLine> LockStateMachine<O> {
    /// Create a machine in the `Closed` state.
    ///
    /// The actuator is expected to be released already (see
    /// [`LockActuator::new`]).
    pub fn new(actuator: LockActuator<O>, unlock_duration: Duration) -> Self {
        Self {
            state: LockState::closed(),
            unlock_duration,
            actuator,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// Unlock, or extend the current unlock window.
    ///
    /// The new deadline is `now + unlock_duration`. A re-open never moves an
    /// existing deadline backwards.
    pub fn open(&mut self, now: Instant, cause: TransitionCause) -> StateTransition {
        let from = self.state.physical;
        if let Err(e) = self.actuator.engage() {
            warn!(error = %e, "Relay write failed while unlocking");
        }

        let deadline = now + self.unlock_duration;
        let deadline = match self.state.unlock_deadline {
            Some(existing) if existing > deadline => existing,
            _ => deadline,
        };
        self.state = LockState {
            physical: PhysicalState::Open,
            unlock_deadline: Some(deadline),
        };

        info!(
            %cause,
            unlock_ms = self.unlock_duration.as_millis() as u64,
            rearmed = from.is_open(),
            "Box unlocked"
        );
        self.record(from, cause, now)
    }

    /// Lock. Closing an already closed box only re-drives the actuator.
    pub fn close(&mut self, now: Instant, cause: TransitionCause) -> StateTransition {
        let from = self.state.physical;
        if let Err(e) = self.actuator.release() {
            warn!(error = %e, "Relay write failed while locking");
        }
        self.state = LockState::closed();

        info!(%cause, "Box locked");
        self.record(from, cause, now)
    }

    /// Current physical state, applying auto-relock first.
    pub fn poll(&mut self, now: Instant) -> PhysicalState {
        self.expire(now);
        self.state.physical
    }

    /// Apply auto-relock if the unlock window has elapsed.
    ///
    /// Returns the transition when one happened.
    pub fn expire(&mut self, now: Instant) -> Option<StateTransition> {
        let deadline = self.state.unlock_deadline?;
        if now < deadline {
            return None;
        }
        Some(self.close(now, TransitionCause::AutoRelock))
    }

    /// State as last computed, without applying auto-relock.
    pub fn lock_state(&self) -> LockState {
        self.state
    }

    pub fn physical(&self) -> PhysicalState {
        self.state.physical
    }

    pub fn unlock_deadline(&self) -> Option<Instant> {
        self.state.unlock_deadline
    }

    pub fn unlock_duration(&self) -> Duration {
        self.unlock_duration
    }

    /// Time left in the current unlock window, `None` while closed.
    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.state
            .unlock_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Whether the actuator was last commanded to unlock.
    pub fn is_actuator_engaged(&self) -> bool {
        self.actuator.is_engaged()
    }

    /// The last `count` recorded transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .copied()
            .collect()
    }

    fn record(&mut self, from: PhysicalState, cause: TransitionCause, at: Instant) -> StateTransition {
        let transition = StateTransition {
            from,
            to: self.state.physical,
            cause,
            at,
        };
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        transition
    }
}
