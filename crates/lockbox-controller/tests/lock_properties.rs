//! Property-based tests for the lock state machine and arbitrator.
//!
//! Random sequences of open, close and clock advances are replayed against
//! the real machine and compared with a minimal model of the lock.

use std::time::{Duration, Instant};

use lockbox_controller::{CommandArbitrator, LockStateMachine, TransitionCause};
use lockbox_core::{BoxId, Command, CommandSource, LockAction, PhysicalState};
use lockbox_hardware::mock::MockOutputLine;
use lockbox_hardware::{LockActuator, Polarity, Relay};
use proptest::prelude::*;
use rstest::rstest;

const UNLOCK_MS: u64 = 500;
const CAUSE: TransitionCause = TransitionCause::Command(CommandSource::Direct);

#[derive(Debug, Clone, Copy)]
enum Op {
    Open,
    Close,
    Advance(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Open),
        Just(Op::Close),
        (0u64..=2 * UNLOCK_MS).prop_map(Op::Advance),
    ]
}

fn machine() -> LockStateMachine<MockOutputLine> {
    let (line, _handle) = MockOutputLine::new("relay");
    let actuator = LockActuator::new(Relay::new(line, Polarity::ActiveLow), None);
    LockStateMachine::new(actuator, Duration::from_millis(UNLOCK_MS))
}

proptest! {
    /// Property: poll reports OPEN iff the most recent call was open and the
    /// deadline it set has not passed.
    #[test]
    fn prop_poll_matches_model(ops in prop::collection::vec(op(), 1..60)) {
        let mut machine = machine();
        let t0 = Instant::now();
        let mut now = t0;
        let mut model_deadline: Option<Instant> = None;

        for op in ops {
            match op {
                Op::Open => {
                    machine.open(now, CAUSE);
                    model_deadline = Some(now + Duration::from_millis(UNLOCK_MS));
                }
                Op::Close => {
                    machine.close(now, CAUSE);
                    model_deadline = None;
                }
                Op::Advance(ms) => now += Duration::from_millis(ms),
            }

            let expected = match model_deadline {
                Some(deadline) if now < deadline => PhysicalState::Open,
                _ => PhysicalState::Closed,
            };
            prop_assert_eq!(machine.poll(now), expected);
            // Deadline is set iff the lock is open.
            prop_assert_eq!(machine.unlock_deadline().is_some(), machine.physical().is_open());
        }
    }

    /// Property: re-opening never moves the deadline backwards.
    #[test]
    fn prop_reopen_never_shortens(gaps in prop::collection::vec(0u64..UNLOCK_MS, 1..20)) {
        let mut machine = machine();
        let mut now = Instant::now();
        machine.open(now, CAUSE);

        for gap in gaps {
            let before = machine.unlock_deadline();
            now += Duration::from_millis(gap);
            machine.open(now, CAUSE);
            prop_assert!(machine.unlock_deadline() >= before);
            prop_assert_eq!(
                machine.unlock_deadline(),
                Some(now + Duration::from_millis(UNLOCK_MS))
            );
        }
    }

    /// Property: a foreign identity claim is rejected and changes nothing,
    /// whatever the action and current state.
    #[test]
    fn prop_identity_mismatch_leaves_state_unchanged(
        claimed in any::<i64>().prop_filter("foreign box", |id| *id != 7),
        open_first in any::<bool>(),
        action in prop_oneof![Just(LockAction::Open), Just(LockAction::Close)],
        bus in any::<bool>(),
    ) {
        let mut arbitrator = CommandArbitrator::new(BoxId::new(7).unwrap(), machine());
        let now = Instant::now();
        if open_first {
            arbitrator.submit(Command::button_toggle(PhysicalState::Closed), now).unwrap();
        }
        arbitrator.take_transitions();
        let before = arbitrator.lock_state();

        let command = if bus {
            Command::bus(claimed, action)
        } else {
            Command::direct(claimed, action)
        };
        let result = arbitrator.submit(command, now);

        prop_assert!(result.is_err());
        prop_assert_eq!(arbitrator.lock_state(), before);
        prop_assert!(!arbitrator.has_pending_transitions());
    }
}

#[rstest]
#[case(LockAction::Open)]
#[case(LockAction::Close)]
fn test_matching_identity_is_accepted(#[case] action: LockAction) {
    let mut arbitrator = CommandArbitrator::new(BoxId::new(7).unwrap(), machine());
    let transition = arbitrator
        .submit(Command::direct(7, action), Instant::now())
        .unwrap();
    assert_eq!(transition.to.is_open(), action == LockAction::Open);
}
