//! Entry point handlers.
//!
//! Each handler maps one input plus the arbitrator to a reply or a
//! transition. They run synchronously inside the control loop, so at most
//! one of them ever touches the lock at a time.

use std::time::Instant;

use lockbox_controller::{CommandArbitrator, StateTransition};
use lockbox_core::constants::{MSG_BOX_LOCKED, MSG_BOX_UNLOCKED};
use lockbox_core::{Command, LockAction};
use lockbox_hardware::{OutputLine, ToggleEvent};
use lockbox_network::BusTopics;
use lockbox_network::messages::{
    BusCommandPayload, BusMessage, DirectCommandRequest, DirectCommandResponse, DirectReply,
    ErrorResponse,
};
use tracing::{debug, info, warn};

/// Resolve a direct HTTP command.
///
/// The identity claim is checked before the action, so a request for
/// another box is refused as a mismatch whatever action it names.
pub fn handle_direct_command<O: OutputLine>(
    request: DirectCommandRequest,
    arbitrator: &mut CommandArbitrator<O>,
    now: Instant,
) -> DirectReply {
    if let Err(rejection) = arbitrator.check_identity(Some(request.box_id)) {
        warn!(error = %rejection, "Direct command refused");
        return DirectReply::Failed(ErrorResponse::new("Box ID mismatch"));
    }

    let action = match LockAction::from_direct(&request.action) {
        Ok(action) => action,
        Err(e) => {
            warn!(error = %e, "Direct command refused");
            return DirectReply::Failed(ErrorResponse::new("Invalid action"));
        }
    };

    match arbitrator.submit(Command::direct(request.box_id, action), now) {
        Ok(transition) => DirectReply::Applied(DirectCommandResponse {
            success: true,
            box_id: arbitrator.box_id().as_i64(),
            status: transition.to.label().to_string(),
            message: match action {
                LockAction::Open => MSG_BOX_UNLOCKED,
                LockAction::Close => MSG_BOX_LOCKED,
            }
            .to_string(),
        }),
        Err(rejection) => DirectReply::Failed(ErrorResponse::new(rejection.to_string())),
    }
}

/// Resolve one inbound bus message.
///
/// There is no reply channel on the bus: messages on other topics, bad
/// payloads, unknown actions and foreign box identities are dropped with a
/// log line.
pub fn handle_bus_message<O: OutputLine>(
    message: &BusMessage,
    topics: &BusTopics,
    arbitrator: &mut CommandArbitrator<O>,
    now: Instant,
) -> Option<StateTransition> {
    if message.topic != topics.command {
        debug!(topic = %message.topic, "Ignoring message on foreign topic");
        return None;
    }

    let command = match BusCommandPayload::parse_command(&message.payload) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "Dropping bus command");
            return None;
        }
    };

    match arbitrator.submit(command, now) {
        Ok(transition) => {
            info!(action = %command.action, "Bus command applied");
            Some(transition)
        }
        Err(rejection) => {
            warn!(error = %rejection, "Dropping bus command");
            None
        }
    }
}

/// Turn a debounced press into a toggle of the current lock state.
pub fn handle_button_press<O: OutputLine>(
    event: ToggleEvent,
    arbitrator: &mut CommandArbitrator<O>,
) -> Option<StateTransition> {
    // Read the state at the moment of the press, after any pending relock.
    let current = arbitrator.state(event.at);
    match arbitrator.submit(Command::button_toggle(current), event.at) {
        Ok(transition) => Some(transition),
        Err(rejection) => {
            warn!(error = %rejection, "Button press refused");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockbox_controller::LockStateMachine;
    use lockbox_core::{BoxId, DeviceId, PhysicalState};
    use lockbox_hardware::mock::MockOutputLine;
    use lockbox_hardware::{LockActuator, Polarity, Relay};
    use rstest::rstest;
    use std::time::Duration;

    fn arbitrator() -> CommandArbitrator<MockOutputLine> {
        let (line, _handle) = MockOutputLine::new("relay");
        let actuator = LockActuator::new(Relay::new(line, Polarity::ActiveLow), None);
        CommandArbitrator::new(
            BoxId::new(1).unwrap(),
            LockStateMachine::new(actuator, Duration::from_secs(5)),
        )
    }

    fn direct(box_id: i64, action: &str) -> DirectCommandRequest {
        DirectCommandRequest {
            box_id,
            action: action.to_string(),
        }
    }

    fn topics() -> BusTopics {
        BusTopics::for_device(&DeviceId::new("ESP32_LOCKER_01").unwrap())
    }

    #[test]
    fn test_direct_unlock() {
        let mut arbitrator = arbitrator();
        let reply = handle_direct_command(direct(1, "UNLOCK"), &mut arbitrator, Instant::now());

        assert_eq!(
            reply,
            DirectReply::Applied(DirectCommandResponse {
                success: true,
                box_id: 1,
                status: "UNLOCKED".to_string(),
                message: "Box unlocked successfully".to_string(),
            })
        );
    }

    #[test]
    fn test_direct_lock() {
        let mut arbitrator = arbitrator();
        let now = Instant::now();
        handle_direct_command(direct(1, "UNLOCK"), &mut arbitrator, now);

        let reply = handle_direct_command(direct(1, "LOCK"), &mut arbitrator, now);

        match reply {
            DirectReply::Applied(body) => {
                assert_eq!(body.status, "LOCKED");
                assert_eq!(body.message, "Box locked successfully");
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[rstest]
    #[case(direct(2, "UNLOCK"), "Box ID mismatch")]
    #[case(direct(2, "DANCE"), "Box ID mismatch")]
    #[case(direct(0, ""), "Box ID mismatch")]
    #[case(direct(1, "DANCE"), "Invalid action")]
    #[case(direct(1, "unlock"), "Invalid action")]
    fn test_direct_failures(#[case] request: DirectCommandRequest, #[case] error: &str) {
        let mut arbitrator = arbitrator();
        let now = Instant::now();

        let reply = handle_direct_command(request, &mut arbitrator, now);

        assert_eq!(reply, DirectReply::Failed(ErrorResponse::new(error)));
        assert_eq!(arbitrator.state(now), PhysicalState::Closed);
        assert!(!arbitrator.has_pending_transitions());
    }

    #[test]
    fn test_bus_open() {
        let mut arbitrator = arbitrator();
        let message = BusMessage::new(
            "lockers/ESP32_LOCKER_01/command",
            r#"{"box_id":1,"action":"OPEN"}"#,
        );

        let transition = handle_bus_message(&message, &topics(), &mut arbitrator, Instant::now());

        assert_eq!(transition.map(|t| t.to), Some(PhysicalState::Open));
    }

    #[rstest]
    #[case("lockers/ESP32_LOCKER_01/command", r#"{"box_id":2,"action":"OPEN"}"#)]
    #[case("lockers/ESP32_LOCKER_01/command", r#"{"box_id":1,"action":"UNLOCK"}"#)]
    #[case("lockers/ESP32_LOCKER_01/command", "{}")]
    #[case("lockers/OTHER/command", r#"{"box_id":1,"action":"OPEN"}"#)]
    fn test_bus_drops(#[case] topic: &str, #[case] payload: &str) {
        let mut arbitrator = arbitrator();
        let message = BusMessage::new(topic, payload);

        assert!(handle_bus_message(&message, &topics(), &mut arbitrator, Instant::now()).is_none());
        assert!(!arbitrator.has_pending_transitions());
    }

    #[test]
    fn test_button_toggles() {
        let mut arbitrator = arbitrator();
        let t0 = Instant::now();

        let opened = handle_button_press(ToggleEvent { at: t0 }, &mut arbitrator).unwrap();
        assert_eq!(opened.to, PhysicalState::Open);

        let closed = handle_button_press(
            ToggleEvent {
                at: t0 + Duration::from_secs(1),
            },
            &mut arbitrator,
        )
        .unwrap();
        assert_eq!(closed.to, PhysicalState::Closed);
    }

    #[test]
    fn test_button_after_relock_opens_again() {
        let mut arbitrator = arbitrator();
        let t0 = Instant::now();
        handle_button_press(ToggleEvent { at: t0 }, &mut arbitrator);

        // The window lapsed without a tick; the press must see CLOSED.
        let transition = handle_button_press(
            ToggleEvent {
                at: t0 + Duration::from_secs(6),
            },
            &mut arbitrator,
        )
        .unwrap();
        assert_eq!(transition.to, PhysicalState::Open);
    }
}
