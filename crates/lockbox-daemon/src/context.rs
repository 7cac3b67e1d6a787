//! Device context.
//!
//! Everything the control loop owns, gathered in one struct: the arbitrator
//! (and through it the one lock state), the button, the bus client and the
//! outbound HTTP collaborators. There are no process-wide singletons; the
//! loop passes pieces of the context by reference to each handler.

use std::time::Instant;

use lockbox_controller::{CommandArbitrator, LockStateMachine};
use lockbox_core::{DeviceConfig, PhysicalState};
use lockbox_hardware::{ButtonDebouncer, InputLine, LockActuator, OutputLine, Polarity, Relay};
use lockbox_network::messages::{DeviceInfo, StatusSnapshot};
use lockbox_network::{
    BackendProxy, BusTopics, MessageBus, NetworkError, PinVerificationGateway, StatusReporter,
};
use tracing::info;

use crate::host;

/// Physical lines of one device.
#[derive(Debug)]
pub struct DeviceLines<O, I> {
    /// Relay energizing the solenoid.
    pub relay: O,
    /// Status indicator mirroring the lock (lit while unlocked).
    pub indicator: Option<O>,
    pub button: I,
}

#[derive(Debug)]
pub struct DeviceContext<O: OutputLine, I: InputLine, B: MessageBus> {
    pub config: DeviceConfig,
    pub arbitrator: CommandArbitrator<O>,
    pub button: I,
    pub debouncer: ButtonDebouncer,
    pub bus: Option<B>,
    pub topics: BusTopics,
    pub reporter: StatusReporter,
    pub gateway: PinVerificationGateway,
    pub proxy: BackendProxy,
    pub started_at: Instant,
}

impl<O: OutputLine, I: InputLine, B: MessageBus> DeviceContext<O, I, B> {
    /// Wire a device from its configuration and lines.
    ///
    /// The lock is driven closed here, before anything else can command it.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP clients cannot be built.
    pub fn new(
        config: DeviceConfig,
        lines: DeviceLines<O, I>,
        bus: Option<B>,
        started_at: Instant,
    ) -> Result<Self, NetworkError> {
        let relay_polarity = Polarity::from_active_low(config.relay_active_low);
        let actuator = LockActuator::new(
            Relay::new(lines.relay, relay_polarity),
            // Indicator shares the relay polarity.
            lines.indicator.map(|line| Relay::new(line, relay_polarity)),
        );
        let machine = LockStateMachine::new(actuator, config.unlock_duration);
        let arbitrator = CommandArbitrator::new(config.box_id, machine);

        let debouncer = ButtonDebouncer::new(
            Polarity::from_active_low(config.button_active_low),
            config.button_debounce,
        );

        let reporter = StatusReporter::new(&config)?;
        let gateway = PinVerificationGateway::new(&config)?;
        let proxy = BackendProxy::new(&config)?;
        let topics = BusTopics::for_device(&config.device_id);

        info!(
            device_id = %config.device_id,
            box_id = config.box_id.as_i64(),
            unlock_ms = config.unlock_duration.as_millis() as u64,
            bus = bus.is_some(),
            "Device context ready"
        );

        Ok(Self {
            config,
            arbitrator,
            button: lines.button,
            debouncer,
            bus,
            topics,
            reporter,
            gateway,
            proxy,
            started_at,
        })
    }

    pub fn uptime_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started_at).as_secs()
    }

    /// Reply to `GET /` and `GET /api/info`.
    pub fn device_info(&mut self, now: Instant) -> DeviceInfo {
        let state = self.arbitrator.state(now);
        DeviceInfo {
            device: self.config.device_id.to_string(),
            box_id: self.config.box_id.as_i64(),
            status: state.label().to_string(),
            uptime: self.uptime_secs(now),
            rssi: None,
        }
    }

    /// Reply to `GET /status`.
    pub fn status_snapshot(&mut self, now: Instant) -> StatusSnapshot {
        let state = self.arbitrator.state(now);
        StatusSnapshot {
            box_id: self.config.box_id.as_i64(),
            device_id: self.config.device_id.to_string(),
            is_unlocked: state == PhysicalState::Open,
            status: state.label().to_string(),
            uptime: self.uptime_secs(now),
            // No radio link on this host.
            wifi_rssi: None,
            free_heap: host::free_memory(),
            unlock_remaining_ms: self
                .arbitrator
                .machine()
                .time_remaining(now)
                .map(|left| left.as_millis() as u64),
        }
    }
}
