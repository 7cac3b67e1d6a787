//! Cooperative control loop.
//!
//! One logical thread of control drives the whole device. Each iteration
//! runs these steps in a fixed order:
//!
//! 1. transport servicing (bus reconnect, at most once per reconnect interval)
//! 2. auto-relock tick
//! 3. bus drain
//! 4. direct HTTP requests (queries and commands)
//! 5. button poll
//! 6. one kiosk PIN request
//! 7. one kiosk proxy request
//! 8. edge-triggered reports for every transition accepted this iteration
//! 9. heartbeat report, when due
//!
//! The only suspension points are the outbound network calls in steps 1 and
//! 6 to 9, each bounded by the HTTP timeout. While one is in flight nothing
//! else runs. The unlock window is re-checked before every outbound call, so
//! a relock is late by at most one call, however many calls an iteration
//! makes.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use lockbox_controller::StateTransition;
use lockbox_core::constants::CONTROL_LOOP_TICK_MS;
use lockbox_core::{BusStatus, Clock, IntervalTimer, StatusReport};
use lockbox_hardware::{InputLine, OutputLine};
use lockbox_network::messages::BusStatusMessage;
use lockbox_network::{DirectRequest, MessageBus, RequestQueues};
use tracing::{debug, info, trace, warn};

use crate::context::DeviceContext;
use crate::handlers;
use crate::host;

/// Pause between two iterations.
pub const TICK: Duration = Duration::from_millis(CONTROL_LOOP_TICK_MS);

/// Transitions logged when the loop stops.
const SHUTDOWN_HISTORY: usize = 10;

pub struct ControlLoop<O: OutputLine, I: InputLine, B: MessageBus, C: Clock> {
    ctx: DeviceContext<O, I, B>,
    clock: C,
    queues: RequestQueues,
    heartbeat: IntervalTimer,
    reconnect: IntervalTimer,
}

impl<O, I, B, C> ControlLoop<O, I, B, C>
where
    O: OutputLine,
    I: InputLine,
    B: MessageBus,
    C: Clock,
{
    pub fn new(ctx: DeviceContext<O, I, B>, clock: C, queues: RequestQueues) -> Self {
        let now = clock.now();
        let heartbeat = IntervalTimer::new(ctx.config.status_report_interval, now);
        let reconnect = IntervalTimer::new(ctx.config.reconnect_interval, now);
        Self {
            ctx,
            clock,
            queues,
            heartbeat,
            reconnect,
        }
    }

    pub fn context(&self) -> &DeviceContext<O, I, B> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut DeviceContext<O, I, B> {
        &mut self.ctx
    }

    /// Boot sequence: connect the bus, announce the device, report the
    /// initial status.
    pub async fn start(&mut self) {
        info!(
            device_id = %self.ctx.config.device_id,
            box_id = self.ctx.config.box_id.as_i64(),
            "Control loop starting"
        );
        self.connect_bus().await;
        self.ctx.reporter.report_now(StatusReport::boot()).await;
    }

    /// Run iterations until `shutdown` resolves.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        self.start().await;
        tokio::pin!(shutdown);
        loop {
            self.run_iteration().await;
            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(TICK) => {}
            }
        }
        for transition in self.ctx.arbitrator.machine().last_transitions(SHUTDOWN_HISTORY) {
            debug!(
                cause = %transition.cause,
                from = %transition.from,
                to = %transition.to,
                "Recent transition"
            );
        }
        info!(state = %self.ctx.arbitrator.lock_state().physical, "Control loop stopped");
    }

    /// One pass over every input source.
    pub async fn run_iteration(&mut self) {
        self.service_transport().await;

        self.relock_if_due();

        self.drain_bus();
        self.drain_direct_requests();
        self.poll_button();
        self.serve_one_kiosk_request().await;
        self.serve_one_proxy_request().await;

        self.report_transitions().await;
        self.heartbeat_if_due().await;
    }

    async fn service_transport(&mut self) {
        let Some(bus) = self.ctx.bus.as_ref() else {
            return;
        };
        if bus.is_connected() || !self.reconnect.due(self.clock.now()) {
            return;
        }
        warn!("Message bus disconnected, reconnecting");
        self.connect_bus().await;
    }

    /// Apply a lapsed unlock window. Runs before every outbound call.
    fn relock_if_due(&mut self) {
        self.ctx.arbitrator.tick(self.clock.now());
    }

    async fn connect_bus(&mut self) {
        let ip = host::local_ip_towards(&self.ctx.config.backend_url);
        let online = BusStatusMessage::new(
            &self.ctx.config.device_id,
            self.ctx.config.box_id,
            BusStatus::Online,
        )
        .with_ip(ip);

        self.relock_if_due();
        let Some(bus) = self.ctx.bus.as_mut() else {
            return;
        };
        if let Err(e) = bus.connect().await {
            warn!(error = %e, "Message bus connection failed");
            return;
        }

        self.relock_if_due();
        let Some(bus) = self.ctx.bus.as_mut() else {
            return;
        };
        publish(bus, &self.ctx.topics.status, &online).await;
    }

    fn drain_bus(&mut self) {
        let Some(bus) = self.ctx.bus.as_mut() else {
            return;
        };
        while let Some(message) = bus.try_recv() {
            trace!(topic = %message.topic, "Bus message");
            let now = self.clock.now();
            handlers::handle_bus_message(
                &message,
                &self.ctx.topics,
                &mut self.ctx.arbitrator,
                now,
            );
        }
    }

    fn drain_direct_requests(&mut self) {
        while let Ok(request) = self.queues.direct.try_recv() {
            let now = self.clock.now();
            // A dropped reply means the HTTP client went away; nothing to do.
            match request {
                DirectRequest::Info(reply) => {
                    let _ = reply.send(self.ctx.device_info(now));
                }
                DirectRequest::Status(reply) => {
                    let _ = reply.send(self.ctx.status_snapshot(now));
                }
                DirectRequest::Command { request, reply } => {
                    let outcome =
                        handlers::handle_direct_command(request, &mut self.ctx.arbitrator, now);
                    let _ = reply.send(outcome);
                }
            }
        }
    }

    fn poll_button(&mut self) {
        let level = match self.ctx.button.read() {
            Ok(level) => level,
            Err(e) => {
                debug!(line = self.ctx.button.name(), error = %e, "Button read failed");
                return;
            }
        };
        if let Some(event) = self.ctx.debouncer.poll(level, self.clock.now()) {
            handlers::handle_button_press(event, &mut self.ctx.arbitrator);
        }
    }

    async fn serve_one_kiosk_request(&mut self) {
        let Ok(request) = self.queues.kiosk.try_recv() else {
            return;
        };
        self.relock_if_due();
        let reply = self
            .ctx
            .gateway
            .verify_and_unlock(&request.pin_code, &mut self.ctx.arbitrator, &self.clock)
            .await;
        if let Err(e) = &reply {
            info!(code = e.code(), "Kiosk unlock refused");
        }
        let _ = request.reply.send(reply);
    }

    async fn serve_one_proxy_request(&mut self) {
        let Ok(request) = self.queues.proxy.try_recv() else {
            return;
        };
        self.relock_if_due();
        let reply = self.ctx.proxy.forward(request.route, request.body).await;
        let _ = request.reply.send(reply);
    }

    /// Report every queued transition, oldest first.
    ///
    /// A relock that falls due while reports are in flight is applied before
    /// the next call and reported in the same pass.
    async fn report_transitions(&mut self) {
        let mut pending = VecDeque::new();
        loop {
            self.collect_transitions(&mut pending);
            let Some(transition) = pending.pop_front() else {
                break;
            };
            debug!(
                cause = %transition.cause,
                from = %transition.from,
                to = %transition.to,
                "Reporting transition"
            );
            self.ctx
                .reporter
                .report_now(transition.to.transition_report())
                .await;

            self.collect_transitions(&mut pending);
            if let Some(bus) = self.ctx.bus.as_mut()
                && bus.is_connected()
            {
                let status = BusStatusMessage::new(
                    &self.ctx.config.device_id,
                    self.ctx.config.box_id,
                    transition.to.bus_status(),
                );
                publish(bus, &self.ctx.topics.status, &status).await;
            }
        }
    }

    fn collect_transitions(&mut self, pending: &mut VecDeque<StateTransition>) {
        self.relock_if_due();
        pending.extend(self.ctx.arbitrator.take_transitions());
    }

    async fn heartbeat_if_due(&mut self) {
        let now = self.clock.now();
        if !self.heartbeat.due(now) {
            return;
        }
        let state = self.ctx.arbitrator.state(now);
        self.ctx.reporter.report_now(state.heartbeat_report()).await;
    }
}

async fn publish<B: MessageBus>(bus: &mut B, topic: &str, status: &BusStatusMessage) {
    let payload = match serde_json::to_string(status) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to encode bus status");
            return;
        }
    };
    if let Err(e) = bus.publish(topic, &payload).await {
        warn!(error = %e, status = ?status.status, "Bus status dropped");
    }
}
