use std::time::Instant;

use anyhow::Context;
use lockbox_core::{DeviceConfig, SystemClock};
use lockbox_daemon::telemetry::init_tracing;
use lockbox_daemon::{ControlLoop, DeviceContext, DeviceLines};
use lockbox_hardware::mock::{MockInputLine, MockOutputLine};
use lockbox_hardware::{AnyInputLine, AnyOutputLine, Polarity};
use lockbox_network::server::REQUEST_QUEUE_CAPACITY;
use lockbox_network::{AnyBus, BusTopics, TcpBus, build_router, request_channels};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = DeviceConfig::from_env().context("invalid device configuration")?;
    info!(
        version = lockbox_core::VERSION,
        device_id = %config.device_id,
        box_id = config.box_id.as_i64(),
        backend = %config.backend_url,
        "lockbox-daemon starting"
    );

    warn!("No GPIO driver on this host, using simulated lines");
    let (relay, _relay_handle) = MockOutputLine::new("relay");
    let (indicator, _indicator_handle) = MockOutputLine::new("indicator");
    let button_idle = Polarity::from_active_low(config.button_active_low).level_for(false);
    let (button, _button_handle) = MockInputLine::new("button", button_idle);
    let lines = DeviceLines {
        relay: AnyOutputLine::Mock(relay),
        indicator: Some(AnyOutputLine::Mock(indicator)),
        button: AnyInputLine::Mock(button),
    };

    let bus = config.bus_addr.clone().map(|addr| {
        AnyBus::Tcp(TcpBus::new(
            addr,
            BusTopics::for_device(&config.device_id),
            config.http_timeout,
        ))
    });
    if bus.is_none() {
        info!("LOCKBOX_BUS_ADDR unset, remote bus commands disabled");
    }

    let bind_addr = config.bind_addr;
    let ctx = DeviceContext::new(config, lines, bus, Instant::now())
        .context("failed to build device context")?;

    let (router_state, queues) = request_channels(REQUEST_QUEUE_CAPACITY);
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "HTTP server listening");

    let server = tokio::spawn(async move {
        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        if let Err(e) = axum::serve(listener, build_router(router_state))
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!(error = %e, "HTTP server failed");
        }
    });

    let mut control = ControlLoop::new(ctx, SystemClock, queues);
    control
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await;

    server.await.context("HTTP server task panicked")?;
    Ok(())
}
