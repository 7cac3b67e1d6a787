//! Shared fixtures: a local HTTP server standing in for the backend, and a
//! lock wired to mock lines.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use lockbox_controller::{CommandArbitrator, LockStateMachine};
use lockbox_core::BoxId;
use lockbox_hardware::mock::{MockOutputLine, MockOutputLineHandle};
use lockbox_hardware::{LockActuator, Polarity, Relay};
use tokio::net::TcpListener;

pub const UNLOCK: Duration = Duration::from_secs(5);

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a port nobody listens on.
pub async fn dead_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Request counter shared with backend handlers.
#[derive(Debug, Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn client(timeout: Duration) -> reqwest::Client {
    lockbox_network::http_client(timeout).unwrap()
}

pub fn arbitrator(box_id: i64) -> (CommandArbitrator<MockOutputLine>, MockOutputLineHandle) {
    let (line, handle) = MockOutputLine::new("relay");
    let actuator = LockActuator::new(Relay::new(line, Polarity::ActiveLow), None);
    let machine = LockStateMachine::new(actuator, UNLOCK);
    (CommandArbitrator::new(BoxId::new(box_id).unwrap(), machine), handle)
}
