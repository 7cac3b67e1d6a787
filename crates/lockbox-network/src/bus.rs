//! Publish/subscribe message bus client.
//!
//! The device listens for remote commands on `lockers/{device_id}/command`
//! and publishes its lock status on `lockers/{device_id}/status`. The bus is
//! fire-and-forget: inbound commands get no acknowledgment, and a publish
//! while disconnected is simply lost.
//!
//! # Implementations
//!
//! - [`ChannelBus`]: in-process bus with a [`ChannelBusHandle`] to inject
//!   commands and observe publishes. Used in tests and when no broker is
//!   configured.
//! - [`TcpBus`]: newline-delimited JSON frames to a broker bridge.
//! - [`AnyBus`]: runtime dispatch between the two.
//!
//! # Wire format (TCP)
//!
//! ```text
//! device -> bridge   {"subscribe":"lockers/ESP32_LOCKER_01/command"}
//! device -> bridge   {"topic":"lockers/ESP32_LOCKER_01/status","payload":"{...}"}
//! bridge -> device   {"topic":"lockers/ESP32_LOCKER_01/command","payload":"{...}"}
//! ```
//!
//! All traits use native `async fn` methods, so they are not object safe.
//! Use generics or [`AnyBus`] instead of `dyn MessageBus`.

#![allow(async_fn_in_trait)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use lockbox_core::constants::{BUS_COMMAND_SUFFIX, BUS_STATUS_SUFFIX, BUS_TOPIC_PREFIX};
use lockbox_core::DeviceId;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, trace, warn};

use crate::error::NetworkError;
use crate::messages::BusMessage;

/// Longest accepted frame, in bytes.
const MAX_FRAME_LENGTH: usize = 4096;

/// Inbound frames buffered between the socket reader and the control loop.
const INBOUND_BUFFER: usize = 32;

/// Topics used by one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusTopics {
    pub command: String,
    pub status: String,
}

impl BusTopics {
    pub fn for_device(device_id: &DeviceId) -> Self {
        Self {
            command: format!("{BUS_TOPIC_PREFIX}/{device_id}/{BUS_COMMAND_SUFFIX}"),
            status: format!("{BUS_TOPIC_PREFIX}/{device_id}/{BUS_STATUS_SUFFIX}"),
        }
    }
}

/// Message bus client as seen by the control loop.
pub trait MessageBus {
    /// Establish the connection and subscribe to the command topic.
    async fn connect(&mut self) -> Result<(), NetworkError>;

    fn is_connected(&self) -> bool;

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NetworkError>;

    /// Next buffered inbound message, without waiting.
    fn try_recv(&mut self) -> Option<BusMessage>;
}

// ---------------------------------------------------------------------------
// In-process bus
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ChannelBusShared {
    reachable: AtomicBool,
    connected: AtomicBool,
    connect_attempts: AtomicUsize,
    published: Mutex<Vec<BusMessage>>,
}

/// In-process message bus.
///
/// # Example
///
/// ```
/// use lockbox_network::bus::{ChannelBus, MessageBus};
///
/// # async fn example() -> Result<(), lockbox_network::NetworkError> {
/// let (mut bus, handle) = ChannelBus::new();
/// bus.connect().await?;
///
/// handle.inject("lockers/L1/command", r#"{"box_id":1,"action":"OPEN"}"#);
/// assert!(bus.try_recv().is_some());
///
/// bus.publish("lockers/L1/status", "{}").await?;
/// assert_eq!(handle.published().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChannelBus {
    inbound: mpsc::UnboundedReceiver<BusMessage>,
    shared: Arc<ChannelBusShared>,
}

/// Test-side handle of a [`ChannelBus`].
#[derive(Debug, Clone)]
pub struct ChannelBusHandle {
    inbound: mpsc::UnboundedSender<BusMessage>,
    shared: Arc<ChannelBusShared>,
}

impl ChannelBus {
    pub fn new() -> (Self, ChannelBusHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(ChannelBusShared {
            reachable: AtomicBool::new(true),
            connected: AtomicBool::new(false),
            connect_attempts: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
        });
        (
            Self {
                inbound: rx,
                shared: Arc::clone(&shared),
            },
            ChannelBusHandle { inbound: tx, shared },
        )
    }
}

impl MessageBus for ChannelBus {
    async fn connect(&mut self) -> Result<(), NetworkError> {
        self.shared.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.shared.reachable.load(Ordering::SeqCst) {
            return Err(NetworkError::ConnectionLost("broker unreachable".to_string()));
        }
        self.shared.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NetworkError> {
        if !self.is_connected() {
            return Err(NetworkError::NotConnected);
        }
        self.shared
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(BusMessage::new(topic, payload));
        Ok(())
    }

    fn try_recv(&mut self) -> Option<BusMessage> {
        if !self.is_connected() {
            return None;
        }
        self.inbound.try_recv().ok()
    }
}

impl ChannelBusHandle {
    /// Queue an inbound message as if the broker delivered it.
    pub fn inject(&self, topic: &str, payload: &str) {
        // The receiver only goes away with the bus itself.
        let _ = self.inbound.send(BusMessage::new(topic, payload));
    }

    /// Everything published so far.
    pub fn published(&self) -> Vec<BusMessage> {
        self.shared
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make the broker reachable or not. Going unreachable drops the
    /// current connection.
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.reachable.store(reachable, Ordering::SeqCst);
        if !reachable {
            self.shared.connected.store(false, Ordering::SeqCst);
        }
    }

    pub fn connect_attempts(&self) -> usize {
        self.shared.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// TCP bridge bus
// ---------------------------------------------------------------------------

type FrameSink = SplitSink<Framed<TcpStream, LinesCodec>, String>;

/// Message bus over a line-framed TCP connection to a broker bridge.
///
/// A background task reads inbound frames into a bounded buffer that
/// [`MessageBus::try_recv`] drains. When the peer goes away the task ends and
/// the bus reports itself disconnected.
pub struct TcpBus {
    addr: String,
    timeout: Duration,
    topics: BusTopics,
    sink: Option<FrameSink>,
    inbound: Option<mpsc::Receiver<BusMessage>>,
    reader: Option<JoinHandle<()>>,
}

impl TcpBus {
    pub fn new(addr: impl Into<String>, topics: BusTopics, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            topics,
            sink: None,
            inbound: None,
            reader: None,
        }
    }

    pub fn topics(&self) -> &BusTopics {
        &self.topics
    }

    fn disconnect(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.sink = None;
        self.inbound = None;
    }

    async fn send_frame(&mut self, frame: String) -> Result<(), NetworkError> {
        let sink = self.sink.as_mut().ok_or(NetworkError::NotConnected)?;
        let result = match tokio::time::timeout(self.timeout, sink.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(NetworkError::WriteTimeout(self.timeout.as_millis() as u64)),
        };
        if result.is_err() {
            self.disconnect();
        }
        result
    }
}

impl std::fmt::Debug for TcpBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpBus")
            .field("addr", &self.addr)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl MessageBus for TcpBus {
    async fn connect(&mut self) -> Result<(), NetworkError> {
        self.disconnect();
        info!(addr = %self.addr, "Connecting to message bus");

        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(NetworkError::ConnectionTimeout(
                    self.timeout.as_millis() as u64
                ));
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH));
        let (sink, mut stream) = framed.split();
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);

        let reader = tokio::spawn(async move {
            while let Some(line) = stream.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Bus read failed");
                        break;
                    }
                };
                match serde_json::from_str::<BusMessage>(&line) {
                    Ok(message) => {
                        trace!(topic = %message.topic, "Bus frame received");
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!(error = %e, "Ignoring malformed bus frame"),
                }
            }
            info!("Message bus connection closed");
        });

        self.sink = Some(sink);
        self.inbound = Some(rx);
        self.reader = Some(reader);

        let subscribe = serde_json::json!({ "subscribe": self.topics.command }).to_string();
        self.send_frame(subscribe).await?;
        info!(topic = %self.topics.command, "Subscribed to command topic");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.sink.is_some() && self.reader.as_ref().is_some_and(|reader| !reader.is_finished())
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NetworkError> {
        if !self.is_connected() {
            return Err(NetworkError::NotConnected);
        }
        let frame = serde_json::to_string(&BusMessage::new(topic, payload))?;
        self.send_frame(frame).await
    }

    fn try_recv(&mut self) -> Option<BusMessage> {
        self.inbound.as_mut()?.try_recv().ok()
    }
}

impl Drop for TcpBus {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Enum wrapper for bus dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyBus {
    Channel(ChannelBus),
    Tcp(TcpBus),
}

impl MessageBus for AnyBus {
    async fn connect(&mut self) -> Result<(), NetworkError> {
        match self {
            Self::Channel(bus) => bus.connect().await,
            Self::Tcp(bus) => bus.connect().await,
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Channel(bus) => bus.is_connected(),
            Self::Tcp(bus) => bus.is_connected(),
        }
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NetworkError> {
        match self {
            Self::Channel(bus) => bus.publish(topic, payload).await,
            Self::Tcp(bus) => bus.publish(topic, payload).await,
        }
    }

    fn try_recv(&mut self) -> Option<BusMessage> {
        match self {
            Self::Channel(bus) => bus.try_recv(),
            Self::Tcp(bus) => bus.try_recv(),
        }
    }
}
