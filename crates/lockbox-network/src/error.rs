//! Error types for outbound network operations.

use thiserror::Error;

/// Errors raised by the status push, the verification call and the bus.
///
/// None of these ever reach a command caller directly. The reporter turns
/// them into `false`, the gateway into a `KioskError`, and the control loop
/// logs bus failures and retries on its reconnect cadence.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The HTTP request failed (connect, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server answered with a non-2xx status.
    #[error("Server returned HTTP {0}")]
    HttpStatus(u16),

    /// No bus connection is established.
    #[error("Not connected to message bus")]
    NotConnected,

    /// Connection attempt timed out.
    #[error("Connection timeout after {0}ms")]
    ConnectionTimeout(u64),

    /// Write did not complete in time.
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// The peer went away or refused the connection.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Line framing failed.
    #[error("Codec error: {0}")]
    Codec(String),

    /// JSON encoding or decoding failed.
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_util::codec::LinesCodecError> for NetworkError {
    fn from(err: tokio_util::codec::LinesCodecError) -> Self {
        match err {
            tokio_util::codec::LinesCodecError::Io(e) => NetworkError::Io(e),
            other => NetworkError::Codec(other.to_string()),
        }
    }
}
