//! Wire messages.
//!
//! JSON shapes exchanged with the backend, the kiosk terminal, direct
//! callers and the message bus. Field names follow what deployed backends
//! and kiosks already speak (`boxId`, `isDoorOpen`, `box_id` on the bus).

use lockbox_core::{BoxId, BusStatus, Command, DeviceId, LockAction, ReportedStatus, StatusReport};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Backend status ingestion
// ---------------------------------------------------------------------------

/// Body of `POST /api/iot/box-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPush {
    pub box_id: i64,
    pub status: ReportedStatus,
    pub device_id: String,
    pub is_door_open: bool,
}

impl StatusPush {
    pub fn new(device_id: &DeviceId, box_id: BoxId, report: StatusReport) -> Self {
        Self {
            box_id: box_id.as_i64(),
            status: report.status,
            device_id: device_id.to_string(),
            is_door_open: report.door_open,
        }
    }
}

// ---------------------------------------------------------------------------
// PIN verification
// ---------------------------------------------------------------------------

/// Body sent to the verification authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPinRequest<'a> {
    pub box_id: i64,
    pub pin_code: &'a str,
}

/// Response envelope of the verification authority.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyPinResponse {
    pub data: VerifyPinData,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPinData {
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub box_number: Option<i64>,
}

// ---------------------------------------------------------------------------
// Kiosk flow
// ---------------------------------------------------------------------------

/// Body of `POST /verify-and-unlock`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KioskUnlockRequest {
    #[serde(default)]
    pub pin_code: String,
}

/// Reply to the kiosk terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KioskResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_number: Option<i64>,
}

// ---------------------------------------------------------------------------
// Direct command
// ---------------------------------------------------------------------------

/// Body of `POST /unlock`.
///
/// Only the outer shape must be a JSON object. A missing or wrongly typed
/// field reads as "nothing claimed" (box `-1`, empty action), so the caller
/// is answered with the specific reason instead of a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectCommandRequest {
    #[serde(default = "no_box_claimed", deserialize_with = "lenient_box_id")]
    pub box_id: i64,
    #[serde(default, deserialize_with = "lenient_action")]
    pub action: String,
}

/// Box identity read from a missing or non-integer `boxId`. Never valid.
pub const NO_BOX_CLAIMED: i64 = -1;

fn no_box_claimed() -> i64 {
    NO_BOX_CLAIMED
}

fn lenient_box_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_i64()
        .unwrap_or(NO_BOX_CLAIMED))
}

fn lenient_action<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(action) => action,
        _ => String::new(),
    })
}

impl DirectCommandRequest {
    /// Parse a raw request body.
    ///
    /// # Errors
    /// `MessageError::Empty` for an empty body, `MessageError::Json` when it
    /// is not a JSON object of the expected shape.
    pub fn from_body(body: &[u8]) -> Result<Self, MessageError> {
        if body.is_empty() {
            return Err(MessageError::Empty);
        }
        Ok(serde_json::from_slice(body)?)
    }
}

/// Success reply to a direct command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectCommandResponse {
    pub success: bool,
    pub box_id: i64,
    pub status: String,
    pub message: String,
}

/// Error reply (`{"success": false, "error": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Outcome of a direct command, as computed by the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectReply {
    Applied(DirectCommandResponse),
    Failed(ErrorResponse),
}

// ---------------------------------------------------------------------------
// Device queries
// ---------------------------------------------------------------------------

/// Reply to `GET /` and `GET /api/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device: String,
    pub box_id: i64,
    pub status: String,
    /// Seconds since start.
    pub uptime: u64,
    pub rssi: Option<i32>,
}

/// Reply to `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub box_id: i64,
    pub device_id: String,
    pub is_unlocked: bool,
    pub status: String,
    /// Seconds since start.
    pub uptime: u64,
    pub wifi_rssi: Option<i32>,
    /// Bytes of free memory.
    pub free_heap: Option<u64>,
    /// Milliseconds until auto-relock, `null` while locked.
    pub unlock_remaining_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Message bus
// ---------------------------------------------------------------------------

/// One bus message: a topic and its raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Inbound bus command payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BusCommandPayload {
    pub box_id: i64,
    pub action: String,
}

impl BusCommandPayload {
    /// Parse a payload and build the corresponding command.
    ///
    /// The identity claim is not checked here; that is the arbitrator's job.
    ///
    /// # Errors
    /// `MessageError::Json` for an unparseable payload and
    /// `MessageError::Action` for an action outside `OPEN` / `LOCK`.
    pub fn parse_command(payload: &str) -> Result<Command, MessageError> {
        let parsed: BusCommandPayload = serde_json::from_str(payload)?;
        let action = LockAction::from_bus(&parsed.action)?;
        Ok(Command::bus(parsed.box_id, action))
    }
}

/// Outbound bus status payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStatusMessage {
    pub box_id: i64,
    pub status: BusStatus,
    pub device: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl BusStatusMessage {
    pub fn new(device_id: &DeviceId, box_id: BoxId, status: BusStatus) -> Self {
        Self {
            box_id: box_id.as_i64(),
            status,
            device: device_id.to_string(),
            ip: None,
        }
    }

    #[must_use]
    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }
}

/// Errors from parsing inbound request bodies and bus payloads.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("No body")]
    Empty,

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Action(#[from] lockbox_core::Error),
}
