//! Core constants for the lockbox controller.
//!
//! Timing defaults, remote endpoint paths, bus topic layout and the fixed
//! user-facing messages. The timing values match the firmware this device
//! replaces, so a backend tuned for those devices sees the same cadence.
//!
//! # Usage
//!
//! ```
//! use lockbox_core::constants::*;
//! use std::time::Duration;
//!
//! let unlock_window = Duration::from_millis(DEFAULT_UNLOCK_DURATION_MS);
//! assert_eq!(unlock_window.as_secs(), 5);
//!
//! assert_eq!(PIN_CODE_LENGTH, 6);
//! ```

// ============================================================================
// Timing Defaults
// ============================================================================

/// How long the lock stays open after an unlock command (milliseconds).
///
/// Re-opening during the window restarts it from the time of the new command.
///
/// # Value: 5000ms (5 seconds)
pub const DEFAULT_UNLOCK_DURATION_MS: u64 = 5000;

/// Interval between heartbeat status reports (milliseconds).
///
/// # Value: 30000ms (30 seconds)
pub const DEFAULT_STATUS_REPORT_INTERVAL_MS: u64 = 30_000;

/// Minimum delay between two transport reconnection attempts (milliseconds).
///
/// # Value: 10000ms (10 seconds)
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 10_000;

/// Upper bound for any single outbound HTTP call (milliseconds).
///
/// While a call is in flight the control loop is suspended, so this is also
/// the worst-case delay for auto-relock and button handling.
///
/// # Value: 10000ms (10 seconds)
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Minimum spacing between two accepted button edges (milliseconds).
///
/// # Value: 200ms
pub const DEFAULT_BUTTON_DEBOUNCE_MS: u64 = 200;

/// Pause between two control loop iterations (milliseconds).
///
/// Bounds the auto-relock latency when no network call is in flight.
///
/// # Value: 10ms
pub const CONTROL_LOOP_TICK_MS: u64 = 10;

// ============================================================================
// Identity Defaults
// ============================================================================

/// Default device identity.
pub const DEFAULT_DEVICE_ID: &str = "ESP32_LOCKER_01";

/// Default box identity.
pub const DEFAULT_BOX_ID: i64 = 1;

/// Lowest valid box identity.
pub const MIN_BOX_ID: i64 = 1;

// ============================================================================
// Network Defaults
// ============================================================================

/// Default base address of the remote backend.
pub const DEFAULT_BACKEND_URL: &str = "http://192.168.1.100:8080";

/// Default bind address of the on-device HTTP server.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Path of the status ingestion endpoint on the backend.
pub const STATUS_ENDPOINT_PATH: &str = "/api/iot/box-status";

/// Path of the PIN verification endpoint on the backend.
pub const VERIFY_PIN_ENDPOINT_PATH: &str = "/api/iot/verify-pin";

/// Backend path behind `POST /api/proxy/send-otp`.
pub const PROXY_SEND_OTP_PATH: &str = "/api/auth/email/send-otp";

/// Backend path behind `POST /api/proxy/verify-otp`.
pub const PROXY_VERIFY_OTP_PATH: &str = "/api/auth/email/verify-otp";

/// Backend path behind `POST /api/proxy/register`.
pub const PROXY_REGISTER_PATH: &str = "/api/auth/email/complete-registration";

// ============================================================================
// Message Bus Topics
// ============================================================================

/// Prefix shared by every bus topic of this device family.
///
/// Full topics are `lockers/{device_id}/command` and `lockers/{device_id}/status`.
pub const BUS_TOPIC_PREFIX: &str = "lockers";

/// Suffix of the inbound command topic.
pub const BUS_COMMAND_SUFFIX: &str = "command";

/// Suffix of the outbound status topic.
pub const BUS_STATUS_SUFFIX: &str = "status";

// ============================================================================
// Input Constraints
// ============================================================================

/// Number of ASCII digits in a kiosk PIN.
pub const PIN_CODE_LENGTH: usize = 6;

/// Number of lock transitions retained in the state machine history.
pub const MAX_HISTORY_SIZE: usize = 100;

// ============================================================================
// Response Messages
// ============================================================================

/// Direct command reply after an unlock.
pub const MSG_BOX_UNLOCKED: &str = "Box unlocked successfully";

/// Direct command reply after a lock.
pub const MSG_BOX_LOCKED: &str = "Box locked successfully";

/// Kiosk reply when the PIN has the wrong shape.
pub const MSG_PIN_FORMAT: &str = "PIN must be exactly 6 digits";

/// Kiosk reply when a proxied backend call cannot be completed.
pub const MSG_BACKEND_UNAVAILABLE: &str = "Could not reach server";

/// Kiosk reply when the verification server cannot be reached.
pub const MSG_SERVICE_UNAVAILABLE: &str = "Could not reach verification server";

/// Kiosk reply when the verification server answers with garbage.
pub const MSG_MALFORMED_RESPONSE: &str = "Invalid response from verification server";

/// Kiosk reply when the server rejects a PIN without giving a reason.
pub const MSG_PIN_REJECTED: &str = "Invalid PIN code";

/// Kiosk reply after a successful unlock when the server gives no message.
pub const MSG_KIOSK_UNLOCKED: &str = "Box unlocked. It will lock again automatically.";
