//! Device configuration.
//!
//! The whole configuration surface is fixed at deploy time and read once at
//! startup. Values come from environment variables (optionally seeded from a
//! `.env` file by the binary); anything unset falls back to the defaults in
//! [`constants`](crate::constants).
//!
//! | Env Var                             | Default                     |
//! |-------------------------------------|-----------------------------|
//! | `LOCKBOX_DEVICE_ID`                 | `ESP32_LOCKER_01`           |
//! | `LOCKBOX_BOX_ID`                    | `1`                         |
//! | `LOCKBOX_BACKEND_URL`               | `http://192.168.1.100:8080` |
//! | `LOCKBOX_BIND_ADDR`                 | `0.0.0.0:8080`              |
//! | `LOCKBOX_BUS_ADDR`                  | unset (bus disabled)        |
//! | `LOCKBOX_UNLOCK_DURATION_MS`        | `5000`                      |
//! | `LOCKBOX_STATUS_REPORT_INTERVAL_MS` | `30000`                     |
//! | `LOCKBOX_RECONNECT_INTERVAL_MS`     | `10000`                     |
//! | `LOCKBOX_HTTP_TIMEOUT_MS`           | `10000`                     |
//! | `LOCKBOX_BUTTON_DEBOUNCE_MS`        | `200`                       |
//! | `LOCKBOX_RELAY_ACTIVE_LOW`          | `true`                      |
//! | `LOCKBOX_BUTTON_ACTIVE_LOW`         | `true`                      |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::*;
use crate::error::Error;
use crate::types::{BoxId, DeviceId};
use crate::Result;

/// Configuration surface of one device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub device_id: DeviceId,
    pub box_id: BoxId,
    /// Base address of the backend, without trailing slash.
    pub backend_url: String,
    /// Listener address of the on-device HTTP server.
    pub bind_addr: SocketAddr,
    /// `host:port` of the message bus bridge. `None` disables the bus.
    pub bus_addr: Option<String>,
    pub unlock_duration: Duration,
    pub status_report_interval: Duration,
    pub reconnect_interval: Duration,
    pub http_timeout: Duration,
    pub button_debounce: Duration,
    pub relay_active_low: bool,
    pub button_active_low: bool,
}

impl DeviceConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfigValue` or `Error::Config` when a variable
    /// is set to something that does not parse or violates a constraint.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    /// Same as [`DeviceConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let device_id = match lookup("LOCKBOX_DEVICE_ID") {
            Some(raw) => DeviceId::new(&raw)?,
            None => DeviceId::new(DEFAULT_DEVICE_ID)?,
        };
        let box_id = BoxId::new(parse_or(&lookup, "LOCKBOX_BOX_ID", DEFAULT_BOX_ID)?)?;

        let backend_url = lookup("LOCKBOX_BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(Error::InvalidConfigValue {
                key: "LOCKBOX_BACKEND_URL".to_string(),
                value: backend_url,
            });
        }

        let bind_addr = parse_or(
            &lookup,
            "LOCKBOX_BIND_ADDR",
            parse_default::<SocketAddr>(DEFAULT_BIND_ADDR)?,
        )?;
        let bus_addr = lookup("LOCKBOX_BUS_ADDR")
            .map(|addr| addr.trim().to_string())
            .filter(|addr| !addr.is_empty());

        Ok(Self {
            device_id,
            box_id,
            backend_url,
            bind_addr,
            bus_addr,
            unlock_duration: millis_or(&lookup, "LOCKBOX_UNLOCK_DURATION_MS", DEFAULT_UNLOCK_DURATION_MS)?,
            status_report_interval: millis_or(
                &lookup,
                "LOCKBOX_STATUS_REPORT_INTERVAL_MS",
                DEFAULT_STATUS_REPORT_INTERVAL_MS,
            )?,
            reconnect_interval: millis_or(
                &lookup,
                "LOCKBOX_RECONNECT_INTERVAL_MS",
                DEFAULT_RECONNECT_INTERVAL_MS,
            )?,
            http_timeout: millis_or(&lookup, "LOCKBOX_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS)?,
            button_debounce: millis_or(&lookup, "LOCKBOX_BUTTON_DEBOUNCE_MS", DEFAULT_BUTTON_DEBOUNCE_MS)?,
            relay_active_low: parse_or(&lookup, "LOCKBOX_RELAY_ACTIVE_LOW", true)?,
            button_active_low: parse_or(&lookup, "LOCKBOX_BUTTON_ACTIVE_LOW", true)?,
        })
    }

    /// Full URL of the status ingestion endpoint.
    #[must_use]
    pub fn status_endpoint(&self) -> String {
        format!("{}{}", self.backend_url, STATUS_ENDPOINT_PATH)
    }

    /// Full URL of the PIN verification endpoint.
    #[must_use]
    pub fn verify_pin_endpoint(&self) -> String {
        format!("{}{}", self.backend_url, VERIFY_PIN_ENDPOINT_PATH)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        // Defaults are compile-time constants known to be valid.
        Self::from_lookup(|_| None).unwrap_or_else(|e| unreachable!("invalid built-in default: {e}"))
    }
}

fn parse_default<T: FromStr>(raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Config(format!("invalid built-in default: {raw}")))
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| Error::InvalidConfigValue {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

fn millis_or<F>(lookup: &F, key: &str, default_ms: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let ms: u64 = parse_or(lookup, key, default_ms)?;
    if ms == 0 {
        return Err(Error::Config(format!("{key} must be greater than zero")));
    }
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.device_id.as_str(), DEFAULT_DEVICE_ID);
        assert_eq!(config.box_id.as_i64(), 1);
        assert_eq!(config.unlock_duration, Duration::from_secs(5));
        assert_eq!(config.status_report_interval, Duration::from_secs(30));
        assert_eq!(config.reconnect_interval, Duration::from_secs(10));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert!(config.relay_active_low);
        assert!(config.bus_addr.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = DeviceConfig::from_lookup(lookup_from(&[
            ("LOCKBOX_DEVICE_ID", "LOCKER_09"),
            ("LOCKBOX_BOX_ID", "9"),
            ("LOCKBOX_BACKEND_URL", "https://api.example.com/"),
            ("LOCKBOX_BUS_ADDR", "127.0.0.1:1884"),
            ("LOCKBOX_UNLOCK_DURATION_MS", "8000"),
            ("LOCKBOX_RELAY_ACTIVE_LOW", "false"),
        ]))
        .unwrap();

        assert_eq!(config.device_id.as_str(), "LOCKER_09");
        assert_eq!(config.box_id.as_i64(), 9);
        assert_eq!(config.backend_url, "https://api.example.com");
        assert_eq!(
            config.status_endpoint(),
            "https://api.example.com/api/iot/box-status"
        );
        assert_eq!(
            config.verify_pin_endpoint(),
            "https://api.example.com/api/iot/verify-pin"
        );
        assert_eq!(config.bus_addr.as_deref(), Some("127.0.0.1:1884"));
        assert_eq!(config.unlock_duration, Duration::from_millis(8000));
        assert!(!config.relay_active_low);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = DeviceConfig::from_lookup(lookup_from(&[("LOCKBOX_BOX_ID", "one")]));
        assert!(matches!(result, Err(Error::InvalidConfigValue { .. })));
    }

    #[test]
    fn test_zero_box_id_is_rejected() {
        let result = DeviceConfig::from_lookup(lookup_from(&[("LOCKBOX_BOX_ID", "0")]));
        assert!(matches!(result, Err(Error::InvalidBoxId(0))));
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let result =
            DeviceConfig::from_lookup(lookup_from(&[("LOCKBOX_UNLOCK_DURATION_MS", "0")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_backend_url_requires_scheme() {
        let result =
            DeviceConfig::from_lookup(lookup_from(&[("LOCKBOX_BACKEND_URL", "192.168.1.5")]));
        assert!(matches!(result, Err(Error::InvalidConfigValue { .. })));
    }

    #[test]
    fn test_blank_bus_addr_disables_bus() {
        let config = DeviceConfig::from_lookup(lookup_from(&[("LOCKBOX_BUS_ADDR", "  ")])).unwrap();
        assert!(config.bus_addr.is_none());
    }
}
