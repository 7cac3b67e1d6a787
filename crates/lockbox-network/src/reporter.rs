//! Best-effort status reporting to the backend.
//!
//! [`StatusReporter::report_now`] makes exactly one attempt to push the
//! current status to the ingestion endpoint. Failures are logged and
//! discarded: there is no retry queue and no backoff, the next transition
//! or heartbeat is the next attempt.
//!
//! Callers only report after the lock has already moved, so a slow or dead
//! backend can delay the control loop (bounded by the HTTP timeout) but never
//! gates a lock operation.

use std::time::Duration;

use lockbox_core::{BoxId, DeviceConfig, DeviceId, StatusReport};
use tracing::{debug, warn};

use crate::error::NetworkError;
use crate::messages::StatusPush;

/// Pushes [`StatusReport`]s to the backend ingestion endpoint.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    client: reqwest::Client,
    endpoint: String,
    device_id: DeviceId,
    box_id: BoxId,
}

impl StatusReporter {
    /// Build a reporter with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &DeviceConfig) -> Result<Self, NetworkError> {
        let client = http_client(config.http_timeout)?;
        Ok(Self::with_client(
            client,
            config.status_endpoint(),
            config.device_id.clone(),
            config.box_id,
        ))
    }

    /// Build a reporter around an existing client.
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        device_id: DeviceId,
        box_id: BoxId,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            device_id,
            box_id,
        }
    }

    /// Make one attempt to push `report`.
    ///
    /// Returns `true` only if the backend answered with a 2xx status.
    pub async fn report_now(&self, report: StatusReport) -> bool {
        let body = StatusPush::new(&self.device_id, self.box_id, report);
        match self.try_send(&body).await {
            Ok(()) => {
                debug!(
                    status = %report.status,
                    door_open = report.door_open,
                    "Status reported"
                );
                true
            }
            Err(e) => {
                warn!(
                    endpoint = %self.endpoint,
                    status = %report.status,
                    error = %e,
                    "Status report dropped"
                );
                false
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn try_send(&self, body: &StatusPush) -> Result<(), NetworkError> {
        let response = self.client.post(&self.endpoint).json(body).send().await?;
        if !response.status().is_success() {
            return Err(NetworkError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// HTTP client with the request timeout applied to every call.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, NetworkError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
