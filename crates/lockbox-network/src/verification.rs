//! PIN verification gateway for the kiosk flow.
//!
//! The gateway never decides on its own whether a PIN is good. It validates
//! the shape locally, forwards the code to the verification authority and
//! turns a positive verdict into a `PIN_FLOW` unlock command for the
//! arbitrator.
//!
//! # Outcomes
//!
//! | Outcome | When | HTTP |
//! |---|---|---|
//! | success | authority says `valid: true` | 200 |
//! | `VALIDATION_ERROR` | PIN is not exactly 6 ASCII digits (no network call) | 400 |
//! | `PIN_REJECTED` | authority says `valid: false` | 403 |
//! | `MALFORMED_RESPONSE` | body is not `{data: {valid: bool, ..}}` | 502 |
//! | `SERVICE_UNAVAILABLE` | transport failure or 5xx | 503 |

use axum::http::StatusCode;
use lockbox_controller::{CommandArbitrator, Rejection, StateTransition};
use lockbox_core::constants::{
    MSG_KIOSK_UNLOCKED, MSG_MALFORMED_RESPONSE, MSG_PIN_FORMAT, MSG_PIN_REJECTED,
    MSG_SERVICE_UNAVAILABLE,
};
use lockbox_core::{BoxId, Clock, Command, DeviceConfig, PinCode};
use lockbox_hardware::OutputLine;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::NetworkError;
use crate::messages::{KioskResponse, VerifyPinRequest, VerifyPinResponse};
use crate::reporter::http_client;

/// Verdict of the verification authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    pub message: Option<String>,
    pub order_id: Option<i64>,
    pub box_number: Option<i64>,
}

impl VerificationResult {
    /// Parse the authority's response body.
    ///
    /// # Errors
    /// Returns [`KioskError::MalformedResponse`] unless the body carries a
    /// boolean `data.valid`.
    pub fn from_body(body: &str) -> Result<Self, KioskError> {
        let response: VerifyPinResponse = serde_json::from_str(body).map_err(|e| {
            warn!(error = %e, "Unparseable verification response");
            KioskError::MalformedResponse
        })?;
        let data = response.data;
        Ok(Self {
            valid: data.valid,
            message: data.message,
            order_id: data.order_id,
            box_number: data.box_number,
        })
    }
}

/// Successful kiosk unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskSuccess {
    pub message: String,
    pub order_id: Option<i64>,
    pub box_number: Option<i64>,
    pub transition: StateTransition,
}

/// Why a kiosk unlock did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum KioskError {
    #[error("{}", MSG_PIN_FORMAT)]
    Validation,

    #[error("{}", MSG_SERVICE_UNAVAILABLE)]
    ServiceUnavailable,

    #[error("{}", MSG_MALFORMED_RESPONSE)]
    MalformedResponse,

    /// Negative verdict, carrying the authority's reason verbatim.
    #[error("{0}")]
    PinRejected(String),

    #[error(transparent)]
    Rejected(#[from] Rejection),
}

impl KioskError {
    pub fn code(&self) -> &'static str {
        match self {
            KioskError::Validation => "VALIDATION_ERROR",
            KioskError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            KioskError::MalformedResponse => "MALFORMED_RESPONSE",
            KioskError::PinRejected(_) => "PIN_REJECTED",
            KioskError::Rejected(rejection) => rejection.code(),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            KioskError::Validation => StatusCode::BAD_REQUEST,
            KioskError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            KioskError::MalformedResponse => StatusCode::BAD_GATEWAY,
            KioskError::PinRejected(_) | KioskError::Rejected(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Whether the kiosk may simply try again with the same PIN.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KioskError::ServiceUnavailable | KioskError::MalformedResponse
        )
    }
}

/// Reply of the kiosk flow as sent to the terminal.
pub type KioskReply = Result<KioskSuccess, KioskError>;

/// Map a kiosk outcome to its HTTP status and response body.
pub fn kiosk_response(reply: &KioskReply) -> (StatusCode, KioskResponse) {
    match reply {
        Ok(success) => (
            StatusCode::OK,
            KioskResponse {
                success: true,
                message: success.message.clone(),
                order_id: success.order_id,
                box_number: success.box_number,
            },
        ),
        Err(e) => (
            e.http_status(),
            KioskResponse {
                success: false,
                message: e.to_string(),
                order_id: None,
                box_number: None,
            },
        ),
    }
}

/// Round-trips kiosk PINs to the verification authority.
#[derive(Debug, Clone)]
pub struct PinVerificationGateway {
    client: reqwest::Client,
    endpoint: String,
    box_id: BoxId,
}

impl PinVerificationGateway {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &DeviceConfig) -> Result<Self, NetworkError> {
        let client = http_client(config.http_timeout)?;
        Ok(Self::with_client(client, config.verify_pin_endpoint(), config.box_id))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>, box_id: BoxId) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            box_id,
        }
    }

    /// Ask the authority for a verdict on `pin`.
    ///
    /// # Errors
    /// [`KioskError::ServiceUnavailable`] on transport failure or a 5xx
    /// answer, [`KioskError::MalformedResponse`] on an unexpected body.
    pub async fn verify(&self, pin: &PinCode) -> Result<VerificationResult, KioskError> {
        let request = VerifyPinRequest {
            box_id: self.box_id.as_i64(),
            pin_code: pin.as_str(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = %self.endpoint, error = %e, "Verification server unreachable");
                KioskError::ServiceUnavailable
            })?;

        let status = response.status();
        if status.is_server_error() {
            warn!(endpoint = %self.endpoint, status = status.as_u16(), "Verification server error");
            return Err(KioskError::ServiceUnavailable);
        }

        let body = response.text().await.map_err(|e| {
            warn!(error = %e, "Verification response body could not be read");
            KioskError::ServiceUnavailable
        })?;
        VerificationResult::from_body(&body)
    }

    /// Validate `raw_pin`, obtain a verdict and unlock on a positive one.
    ///
    /// The command is submitted with the time read from `clock` after the
    /// verdict arrives, so the unlock window starts when the box opens.
    ///
    /// # Errors
    /// See [`KioskError`]. On any error the lock state is unchanged.
    pub async fn verify_and_unlock<O, C>(
        &self,
        raw_pin: &str,
        arbitrator: &mut CommandArbitrator<O>,
        clock: &C,
    ) -> KioskReply
    where
        O: OutputLine,
        C: Clock + ?Sized,
    {
        let pin = PinCode::parse(raw_pin).map_err(|_| KioskError::Validation)?;
        let verdict = self.verify(&pin).await?;

        if !verdict.valid {
            let reason = verdict
                .message
                .unwrap_or_else(|| MSG_PIN_REJECTED.to_string());
            info!(reason = %reason, "PIN rejected by verification server");
            return Err(KioskError::PinRejected(reason));
        }

        let transition = arbitrator.submit(Command::pin_flow_unlock(), clock.now())?;
        info!(
            order_id = verdict.order_id,
            box_number = verdict.box_number,
            "Kiosk PIN accepted"
        );
        Ok(KioskSuccess {
            message: verdict
                .message
                .unwrap_or_else(|| MSG_KIOSK_UNLOCKED.to_string()),
            order_id: verdict.order_id,
            box_number: verdict.box_number,
            transition,
        })
    }
}
