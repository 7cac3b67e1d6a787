//! Pass-through for the kiosk's account endpoints.
//!
//! The kiosk page served next to the lock can only talk to the device, so
//! its sign-in and registration calls go through `POST /api/proxy/{name}`.
//! Only the three names below are forwarded; the body and the backend's
//! answer are passed through untouched. The device never interprets them.
//!
//! | Name | Backend path |
//! |---|---|
//! | `send-otp` | [`PROXY_SEND_OTP_PATH`] |
//! | `verify-otp` | [`PROXY_VERIFY_OTP_PATH`] |
//! | `register` | [`PROXY_REGISTER_PATH`] |

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use lockbox_core::DeviceConfig;
use lockbox_core::constants::{
    MSG_BACKEND_UNAVAILABLE, PROXY_REGISTER_PATH, PROXY_SEND_OTP_PATH, PROXY_VERIFY_OTP_PATH,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::NetworkError;
use crate::reporter::http_client;

/// A forwardable kiosk endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyRoute {
    SendOtp,
    VerifyOtp,
    Register,
}

impl ProxyRoute {
    /// Look up the `{name}` segment of `/api/proxy/{name}`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "send-otp" => Some(Self::SendOtp),
            "verify-otp" => Some(Self::VerifyOtp),
            "register" => Some(Self::Register),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SendOtp => "send-otp",
            Self::VerifyOtp => "verify-otp",
            Self::Register => "register",
        }
    }

    pub fn upstream_path(self) -> &'static str {
        match self {
            Self::SendOtp => PROXY_SEND_OTP_PATH,
            Self::VerifyOtp => PROXY_VERIFY_OTP_PATH,
            Self::Register => PROXY_REGISTER_PATH,
        }
    }
}

/// The backend's answer, status and raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{}", MSG_BACKEND_UNAVAILABLE)]
    Unavailable(#[source] reqwest::Error),
}

impl ProxyError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            ProxyError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

pub type ProxyReply = Result<ProxyResponse, ProxyError>;

/// Forwards kiosk account calls to the backend.
#[derive(Debug, Clone)]
pub struct BackendProxy {
    client: reqwest::Client,
    backend_url: String,
}

impl BackendProxy {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &DeviceConfig) -> Result<Self, NetworkError> {
        let client = http_client(config.http_timeout)?;
        Ok(Self::with_client(client, config.backend_url.clone()))
    }

    pub fn with_client(client: reqwest::Client, backend_url: impl Into<String>) -> Self {
        Self {
            client,
            backend_url: backend_url.into(),
        }
    }

    pub fn url_for(&self, route: ProxyRoute) -> String {
        format!("{}{}", self.backend_url, route.upstream_path())
    }

    /// Make one attempt to forward `body` to `route`.
    ///
    /// Any status the backend answers with is passed back as is.
    ///
    /// # Errors
    /// [`ProxyError::Unavailable`] when the backend cannot be reached or its
    /// body cannot be read within the timeout.
    pub async fn forward(&self, route: ProxyRoute, body: Bytes) -> ProxyReply {
        let url = self.url_for(route);
        let result = async {
            let response = self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(ProxyResponse { status, body })
        }
        .await;

        match result {
            Ok(response) => {
                debug!(route = route.name(), status = response.status.as_u16(), "Proxied");
                Ok(response)
            }
            Err(e) => {
                warn!(route = route.name(), url = %url, error = %e, "Proxy call failed");
                Err(ProxyError::Unavailable(e))
            }
        }
    }
}
