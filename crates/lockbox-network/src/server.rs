//! On-device HTTP surface.
//!
//! Handlers never touch the lock. Each request is forwarded over a bounded
//! channel to the control loop together with a one-shot reply sender, and
//! the handler waits for the loop to answer. Only the control loop ever
//! reaches the arbitrator.
//!
//! | Route | Method | Forwarded as |
//! |---|---|---|
//! | `/`, `/api/info` | GET | [`DirectRequest::Info`] |
//! | `/status` | GET | [`DirectRequest::Status`] |
//! | `/unlock` | POST | [`DirectRequest::Command`] |
//! | `/verify-and-unlock` | POST | [`KioskRequest`] |
//! | `/api/proxy/{name}` | POST | [`ProxyRequest`] |
//!
//! Malformed bodies are answered here without involving the loop. If the loop
//! has gone away every forwarded route answers 503.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::messages::{
    DeviceInfo, DirectCommandRequest, DirectReply, ErrorResponse, KioskResponse,
    KioskUnlockRequest, MessageError, StatusSnapshot,
};
use crate::proxy::{ProxyReply, ProxyResponse, ProxyRoute};
use crate::verification::{KioskError, KioskReply, kiosk_response};

/// Requests queued between the HTTP server and the control loop.
pub const REQUEST_QUEUE_CAPACITY: usize = 16;

/// Direct requests: device queries and lock commands.
#[derive(Debug)]
pub enum DirectRequest {
    Info(oneshot::Sender<DeviceInfo>),
    Status(oneshot::Sender<StatusSnapshot>),
    Command {
        request: DirectCommandRequest,
        reply: oneshot::Sender<DirectReply>,
    },
}

/// Kiosk PIN flow request.
#[derive(Debug)]
pub struct KioskRequest {
    pub pin_code: String,
    pub reply: oneshot::Sender<KioskReply>,
}

/// Kiosk account call to pass through to the backend.
#[derive(Debug)]
pub struct ProxyRequest {
    pub route: ProxyRoute,
    pub body: Bytes,
    pub reply: oneshot::Sender<ProxyReply>,
}

/// Router state: the sending halves of the request queues.
#[derive(Debug, Clone)]
pub struct RouterState {
    direct: mpsc::Sender<DirectRequest>,
    kiosk: mpsc::Sender<KioskRequest>,
    proxy: mpsc::Sender<ProxyRequest>,
}

/// Receiving halves, owned by the control loop.
#[derive(Debug)]
pub struct RequestQueues {
    pub direct: mpsc::Receiver<DirectRequest>,
    pub kiosk: mpsc::Receiver<KioskRequest>,
    pub proxy: mpsc::Receiver<ProxyRequest>,
}

/// Create the request queues.
pub fn request_channels(capacity: usize) -> (RouterState, RequestQueues) {
    let (direct_tx, direct_rx) = mpsc::channel(capacity);
    let (kiosk_tx, kiosk_rx) = mpsc::channel(capacity);
    let (proxy_tx, proxy_rx) = mpsc::channel(capacity);
    (
        RouterState {
            direct: direct_tx,
            kiosk: kiosk_tx,
            proxy: proxy_tx,
        },
        RequestQueues {
            direct: direct_rx,
            kiosk: kiosk_rx,
            proxy: proxy_rx,
        },
    )
}

/// Build the device router.
pub fn build_router(state: RouterState) -> Router {
    Router::new()
        .route("/", get(device_info))
        .route("/api/info", get(device_info))
        .route("/status", get(status))
        .route("/unlock", post(unlock))
        .route("/verify-and-unlock", post(verify_and_unlock))
        .route("/api/proxy/{name}", post(proxy))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Control loop no longer answering.
#[derive(Debug)]
struct LoopUnavailable;

impl IntoResponse for LoopUnavailable {
    fn into_response(self) -> Response {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("Controller unavailable")),
        )
            .into_response()
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        (self.status, [(CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

impl IntoResponse for DirectReply {
    fn into_response(self) -> Response {
        match self {
            DirectReply::Applied(body) => (StatusCode::OK, Json(body)).into_response(),
            DirectReply::Failed(body) => (StatusCode::BAD_REQUEST, Json(body)).into_response(),
        }
    }
}

async fn forward<R, T>(
    queue: &mpsc::Sender<R>,
    make: impl FnOnce(oneshot::Sender<T>) -> R,
) -> Result<T, LoopUnavailable> {
    let (tx, rx) = oneshot::channel();
    if queue.send(make(tx)).await.is_err() {
        warn!("Control loop queue closed");
        return Err(LoopUnavailable);
    }
    rx.await.map_err(|_| {
        warn!("Control loop dropped a request");
        LoopUnavailable
    })
}

async fn device_info(State(state): State<RouterState>) -> Result<Json<DeviceInfo>, LoopUnavailable> {
    forward(&state.direct, DirectRequest::Info).await.map(Json)
}

async fn status(State(state): State<RouterState>) -> Result<Json<StatusSnapshot>, LoopUnavailable> {
    forward(&state.direct, DirectRequest::Status).await.map(Json)
}

async fn unlock(State(state): State<RouterState>, body: Bytes) -> Result<DirectReply, LoopUnavailable> {
    let request = match DirectCommandRequest::from_body(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejected direct command body");
            let error = match e {
                MessageError::Empty => "No body",
                _ => "Invalid JSON",
            };
            return Ok(DirectReply::Failed(ErrorResponse::new(error)));
        }
    };
    forward(&state.direct, |reply| DirectRequest::Command { request, reply }).await
}

async fn verify_and_unlock(
    State(state): State<RouterState>,
    body: Bytes,
) -> Result<(StatusCode, Json<KioskResponse>), LoopUnavailable> {
    let reply = match serde_json::from_slice::<KioskUnlockRequest>(&body) {
        Ok(request) => {
            forward(&state.kiosk, |reply| KioskRequest {
                pin_code: request.pin_code,
                reply,
            })
            .await?
        }
        Err(e) => {
            debug!(error = %e, "Rejected kiosk request body");
            Err(KioskError::Validation)
        }
    };
    let (status, body) = kiosk_response(&reply);
    Ok((status, Json(body)))
}

async fn proxy(
    State(state): State<RouterState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Response, LoopUnavailable> {
    let Some(route) = ProxyRoute::from_name(&name) else {
        debug!(name = %name, "Unknown proxy route");
        return Ok(not_found().await.into_response());
    };
    let reply = forward(&state.proxy, |reply| ProxyRequest { route, body, reply }).await?;
    Ok(match reply {
        Ok(response) => response.into_response(),
        Err(e) => (
            e.http_status(),
            Json(KioskResponse {
                success: false,
                message: e.to_string(),
                order_id: None,
                box_number: None,
            }),
        )
            .into_response(),
    })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
