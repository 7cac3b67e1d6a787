//! Status reporter against a local ingestion endpoint.

mod common;

use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use common::{Hits, client, dead_backend, spawn_backend};
use lockbox_core::{BoxId, DeviceId, ReportedStatus, StatusReport};
use lockbox_network::StatusReporter;
use serde_json::{Value, json};
use tokio::sync::mpsc;

const STATUS_PATH: &str = "/api/iot/box-status";

fn reporter(base: &str, timeout: Duration) -> StatusReporter {
    StatusReporter::with_client(
        client(timeout),
        format!("{base}{STATUS_PATH}"),
        DeviceId::new("ESP32_LOCKER_01").unwrap(),
        BoxId::new(1).unwrap(),
    )
}

#[tokio::test]
async fn test_report_sends_expected_body() {
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    let router = Router::new().route(
        STATUS_PATH,
        post(move |Json(body): Json<Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(body);
                StatusCode::OK
            }
        }),
    );
    let base = spawn_backend(router).await;

    let ok = reporter(&base, Duration::from_secs(1))
        .report_now(StatusReport::new(ReportedStatus::Available, true))
        .await;

    assert!(ok);
    assert_eq!(
        rx.recv().await.unwrap(),
        json!({
            "boxId": 1,
            "status": "AVAILABLE",
            "deviceId": "ESP32_LOCKER_01",
            "isDoorOpen": true,
        })
    );
}

#[tokio::test]
async fn test_non_success_status_is_failure() {
    let router = Router::new().route(STATUS_PATH, post(|| async { StatusCode::BAD_GATEWAY }));
    let base = spawn_backend(router).await;

    let ok = reporter(&base, Duration::from_secs(1))
        .report_now(StatusReport::boot())
        .await;

    assert!(!ok);
}

#[tokio::test]
async fn test_timeout_returns_false_within_bound() {
    let hits = Hits::default();
    let router = Router::new()
        .route(
            STATUS_PATH,
            post(|State(hits): State<Hits>| async move {
                hits.record();
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        )
        .with_state(hits.clone());
    let base = spawn_backend(router).await;

    let started = Instant::now();
    let ok = reporter(&base, Duration::from_millis(200))
        .report_now(StatusReport::new(ReportedStatus::Locked, false))
        .await;

    assert!(!ok);
    assert_eq!(hits.count(), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_unreachable_backend_returns_false() {
    let base = dead_backend().await;
    let ok = reporter(&base, Duration::from_millis(500))
        .report_now(StatusReport::boot())
        .await;
    assert!(!ok);
}

#[tokio::test]
async fn test_each_report_is_a_single_attempt() {
    let hits = Hits::default();
    let router = Router::new()
        .route(
            STATUS_PATH,
            post(|State(hits): State<Hits>| async move {
                hits.record();
                StatusCode::SERVICE_UNAVAILABLE
            }),
        )
        .with_state(hits.clone());
    let base = spawn_backend(router).await;
    let reporter = reporter(&base, Duration::from_secs(1));

    assert!(!reporter.report_now(StatusReport::boot()).await);
    assert!(!reporter.report_now(StatusReport::boot()).await);
    assert_eq!(hits.count(), 2);
}
