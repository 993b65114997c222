//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use parley::api::{ApiServer, ApiState};
use parley::runner::Status;
use parley::speech::SpeechView;
use tokio::sync::{mpsc, watch};
use tower::ServiceExt;

/// Build a test API router plus the runner ends of its channels
fn build_test_router() -> (axum::Router, mpsc::Receiver<()>, watch::Sender<Status>) {
    let (triggers, trigger_rx) = mpsc::channel(1);
    let (status_tx, status) = watch::channel(Status::default());
    let server = ApiServer::new(ApiState { triggers, status }, "127.0.0.1", 0);
    (server.router(), trigger_rx, status_tx)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (router, _rx, _status) = build_test_router();

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_index_serves_page_with_button() {
    let (router, _rx, _status) = build_test_router();

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("<button"));
    assert!(html.contains("/api/click"));
    assert!(html.contains("/api/status"));
}

#[tokio::test]
async fn test_click_sends_trigger() {
    let (router, mut rx, _status) = build_test_router();

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/click")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(rx.try_recv(), Ok(()));
}

#[tokio::test]
async fn test_click_after_runner_stopped() {
    let (router, rx, _status) = build_test_router();
    drop(rx);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/click")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_click_requires_post() {
    let (router, _rx, _status) = build_test_router();

    let response = router
        .oneshot(Request::builder().uri("/api/click").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_status_reflects_latest_update() {
    let (router, _rx, status) = build_test_router();

    status.send_replace(Status {
        state: "Main.Speaking",
        view: SpeechView::Speaking,
        turns: 2,
        latest_move: Some("completion_done"),
    });

    let response = router
        .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({
            "state": "Main.Speaking",
            "view": "speaking",
            "turns": 2,
            "latest_move": "completion_done"
        })
    );
}
