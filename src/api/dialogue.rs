//! Dialogue page, click trigger and status endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use tokio::sync::mpsc::error::TrySendError;

use super::ApiState;
use crate::runner::Status;

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Parley</title>
<style>
  body { font-family: sans-serif; display: flex; flex-direction: column; align-items: center; margin-top: 4rem; }
  button { font-size: 1.5rem; padding: 0.75rem 2rem; }
  #status { margin-top: 1.5rem; font-family: monospace; }
</style>
</head>
<body>
<button id="start" type="button">Click to start!</button>
<div id="status">connecting...</div>
<script>
  const label = document.getElementById("status");
  document.getElementById("start").addEventListener("click", () => {
    fetch("/api/click", { method: "POST" });
  });
  async function poll() {
    try {
      const res = await fetch("/api/status");
      const s = await res.json();
      label.textContent = `${s.state} (${s.view}) turns: ${s.turns}`;
    } catch (e) {
      label.textContent = "disconnected";
    }
  }
  setInterval(poll, 500);
  poll();
</script>
</body>
</html>
"#;

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Deliver one user click to the runner
async fn click(State(state): State<Arc<ApiState>>) -> StatusCode {
    match state.triggers.try_send(()) {
        Ok(()) => StatusCode::ACCEPTED,
        Err(TrySendError::Full(())) => {
            tracing::debug!("click already pending, ignoring");
            StatusCode::ACCEPTED
        }
        Err(TrySendError::Closed(())) => {
            tracing::warn!("click received but the dialogue has stopped");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<Status> {
    Json(state.status.borrow().clone())
}

/// Build the dialogue router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/click", post(click))
        .route("/api/status", get(status))
        .with_state(state)
}
