//! `POST /sync/full`, `POST /sync/delta`: enqueue a run and return
//! immediately (§6) — the scheduler owns the actual work.

use axum::extract::State;
use axum::http::StatusCode;

use crate::server::app::AppState;

pub async fn sync_full_handler(State(state): State<AppState>) -> StatusCode {
    tokio::spawn(async move {
        if let Err(e) = state.scheduler.run_full().await {
            tracing::error!(error = %e, "triggered full run failed");
        }
    });
    StatusCode::ACCEPTED
}

pub async fn sync_delta_handler(State(state): State<AppState>) -> StatusCode {
    tokio::spawn(async move {
        if let Err(e) = state.scheduler.run_delta().await {
            tracing::error!(error = %e, "triggered delta run failed");
        }
    });
    StatusCode::ACCEPTED
}
