//! `GET /status/{job_kind}`: the Job State row for a kind; 404 if unknown.

use axum::extract::{Path, State};
use axum::Json;

use crate::error::{CoreError, Result};
use crate::server::app::AppState;
use crate::store::{JobKind, JobState};

pub async fn status_handler(
    State(state): State<AppState>,
    Path(job_kind): Path<String>,
) -> Result<Json<JobState>> {
    let kind = JobKind::from_path_segment(&job_kind)
        .ok_or_else(|| CoreError::NotFound(format!("unknown job kind: {job_kind}")))?;

    let job_state = JobState::find(kind, &state.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("no job state recorded for {job_kind}")))?;

    Ok(Json(job_state))
}
