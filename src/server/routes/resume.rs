//! `POST /source-file/{id}/resume`: reprocess a specific Source File from
//! its checkpoint; 202 immediately, the actual work runs in the background.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::server::app::AppState;
use crate::store::SourceFile;

pub async fn resume_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let source_file = SourceFile::find_by_id(id, &state.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("no source file with id {id}")))?;

    tokio::spawn(async move {
        if let Err(e) = state.scheduler.resume_source_file(&source_file).await {
            tracing::error!(source_file_id = %source_file.id, error = %e, "triggered resume did not complete");
        }
    });

    Ok(StatusCode::ACCEPTED)
}
