//! `GET /lei`, `GET /lei/{identifier}`, `GET /lei/{identifier}/audit`,
//! `GET /lei-countries`: the read surface over the LEI store.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::common::pagination::LeiListQuery;
use crate::error::{CoreError, Result};
use crate::server::app::AppState;
use crate::store::{LeiAuditEntry, LeiRecord};

pub async fn list_lei_handler(
    State(state): State<AppState>,
    Query(query): Query<LeiListQuery>,
) -> Result<Json<Vec<LeiRecord>>> {
    let filter = query.validate()?;
    let records = LeiRecord::list(&filter, &state.pool).await?;
    Ok(Json(records))
}

pub async fn get_lei_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<LeiRecord>> {
    let record = LeiRecord::find_by_lei(&identifier, &state.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("no LEI record for {identifier}")))?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    limit: Option<i64>,
}

const DEFAULT_AUDIT_LIMIT: i64 = 50;
const MAX_AUDIT_LIMIT: i64 = 500;

pub async fn lei_audit_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<LeiAuditEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    if !(1..=MAX_AUDIT_LIMIT).contains(&limit) {
        return Err(CoreError::InvalidInput(format!(
            "limit must be between 1 and {MAX_AUDIT_LIMIT}, got {limit}"
        )));
    }

    let entries = LeiAuditEntry::find_for_lei(&identifier, limit, &state.pool).await?;
    Ok(Json(entries))
}

pub async fn lei_countries_handler(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let countries = LeiRecord::distinct_countries(&state.pool).await?;
    Ok(Json(countries))
}
