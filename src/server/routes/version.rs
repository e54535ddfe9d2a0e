//! `GET /version`: the crate's own build version.

use axum::Json;
use serde_json::{json, Value};

pub async fn version_handler() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}
