//! Application setup: shared state and router composition.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::scheduler::Scheduler;
use crate::server::routes::{health, lei, resume, status, sync, version};

/// Shared application state, cheaply `Clone`d into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub scheduler: Arc<Scheduler>,
}

/// Build the axum application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/version", get(version::version_handler))
        .route("/sync/full", post(sync::sync_full_handler))
        .route("/sync/delta", post(sync::sync_delta_handler))
        .route("/status/:job_kind", get(status::status_handler))
        .route("/source-file/:id/resume", post(resume::resume_handler))
        .route("/lei", get(lei::list_lei_handler))
        .route("/lei/:identifier", get(lei::get_lei_handler))
        .route("/lei/:identifier/audit", get(lei::lei_audit_handler))
        .route("/lei-countries", get(lei::lei_countries_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
