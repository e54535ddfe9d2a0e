//! External Interface (§6): the thin HTTP-over-JSON surface that triggers
//! runs and exposes read access to the store. Trigger endpoints only ever
//! enqueue work and return immediately — the scheduler owns the actual run.

pub mod app;
pub mod error;
pub mod routes;

pub use app::{build_router, AppState};
