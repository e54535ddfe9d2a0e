//! Scheduled, resumable ingestion pipeline syncing a local store with the
//! GLEIF LEI registry: discover and download published artifacts, stream
//! and upsert their records with a full audit trail, and expose a thin
//! HTTP surface to trigger and observe runs.

pub mod acquirer;
pub mod common;
pub mod config;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod streamer;

pub use config::Config;
pub use error::{CoreError, Result};
