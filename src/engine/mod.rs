//! Upsert/Audit Engine: turns decoded records into store mutations plus an
//! immutable audit trail (§4.4).

pub mod diff;
pub mod upsert;

pub use diff::diff_records;
pub use upsert::{upsert_batch, upsert_one, BatchOutcome, UpsertOutcome, BATCH_SIZE};
