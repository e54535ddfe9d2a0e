//! Record Streamer: read one Source File's extracted JSON payload and hand
//! back each decoded `LeiRecord` as it is read off disk, without ever
//! holding the whole array in memory (§4.3).
//!
//! The scan itself is synchronous (`std::io::Read`), so it runs on a
//! blocking thread and forwards decoded items to the async caller over a
//! bounded channel — the same shape the acquirer uses for I/O-bound work,
//! but here the bound also provides natural backpressure against a slow
//! database writer.

pub mod date;
pub mod model;
pub mod scan;

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::store::LeiRecord;
pub use model::RawLeiEntry;
use scan::{seek_to_array, ArrayElementReader};

const TOP_LEVEL_ARRAY_KEY: &str = "records";
pub const CHECKPOINT_INTERVAL: i64 = 1000;

/// One decoded element handed back to the caller.
pub enum StreamItem {
    Record(Box<LeiRecord>),
    /// An individual element failed to decode. The run continues; the
    /// caller counts this against `failed_count` (§4.3: one bad record does
    /// not abort the whole file).
    Malformed(CoreError),
    /// The scan itself failed (unexpected token, truncated archive, missing
    /// `records` key). Always the last message before the channel closes;
    /// the caller aborts the run and preserves the checkpoint (§4.3).
    Fatal(CoreError),
}

/// Running totals reported alongside every item so the caller can decide
/// when to checkpoint (every 1000 records and at end of stream, §4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamProgress {
    pub total_count: i64,
    pub processed_count: i64,
    pub failed_count: i64,
    pub last_identifier: Option<String>,
}

/// Begin streaming `path`'s `records` array, skipping elements up to but not
/// including `resume_after` (the Source File's `last_processed_identifier`
/// from a prior, interrupted run) — normal processing resumes at that
/// record and continues for every record after it. Returns a channel the
/// caller reads until it closes; a fatal scan error (missing key, truncated
/// JSON) arrives as the final message before the channel closes.
pub async fn stream_records(
    path: PathBuf,
    source_file_id: Uuid,
    resume_after: Option<String>,
) -> mpsc::Receiver<(StreamItem, StreamProgress)> {
    let (tx, rx) = mpsc::channel(64);

    tokio::task::spawn_blocking(move || {
        if let Err(e) = run_scan(&path, source_file_id, resume_after, &tx) {
            let _ = tx.blocking_send((StreamItem::Fatal(e), StreamProgress::default()));
        }
    });

    rx
}

fn run_scan(
    path: &Path,
    source_file_id: Uuid,
    resume_after: Option<String>,
    tx: &mpsc::Sender<(StreamItem, StreamProgress)>,
) -> Result<()> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| CoreError::DataFormat(format!("cannot open extracted payload: {e}")))?;
    seek_to_array(&mut file, TOP_LEVEL_ARRAY_KEY)?;

    let mut reader = ArrayElementReader::new(&mut file);
    let mut progress = StreamProgress::default();
    let mut skipping = resume_after.is_some();

    while let Some(raw) = reader.next_element()? {
        progress.total_count += 1;

        let identifier = peek_identifier(&raw);

        if skipping {
            if identifier.as_deref() == resume_after.as_deref() {
                skipping = false;
            } else {
                continue;
            }
        }

        match serde_json::from_slice::<RawLeiEntry>(&raw) {
            Ok(entry) => {
                progress.last_identifier = Some(entry.identifier().to_string());
                match entry.into_record(source_file_id) {
                    Ok(record) => {
                        progress.processed_count += 1;
                        if tx
                            .blocking_send((StreamItem::Record(Box::new(record)), progress))
                            .is_err()
                        {
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        progress.failed_count += 1;
                        if tx.blocking_send((StreamItem::Malformed(e), progress)).is_err() {
                            return Ok(());
                        }
                    }
                }
            }
            Err(e) => {
                progress.failed_count += 1;
                let err = CoreError::DataFormat(format!("malformed record element: {e}"));
                if tx.blocking_send((StreamItem::Malformed(err), progress)).is_err() {
                    return Ok(());
                }
            }
        }
    }

    Ok(())
}

/// Best-effort extraction of the `LEI.$` value from a raw element, used only
/// to detect the resume boundary without fully decoding every skipped
/// element.
fn peek_identifier(raw: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(raw).ok()?;
    value.get("LEI")?.get("$")?.as_str().map(str::to_string)
}
