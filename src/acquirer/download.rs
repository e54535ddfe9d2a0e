//! Streamed download with concurrent SHA-256 hashing and on-disk naming.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{CoreError, Result};
use crate::store::SourceFileKind;

/// No bytes received for this long during a download → NETWORK_ERROR.
const STALL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct DownloadOutcome {
    pub path: PathBuf,
    pub size_bytes: i64,
    /// Lowercase hex-encoded SHA-256 digest.
    pub content_hash: String,
}

/// Build the on-disk name for a newly downloaded artifact: never overwrites
/// an existing file (§4.2 "On-disk naming").
pub fn artifact_path(data_dir: &Path, kind: SourceFileKind) -> PathBuf {
    let kind_label = match kind {
        SourceFileKind::Full => "FULL",
        SourceFileKind::Delta => "DELTA",
    };
    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    data_dir.join(format!("lei-{kind_label}-{timestamp}.json.zip"))
}

/// Stream `url`'s body to `dest` while hashing it, failing the download if
/// no bytes arrive within `STALL_TIMEOUT`.
pub async fn download_and_hash(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<DownloadOutcome> {
    if dest.exists() {
        return Err(CoreError::Unknown(format!(
            "refusing to overwrite existing file {}",
            dest.display()
        )));
    }

    let response = client.get(url).send().await.map_err(CoreError::from)?;
    if !response.status().is_success() {
        return Err(CoreError::Transient(format!(
            "download returned status {}",
            response.status()
        )));
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| CoreError::Unknown(format!("failed to create {}: {e}", dest.display())))?;

    let mut hasher = Sha256::new();
    let mut size_bytes: i64 = 0;
    let mut stream = response.bytes_stream();

    loop {
        let next = tokio::time::timeout(STALL_TIMEOUT, stream.next()).await;
        let chunk = match next {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => return Err(CoreError::from(e)),
            Ok(None) => break,
            Err(_) => {
                return Err(CoreError::Transient(format!(
                    "no bytes received for {}s, stall timeout",
                    STALL_TIMEOUT.as_secs()
                )))
            }
        };

        hasher.update(&chunk);
        size_bytes += chunk.len() as i64;
        file.write_all(&chunk)
            .await
            .map_err(|e| CoreError::Unknown(format!("write failed: {e}")))?;
    }

    file.flush()
        .await
        .map_err(|e| CoreError::Unknown(format!("flush failed: {e}")))?;

    let content_hash = hex::encode(hasher.finalize());

    Ok(DownloadOutcome {
        path: dest.to_path_buf(),
        size_bytes,
        content_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_path_uses_kind_label_and_never_collides_across_kinds() {
        let dir = Path::new("/tmp/lei-sync-test");
        let full = artifact_path(dir, SourceFileKind::Full);
        let delta = artifact_path(dir, SourceFileKind::Delta);
        assert!(full.to_string_lossy().contains("lei-FULL-"));
        assert!(delta.to_string_lossy().contains("lei-DELTA-"));
        assert!(full.to_string_lossy().ends_with(".json.zip"));
    }
}
