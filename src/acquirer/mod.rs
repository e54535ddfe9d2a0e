//! File Acquirer: discover, download, verify, and extract published
//! artifacts, and create the Source File rows that record them.

pub mod discovery;
pub mod download;
pub mod extract;

use std::path::PathBuf;

use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

pub use discovery::DeltaWindow;
use discovery::{discover, DiscoveryDocument};
use download::{artifact_path, download_and_hash};
pub use extract::ExtractedFile;
use extract::extract_first_json_member;

use crate::error::{CoreError, Result};
use crate::store::{SourceFile, SourceFileKind};

#[derive(Debug, Clone)]
pub struct AcquirerConfig {
    pub data_dir: PathBuf,
    pub discovery_endpoint_url: String,
    pub delta_window: DeltaWindow,
    pub max_retries: i32,
}

pub struct Acquirer {
    client: reqwest::Client,
    config: AcquirerConfig,
}

/// Outcome of acquiring one artifact.
pub enum AcquireOutcome {
    /// A new Source File row was created and is ready to stream.
    Created(SourceFile),
    /// The downloaded content hashes to an existing non-deleted Source File
    /// — the run short-circuits to COMPLETED with no new work (§4.2, §7).
    Duplicate,
}

impl Acquirer {
    pub fn new(config: AcquirerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Run discovery, download, hash, and create the Source File row for a
    /// full or delta refresh.
    #[instrument(skip(self, pool))]
    pub async fn acquire(&self, kind: SourceFileKind, pool: &PgPool) -> Result<AcquireOutcome> {
        let doc = self.discover().await?;
        let artifact = match kind {
            SourceFileKind::Full => doc.full_artifact()?,
            SourceFileKind::Delta => doc.delta_artifact(self.config.delta_window)?,
        };

        std::fs::create_dir_all(&self.config.data_dir)
            .map_err(|e| CoreError::Unknown(format!("failed to create data dir: {e}")))?;
        let dest = artifact_path(&self.config.data_dir, kind);

        let outcome = download_and_hash(&self.client, &artifact.url, &dest).await?;

        if let Some(existing) = SourceFile::find_by_hash(&outcome.content_hash, pool).await? {
            tracing::info!(
                existing_id = %existing.id,
                "downloaded artifact is a duplicate of an existing source file"
            );
            // The archive we just wrote is redundant; remove it, but never
            // touch a previously retained archive.
            let _ = std::fs::remove_file(&dest);
            return Ok(AcquireOutcome::Duplicate);
        }

        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let source_file = SourceFile::create(
            Uuid::new_v4(),
            &name,
            kind,
            &artifact.url,
            outcome.size_bytes,
            &outcome.content_hash,
            artifact.publish_date,
            self.config.max_retries,
            pool,
        )
        .await?;

        Ok(AcquireOutcome::Created(source_file))
    }

    async fn discover(&self) -> Result<DiscoveryDocument> {
        discover(&self.client, &self.config.discovery_endpoint_url).await
    }

    /// Extract the JSON payload of a previously acquired archive, keyed by
    /// its on-disk path.
    pub fn extract(&self, archive_path: &std::path::Path) -> Result<ExtractedFile> {
        extract_first_json_member(archive_path)
    }
}

/// Categorize a core error into the Source File `failure_category`
/// vocabulary, used by the scheduler when writing a failed acquisition.
pub fn categorize_acquirer_failure(err: &CoreError) -> crate::store::FailureCategory {
    crate::store::FailureCategory::from_core_error(err)
        .unwrap_or(crate::store::FailureCategory::Unknown)
}

