//! Source File: one acquired artifact and its processing lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "source_file_kind", rename_all = "lowercase")]
pub enum SourceFileKind {
    Full,
    Delta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "processing_status", rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "failure_category", rename_all = "snake_case")]
pub enum FailureCategory {
    SchemaError,
    NetworkError,
    FileCorruption,
    FileMissing,
    Timeout,
    Unknown,
}

impl FailureCategory {
    /// §4.4 state machine: only these categories are eligible for an
    /// automatic FAILED→PENDING retry transition.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureCategory::SchemaError | FailureCategory::NetworkError | FailureCategory::Unknown
        )
    }

    pub fn from_core_error(err: &CoreError) -> Option<Self> {
        match err.failure_category() {
            Some("SCHEMA_ERROR") => Some(FailureCategory::SchemaError),
            Some("NETWORK_ERROR") => Some(FailureCategory::NetworkError),
            Some("FILE_CORRUPTION") => Some(FailureCategory::FileCorruption),
            Some("FILE_MISSING") => Some(FailureCategory::FileMissing),
            Some("TIMEOUT") => Some(FailureCategory::Timeout),
            Some("UNKNOWN") => Some(FailureCategory::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourceFile {
    pub id: Uuid,
    pub name: String,
    pub kind: SourceFileKind,
    pub origin_url: String,
    pub size_bytes: i64,
    pub content_hash: String,
    pub downloaded_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub status: ProcessingStatus,
    pub total_count: i64,
    pub processed_count: i64,
    pub failed_count: i64,
    pub last_processed_identifier: String,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_ended_at: Option<DateTime<Utc>>,
    pub error_text: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub failure_category: Option<FailureCategory>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SourceFile {
    /// Look up a non-deleted FULL source file by its content hash, to
    /// implement the duplicate-artifact check in §4.2.
    pub async fn find_by_hash(hash: &str, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, SourceFile>(
            r#"SELECT * FROM source_files WHERE content_hash = $1 AND deleted_at IS NULL"#,
        )
        .bind(hash)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, SourceFile>(r#"SELECT * FROM source_files WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Create a new PENDING source file row.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        id: Uuid,
        name: &str,
        kind: SourceFileKind,
        origin_url: &str,
        size_bytes: i64,
        content_hash: &str,
        published_at: Option<DateTime<Utc>>,
        max_retries: i32,
        pool: &PgPool,
    ) -> Result<Self> {
        let row = sqlx::query_as::<_, SourceFile>(
            r#"
            INSERT INTO source_files
                (id, name, kind, origin_url, size_bytes, content_hash, published_at, max_retries)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(kind)
        .bind(origin_url)
        .bind(size_bytes)
        .bind(content_hash)
        .bind(published_at)
        .bind(max_retries)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Transition PENDING/FAILED → IN_PROGRESS, optionally resuming from a
    /// previously recorded checkpoint.
    pub async fn mark_in_progress(id: Uuid, pool: &PgPool) -> Result<Self> {
        let row = sqlx::query_as::<_, SourceFile>(
            r#"
            UPDATE source_files
            SET status = 'in_progress', processing_started_at = now(), error_text = NULL
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Checkpoint the running counters and last-processed identifier.
    /// Called every N records and at end of stream (§4.3).
    pub async fn checkpoint(
        id: Uuid,
        total_count: i64,
        processed_count: i64,
        failed_count: i64,
        last_processed_identifier: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        let row = sqlx::query_as::<_, SourceFile>(
            r#"
            UPDATE source_files
            SET total_count = $2,
                processed_count = $3,
                failed_count = $4,
                last_processed_identifier = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(total_count)
        .bind(processed_count)
        .bind(failed_count)
        .bind(last_processed_identifier)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn mark_completed(id: Uuid, pool: &PgPool) -> Result<Self> {
        let row = sqlx::query_as::<_, SourceFile>(
            r#"
            UPDATE source_files
            SET status = 'completed', processing_ended_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Mark FAILED with a category and error text, incrementing retry_count.
    pub async fn mark_failed(
        id: Uuid,
        category: FailureCategory,
        error_text: &str,
        pool: &PgPool,
    ) -> Result<Self> {
        let row = sqlx::query_as::<_, SourceFile>(
            r#"
            UPDATE source_files
            SET status = 'failed',
                failure_category = $2,
                error_text = $3,
                processing_ended_at = now(),
                retry_count = retry_count + 1
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(category)
        .bind(error_text)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Reset a retry-eligible FAILED file back to PENDING (§4.4 state
    /// machine). Returns `None` if the file is not eligible (either not
    /// FAILED, retry_count exhausted, or category is permanent).
    pub async fn reset_for_retry(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, SourceFile>(
            r#"
            UPDATE source_files
            SET status = 'pending', error_text = NULL
            WHERE id = $1
              AND status = 'failed'
              AND retry_count < max_retries
              AND failure_category IN ('schema_error', 'network_error', 'unknown')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Files currently PENDING or IN_PROGRESS (delta worker's initial-run
    /// scan, §4.1).
    pub async fn find_incomplete(pool: &PgPool) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, SourceFile>(
            r#"
            SELECT * FROM source_files
            WHERE status IN ('pending', 'in_progress') AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// FAILED files eligible for an automatic retry.
    pub async fn find_retryable(pool: &PgPool) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, SourceFile>(
            r#"
            SELECT * FROM source_files
            WHERE status = 'failed'
              AND retry_count < max_retries
              AND failure_category IN ('schema_error', 'network_error', 'unknown')
              AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Transition a PENDING file older than `older_than` to FAILED/TIMEOUT.
    pub async fn timeout_stale_pending(older_than: DateTime<Utc>, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE source_files
            SET status = 'failed',
                failure_category = 'timeout',
                error_text = 'pending longer than 24h',
                processing_ended_at = now()
            WHERE status = 'pending' AND created_at < $1 AND deleted_at IS NULL
            "#,
        )
        .bind(older_than)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Archive files on disk beyond the retention policy, ordered by
    /// download recency, for a given kind. Returns the rows beyond the
    /// retained count (most recent first retained).
    pub async fn find_beyond_retention(
        kind: SourceFileKind,
        keep: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, SourceFile>(
            r#"
            SELECT * FROM source_files
            WHERE kind = $1 AND deleted_at IS NULL
            ORDER BY downloaded_at DESC
            OFFSET $2
            "#,
        )
        .bind(kind)
        .bind(keep)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

}
