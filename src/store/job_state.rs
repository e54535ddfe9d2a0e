//! Job State: one row per job kind (DAILY_FULL, DAILY_DELTA).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_kind", rename_all = "snake_case")]
pub enum JobKind {
    DailyFull,
    DailyDelta,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::DailyFull => "DAILY_FULL",
            JobKind::DailyDelta => "DAILY_DELTA",
        }
    }

    pub fn from_path_segment(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY_FULL" => Some(JobKind::DailyFull),
            "DAILY_DELTA" => Some(JobKind::DailyDelta),
            _ => None,
        }
    }

    pub fn other(&self) -> JobKind {
        match self {
            JobKind::DailyFull => JobKind::DailyDelta,
            JobKind::DailyDelta => JobKind::DailyFull,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobState {
    pub job_kind: JobKind,
    pub status: JobStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub current_source_file: Option<Uuid>,
    pub last_error: Option<String>,
}

impl JobState {
    /// Fetch the row for a job kind, creating an IDLE row if absent.
    pub async fn get_or_create(kind: JobKind, pool: &PgPool) -> Result<Self> {
        let row = sqlx::query_as::<_, JobState>(
            r#"
            INSERT INTO job_states (job_kind)
            VALUES ($1)
            ON CONFLICT (job_kind) DO NOTHING
            "#,
        )
        .bind(kind)
        .execute(pool)
        .await;
        // Ignore insert result (it may have conflicted); always re-fetch.
        let _ = row;

        let fetched = sqlx::query_as::<_, JobState>(
            r#"SELECT * FROM job_states WHERE job_kind = $1"#,
        )
        .bind(kind)
        .fetch_one(pool)
        .await?;
        Ok(fetched)
    }

    /// Point the already-RUNNING row at the Source File being processed,
    /// once it's known (the initial claim in `try_start_exclusive` uses a
    /// placeholder id since the file isn't acquired yet).
    pub async fn set_current_source_file(kind: JobKind, source_file_id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"UPDATE job_states SET current_source_file = $2 WHERE job_kind = $1"#,
        )
        .bind(kind)
        .bind(source_file_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Atomically check the *opposite* kind isn't RUNNING and claim RUNNING
    /// for `kind`, within one transaction that locks both rows in a fixed
    /// order (DAILY_FULL, then DAILY_DELTA) regardless of which kind is
    /// claiming — checking the other row and claiming this one as two
    /// separate round trips would leave a race open, and the fixed lock
    /// order rules out a deadlock between a full and a delta claim racing
    /// each other.
    pub async fn try_start_exclusive(
        kind: JobKind,
        source_file_id: Uuid,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let mut tx = pool.begin().await?;

        for locked_kind in [JobKind::DailyFull, JobKind::DailyDelta] {
            sqlx::query(r#"SELECT 1 FROM job_states WHERE job_kind = $1 FOR UPDATE"#)
                .bind(locked_kind)
                .fetch_optional(&mut *tx)
                .await?;
        }

        let other_status: Option<(JobStatus,)> =
            sqlx::query_as(r#"SELECT status FROM job_states WHERE job_kind = $1"#)
                .bind(kind.other())
                .fetch_optional(&mut *tx)
                .await?;
        if matches!(other_status, Some((JobStatus::Running,))) {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, JobState>(
            r#"
            UPDATE job_states
            SET status = 'running', current_source_file = $2, last_run_at = now(), last_error = NULL
            WHERE job_kind = $1 AND status != 'running'
            RETURNING *
            "#,
        )
        .bind(kind)
        .bind(source_file_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await.map_err(CoreError::from)?;
        Ok(row)
    }

    pub async fn mark_completed(kind: JobKind, pool: &PgPool) -> Result<Self> {
        let row = sqlx::query_as::<_, JobState>(
            r#"
            UPDATE job_states
            SET status = 'completed', current_source_file = NULL, last_success_at = now(), last_error = NULL
            WHERE job_kind = $1
            RETURNING *
            "#,
        )
        .bind(kind)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    pub async fn mark_failed(kind: JobKind, error: &str, pool: &PgPool) -> Result<Self> {
        let row = sqlx::query_as::<_, JobState>(
            r#"
            UPDATE job_states
            SET status = 'failed', current_source_file = NULL, last_error = $2
            WHERE job_kind = $1
            RETURNING *
            "#,
        )
        .bind(kind)
        .bind(error)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Crash-recovery sweep (§4.1): any row left RUNNING from a previous
    /// process lifetime is forced back to IDLE with a marker error.
    pub async fn recover_stale_running(pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE job_states
            SET status = 'idle', current_source_file = NULL, last_error = 'previous run was interrupted'
            WHERE status = 'running'
            "#,
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find(kind: JobKind, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, JobState>(r#"SELECT * FROM job_states WHERE job_kind = $1"#)
            .bind(kind)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }
}
