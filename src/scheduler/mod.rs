//! Scheduler/Coordinator: drives the three long-lived workers (delta, full,
//! cleanup), owns Job State transitions, and provides the synchronous
//! `run_*` entry points the external interface calls into directly.

pub mod config;
pub mod retention;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use config::SchedulerConfig;
pub use retention::{RetentionCandidate, RetentionPolicy, RetentionReport};

use crate::acquirer::{AcquireOutcome, Acquirer};
use crate::engine::{upsert_batch, BATCH_SIZE};
use crate::error::Result;
use crate::store::{JobKind, JobState, LeiRecord, SourceFile, SourceFileKind};
use crate::streamer::{stream_records, StreamItem, CHECKPOINT_INTERVAL};

const SYSTEM_ACTOR: &str = "system";
const STALE_PENDING_AGE: ChronoDuration = ChronoDuration::hours(24);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Duplicate,
    AlreadyBusy,
}

pub struct Scheduler {
    pool: PgPool,
    acquirer: Arc<Acquirer>,
    data_dir: PathBuf,
    config: SchedulerConfig,
    cancellation: CancellationToken,
}

impl Scheduler {
    pub fn new(pool: PgPool, acquirer: Acquirer, data_dir: PathBuf, config: SchedulerConfig) -> Self {
        Self {
            pool,
            acquirer: Arc::new(acquirer),
            data_dir,
            config,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Run the crash-recovery sweep, then launch the three cooperative
    /// workers. Idempotent — callers that invoke `start()` twice on workers
    /// already running just get a second set of loops racing on the same
    /// Job State rows, which is harmless since `try_start_exclusive` is the
    /// real mutual-exclusion boundary; in practice the binary calls this once.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let recovered = JobState::recover_stale_running(&self.pool).await?;
        if recovered > 0 {
            tracing::warn!(recovered, "crash-recovery sweep reset stale RUNNING job states");
        }

        self.spawn_delta_worker();
        self.spawn_full_worker();
        self.spawn_cleanup_worker();
        Ok(())
    }

    pub fn stop(&self) {
        self.cancellation.cancel();
    }

    fn spawn_delta_worker(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.delta_worker_loop().await;
        });
    }

    fn spawn_full_worker(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.full_worker_loop().await;
        });
    }

    fn spawn_cleanup_worker(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.cleanup_worker_loop().await;
        });
    }

    /// §4.1 delta worker initial-run policy, then the periodic tick.
    async fn delta_worker_loop(&self) {
        if let Err(e) = self.delta_initial_run().await {
            tracing::error!(error = %e, "delta worker initial run failed");
        }

        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => return,
                _ = tokio::time::sleep(self.config.delta_interval) => {
                    if let Err(e) = self.run_delta().await {
                        tracing::error!(error = %e, "delta tick failed");
                    }
                }
            }
        }
    }

    async fn delta_initial_run(&self) -> Result<()> {
        for file in SourceFile::find_retryable(&self.pool).await? {
            if let Some(reset) = SourceFile::reset_for_retry(file.id, &self.pool).await? {
                if let Err(e) = self.resume_source_file(&reset).await {
                    tracing::warn!(source_file_id = %reset.id, error = %e, "retry of failed source file did not complete");
                }
            }
        }

        let timed_out = SourceFile::timeout_stale_pending(Utc::now() - STALE_PENDING_AGE, &self.pool).await?;
        if timed_out > 0 {
            tracing::warn!(timed_out, "pending source files older than 24h marked FAILED/TIMEOUT");
        }

        for file in SourceFile::find_incomplete(&self.pool).await? {
            if let Err(e) = self.resume_source_file(&file).await {
                tracing::warn!(source_file_id = %file.id, error = %e, "resume of incomplete source file did not complete");
            }
        }

        let store_is_empty = LeiRecord::distinct_countries(&self.pool).await?.is_empty();
        let nothing_incomplete = SourceFile::find_incomplete(&self.pool).await?.is_empty();
        if store_is_empty && nothing_incomplete {
            self.run_full().await?;
        } else {
            self.run_delta().await?;
        }
        Ok(())
    }

    async fn full_worker_loop(&self) {
        loop {
            let sleep_for = next_occurrence_of_weekday_time(
                &self.config.timezone,
                self.config.full_day,
                self.config.full_time,
            );
            tokio::select! {
                _ = self.cancellation.cancelled() => return,
                _ = tokio::time::sleep(sleep_for) => {
                    if let Err(e) = self.run_full().await {
                        tracing::error!(error = %e, "full worker run failed");
                    }
                }
            }
        }
    }

    async fn cleanup_worker_loop(&self) {
        loop {
            let sleep_for = next_occurrence_of_daily_time(&self.config.timezone, self.config.cleanup_time);
            tokio::select! {
                _ = self.cancellation.cancelled() => return,
                _ = tokio::time::sleep(sleep_for) => {
                    if let Err(e) = self.run_cleanup().await {
                        tracing::error!(error = %e, "cleanup worker run failed");
                    }
                }
            }
        }
    }

    pub async fn run_full(&self) -> Result<RunOutcome> {
        self.run_kind(JobKind::DailyFull, SourceFileKind::Full).await
    }

    pub async fn run_delta(&self) -> Result<RunOutcome> {
        self.run_kind(JobKind::DailyDelta, SourceFileKind::Delta).await
    }

    async fn run_kind(&self, job_kind: JobKind, file_kind: SourceFileKind) -> Result<RunOutcome> {
        JobState::get_or_create(job_kind, &self.pool).await?;
        JobState::get_or_create(job_kind.other(), &self.pool).await?;

        let placeholder = Uuid::new_v4();
        let Some(_claimed) = JobState::try_start_exclusive(job_kind, placeholder, &self.pool).await? else {
            return Ok(RunOutcome::AlreadyBusy);
        };

        let outcome = self.acquirer.acquire(file_kind, &self.pool).await;
        let outcome = match outcome {
            Ok(AcquireOutcome::Duplicate) => {
                JobState::mark_completed(job_kind, &self.pool).await?;
                Ok(RunOutcome::Duplicate)
            }
            Ok(AcquireOutcome::Created(source_file)) => {
                JobState::set_current_source_file(job_kind, source_file.id, &self.pool).await?;
                match self.process_source_file(&source_file).await {
                    Ok(()) => {
                        JobState::mark_completed(job_kind, &self.pool).await?;
                        Ok(RunOutcome::Completed)
                    }
                    Err(e) => {
                        let category = crate::acquirer::categorize_acquirer_failure(&e);
                        SourceFile::mark_failed(source_file.id, category, &e.to_string(), &self.pool).await?;
                        JobState::mark_failed(job_kind, &e.to_string(), &self.pool).await?;
                        Err(e)
                    }
                }
            }
            Err(e) => {
                JobState::mark_failed(job_kind, &e.to_string(), &self.pool).await?;
                Err(e)
            }
        };
        outcome
    }

    /// Reprocess a specific, already-acquired Source File from its
    /// checkpoint — used by both the delta worker's initial-run policy and
    /// the `POST /source-file/{id}/resume` external endpoint.
    pub async fn resume_source_file(&self, source_file: &SourceFile) -> Result<()> {
        match self.process_source_file(source_file).await {
            Ok(()) => {
                SourceFile::mark_completed(source_file.id, &self.pool).await?;
                Ok(())
            }
            Err(e) => {
                let category = crate::acquirer::categorize_acquirer_failure(&e);
                SourceFile::mark_failed(source_file.id, category, &e.to_string(), &self.pool).await?;
                Err(e)
            }
        }
    }

    async fn process_source_file(&self, source_file: &SourceFile) -> Result<()> {
        let archive_path = self.data_dir.join(&source_file.name);
        let extracted = self.acquirer.extract(&archive_path)?;

        SourceFile::mark_in_progress(source_file.id, &self.pool).await?;

        let resume_after = if source_file.last_processed_identifier.is_empty() {
            None
        } else {
            Some(source_file.last_processed_identifier.clone())
        };

        let mut rx = stream_records(extracted.path().to_path_buf(), source_file.id, resume_after).await;

        // `total` comes straight from the scan's running count (the scan
        // always walks the whole array, so it's authoritative even on a
        // resumed attempt); `processed`/`failed` accumulate on top of what a
        // prior, interrupted attempt already committed, since elements
        // skipped for resume never reach this loop at all.
        let mut total = source_file.total_count;
        let mut new_processed = 0i64;
        let mut new_failed = 0i64;
        let mut last_identifier = source_file.last_processed_identifier.clone();
        let mut pending_batch: Vec<LeiRecord> = Vec::new();
        let mut since_checkpoint = 0i64;
        let mut fatal: Option<crate::error::CoreError> = None;

        while let Some((item, progress)) = rx.recv().await {
            total = progress.total_count;
            if let Some(id) = &progress.last_identifier {
                last_identifier = id.clone();
            }

            match item {
                StreamItem::Record(record) => {
                    pending_batch.push(*record);
                    new_processed += 1;
                    if pending_batch.len() >= BATCH_SIZE {
                        let batch = std::mem::take(&mut pending_batch);
                        upsert_batch(batch, SYSTEM_ACTOR, &self.pool).await?;
                    }
                }
                StreamItem::Malformed(e) => {
                    new_failed += 1;
                    tracing::warn!(error = %e, "record failed to decode, continuing");
                }
                StreamItem::Fatal(e) => {
                    fatal = Some(e);
                    break;
                }
            }

            since_checkpoint += 1;
            if since_checkpoint >= CHECKPOINT_INTERVAL {
                let processed = source_file.processed_count + new_processed;
                let failed = source_file.failed_count + new_failed;
                SourceFile::checkpoint(source_file.id, total, processed, failed, &last_identifier, &self.pool).await?;
                since_checkpoint = 0;
            }
        }

        if !pending_batch.is_empty() {
            upsert_batch(pending_batch, SYSTEM_ACTOR, &self.pool).await?;
        }

        let processed = source_file.processed_count + new_processed;
        let failed = source_file.failed_count + new_failed;
        SourceFile::checkpoint(source_file.id, total, processed, failed, &last_identifier, &self.pool).await?;

        if let Some(e) = fatal {
            return Err(e);
        }
        Ok(())
    }

    pub async fn run_cleanup(&self) -> Result<RetentionReport> {
        let policy = RetentionPolicy {
            keep_full: self.config.keep_full,
            keep_delta: self.config.keep_delta,
        };

        let mut candidates = Vec::new();
        for kind in [SourceFileKind::Full, SourceFileKind::Delta] {
            for file in SourceFile::find_beyond_retention(kind, 0, &self.pool).await? {
                candidates.push(RetentionCandidate {
                    kind,
                    downloaded_at: file.downloaded_at,
                    path: self.data_dir.join(&file.name),
                });
            }
        }

        let report = retention::select_files_to_delete(&candidates, &policy);
        for path in &report.deleted {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove retired archive");
            }
        }
        Ok(report)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Next moment, in `tz`, that falls on `weekday` at `time` (hour, minute).
/// If today already matches and the time hasn't passed, returns that;
/// otherwise the next matching day.
fn next_occurrence_of_weekday_time(
    tz: &chrono_tz::Tz,
    weekday: chrono::Weekday,
    time: (u32, u32),
) -> std::time::Duration {
    let now = tz.from_utc_datetime(&Utc::now().naive_utc());
    let target_time = NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap_or_else(|| NaiveTime::from_hms_opt(2, 0, 0).unwrap());

    let mut candidate_date = now.date_naive();
    loop {
        if candidate_date.weekday() == weekday {
            let candidate = tz
                .from_local_datetime(&candidate_date.and_time(target_time))
                .single();
            if let Some(candidate) = candidate {
                if candidate > now {
                    return to_std_duration(candidate - now);
                }
            }
        }
        candidate_date += ChronoDuration::days(1);
    }
}

fn next_occurrence_of_daily_time(tz: &chrono_tz::Tz, time: (u32, u32)) -> std::time::Duration {
    let now = tz.from_utc_datetime(&Utc::now().naive_utc());
    let target_time = NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap_or_else(|| NaiveTime::from_hms_opt(3, 0, 0).unwrap());

    for offset in 0..2 {
        let candidate_date = now.date_naive() + ChronoDuration::days(offset);
        if let Some(candidate) = tz.from_local_datetime(&candidate_date.and_time(target_time)).single() {
            if candidate > now {
                return to_std_duration(candidate - now);
            }
        }
    }
    std::time::Duration::from_secs(24 * 3600)
}

fn to_std_duration(d: ChronoDuration) -> std::time::Duration {
    d.to_std().unwrap_or(std::time::Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn next_weekday_occurrence_is_in_the_future_and_within_a_week() {
        let duration = next_occurrence_of_weekday_time(&chrono_tz::UTC, Weekday::Sun, (2, 0));
        assert!(duration.as_secs() > 0);
        assert!(duration.as_secs() <= 7 * 24 * 3600);
    }

    #[test]
    fn next_daily_occurrence_is_within_a_day() {
        let duration = next_occurrence_of_daily_time(&chrono_tz::UTC, (3, 0));
        assert!(duration.as_secs() > 0);
        assert!(duration.as_secs() <= 24 * 3600);
    }
}
