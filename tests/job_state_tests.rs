//! Job State overlap prevention and crash recovery (§5, §8 scenario 6).
//!
//! `job_states` has exactly one row per job kind, so every scenario below
//! runs as a single sequential test rather than independent `#[tokio::test]`
//! functions — concurrent tests would otherwise race on the same two rows.

mod common;

use common::harness::test_pool;
use lei_sync_core::store::{JobKind, JobState, JobStatus};
use uuid::Uuid;

#[tokio::test]
async fn overlap_prevention_and_crash_recovery() {
    let pool = test_pool().await;
    JobState::get_or_create(JobKind::DailyFull, &pool).await.unwrap();
    JobState::get_or_create(JobKind::DailyDelta, &pool).await.unwrap();

    // Scenario 6: a RUNNING full job blocks a concurrent delta claim.
    let claimed = JobState::try_start_exclusive(JobKind::DailyFull, Uuid::new_v4(), &pool)
        .await
        .unwrap();
    assert!(claimed.is_some());

    let blocked = JobState::try_start_exclusive(JobKind::DailyDelta, Uuid::new_v4(), &pool)
        .await
        .unwrap();
    assert!(blocked.is_none(), "delta claim must be rejected while full is running");

    let delta_state = JobState::find(JobKind::DailyDelta, &pool).await.unwrap().unwrap();
    assert_eq!(delta_state.status, JobStatus::Idle);

    // A kind cannot reclaim itself while already running.
    let self_reclaim = JobState::try_start_exclusive(JobKind::DailyFull, Uuid::new_v4(), &pool)
        .await
        .unwrap();
    assert!(self_reclaim.is_none());

    // Once full completes, delta may claim.
    JobState::mark_completed(JobKind::DailyFull, &pool).await.unwrap();
    let reclaimed = JobState::try_start_exclusive(JobKind::DailyDelta, Uuid::new_v4(), &pool)
        .await
        .unwrap();
    assert!(reclaimed.is_some(), "delta may claim once full has completed");

    // Crash-recovery sweep: a RUNNING row left over from a previous process
    // lifetime is forced back to IDLE.
    let recovered = JobState::recover_stale_running(&pool).await.unwrap();
    assert!(recovered >= 1);

    let delta_state = JobState::find(JobKind::DailyDelta, &pool).await.unwrap().unwrap();
    assert_eq!(delta_state.status, JobStatus::Idle);
    assert!(delta_state.current_source_file.is_none());
}
