//! Upsert/audit engine scenarios against a real Postgres instance (§8).

mod common;

use common::fixtures::{sample_record, sample_source_file};
use common::harness::test_pool;
use lei_sync_core::engine::{upsert_batch, upsert_one, UpsertOutcome};
use lei_sync_core::store::{LeiAuditEntry, LeiRecord, SourceFileKind};
use uuid::Uuid;

const ACTOR: &str = "test-actor";

/// Scenario 1: fresh install full sync.
#[tokio::test]
async fn fresh_install_full_sync_creates_records_and_audit_entries() {
    let pool = test_pool().await;
    let source_file = sample_source_file(SourceFileKind::Full, &format!("hash-{}", Uuid::new_v4()), &pool).await;

    let alpha = sample_record("5493001KJTIIGC8Y1R12", "ALPHA LTD", "US", source_file.id);
    let beta = sample_record("213800WAVVOPS85N2205", "BETA GMBH", "DE", source_file.id);

    let outcome_a = upsert_one(alpha, ACTOR, &pool).await.unwrap();
    let outcome_b = upsert_one(beta, ACTOR, &pool).await.unwrap();

    assert!(matches!(outcome_a, UpsertOutcome::Created));
    assert!(matches!(outcome_b, UpsertOutcome::Created));

    let stored_a = LeiRecord::find_by_lei("5493001KJTIIGC8Y1R12", &pool).await.unwrap().unwrap();
    assert_eq!(stored_a.legal_name, "ALPHA LTD");

    let audits_a = LeiAuditEntry::find_for_lei("5493001KJTIIGC8Y1R12", 10, &pool).await.unwrap();
    assert_eq!(audits_a.len(), 1);
    assert!(matches!(audits_a[0].action, lei_sync_core::store::AuditAction::Create));
}

/// Scenario 2: delta with change and no-change, single-record mode.
#[tokio::test]
async fn delta_update_emits_field_level_change_descriptor() {
    let pool = test_pool().await;
    let source_file = sample_source_file(SourceFileKind::Full, &format!("hash-{}", Uuid::new_v4()), &pool).await;
    let lei = format!("{:0<20}", format!("D{}", Uuid::new_v4().simple()))[..20].to_string();

    let original = sample_record(&lei, "ALPHA LTD", "US", source_file.id);
    upsert_one(original.clone(), ACTOR, &pool).await.unwrap();

    let mut updated = original.clone();
    updated.legal_name = "ALPHA INC".to_string();
    let outcome = upsert_one(updated, ACTOR, &pool).await.unwrap();

    match outcome {
        UpsertOutcome::Updated { changes } => {
            assert_eq!(changes.len(), 1);
            let change = changes.get("LegalName").unwrap();
            assert_eq!(change.old_value, "ALPHA LTD");
            assert_eq!(change.new_value, "ALPHA INC");
        }
        _ => panic!("expected Updated outcome"),
    }

    // Re-applying the identical record a second time is a no-op (idempotence law, §8).
    let reapplied = sample_record(&lei, "ALPHA INC", "US", source_file.id);
    let outcome2 = upsert_one(reapplied, ACTOR, &pool).await.unwrap();
    assert!(matches!(outcome2, UpsertOutcome::Unchanged));

    let audits = LeiAuditEntry::find_for_lei(&lei, 10, &pool).await.unwrap();
    assert_eq!(audits.len(), 2, "unchanged re-application must not add a third audit entry");
}

/// Boundary behavior: duplicate identifier within a batched slice, last
/// occurrence wins, exactly one audit entry.
#[tokio::test]
async fn batched_upsert_dedups_last_occurrence_wins() {
    let pool = test_pool().await;
    let source_file = sample_source_file(SourceFileKind::Delta, &format!("hash-{}", Uuid::new_v4()), &pool).await;
    let lei = format!("{:0<20}", format!("E{}", Uuid::new_v4().simple()))[..20].to_string();

    let first = sample_record(&lei, "FIRST NAME", "GB", source_file.id);
    let second = sample_record(&lei, "SECOND NAME", "GB", source_file.id);

    let outcome = upsert_batch(vec![first, second], ACTOR, &pool).await.unwrap();
    assert_eq!(outcome.created, 1);

    let stored = LeiRecord::find_by_lei(&lei, &pool).await.unwrap().unwrap();
    assert_eq!(stored.legal_name, "SECOND NAME");

    let audits = LeiAuditEntry::find_for_lei(&lei, 10, &pool).await.unwrap();
    assert_eq!(audits.len(), 1);
}

/// Round-trip law: batched mode emits an audit entry on every pass, even
/// when the underlying row doesn't change.
#[tokio::test]
async fn batched_upsert_emits_audit_entry_every_pass() {
    let pool = test_pool().await;
    let source_file = sample_source_file(SourceFileKind::Delta, &format!("hash-{}", Uuid::new_v4()), &pool).await;
    let lei = format!("{:0<20}", format!("F{}", Uuid::new_v4().simple()))[..20].to_string();

    let record = sample_record(&lei, "STABLE NAME", "FR", source_file.id);
    upsert_batch(vec![record.clone()], ACTOR, &pool).await.unwrap();
    upsert_batch(vec![record], ACTOR, &pool).await.unwrap();

    let audits = LeiAuditEntry::find_for_lei(&lei, 10, &pool).await.unwrap();
    assert_eq!(audits.len(), 2);
}
