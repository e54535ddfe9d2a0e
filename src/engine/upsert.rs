//! Upsert/Audit Engine: applies a decoded `LeiRecord` to the store and
//! writes the audit trail that documents what changed.
//!
//! Two modes per §4.4: a single-record path used for resumed/individual
//! writes that diffs against the prior row, and a batched path used by the
//! main streaming loop that writes in chunks and skips diffing in favor of
//! a cheap `INSERT ... ON CONFLICT` round trip.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::store::{AuditAction, ChangeDescriptor, LeiAuditEntry, LeiRecord};

use super::diff::diff_records;

pub const BATCH_SIZE: usize = 100;

#[derive(Debug)]
pub enum UpsertOutcome {
    Created,
    Updated { changes: ChangeDescriptor },
    Unchanged,
}

/// Upsert a single record, diffing against any existing row and writing a
/// CREATE/UPDATE audit entry in the same transaction. Writes nothing if the
/// incoming record is identical to what's stored (§4.4's "no-op" case).
pub async fn upsert_one(mut incoming: LeiRecord, actor: &str, pool: &PgPool) -> Result<UpsertOutcome> {
    incoming.created_by = actor.to_string();
    incoming.updated_by = actor.to_string();

    // The lookup happens outside the transaction; overlap between full and
    // delta runs touching the same identifier is prevented upstream by the
    // scheduler's job-kind exclusivity (§5), not by locking here.
    let existing = LeiRecord::find_by_lei(&incoming.lei, pool).await?;

    let mut tx = pool.begin().await?;

    let outcome = match existing {
        None => {
            let stored = LeiRecord::insert(&incoming, &mut *tx).await?;
            LeiAuditEntry::insert(
                Uuid::new_v4(),
                &stored,
                AuditAction::Create,
                serde_json::json!({}),
                actor,
                &mut *tx,
            )
            .await?;
            UpsertOutcome::Created
        }
        Some(existing) => {
            let changes = diff_records(&existing, &incoming);
            if changes.is_empty() {
                UpsertOutcome::Unchanged
            } else {
                let mut to_store = incoming;
                to_store.last_change =
                    serde_json::to_value(&changes).map_err(CoreError::from)?;
                let stored = LeiRecord::update_in_place(&to_store, &mut *tx).await?;
                LeiAuditEntry::insert(
                    Uuid::new_v4(),
                    &stored,
                    AuditAction::Update,
                    serde_json::to_value(&changes).map_err(CoreError::from)?,
                    actor,
                    &mut *tx,
                )
                .await?;
                UpsertOutcome::Updated { changes }
            }
        }
    };

    tx.commit().await.map_err(CoreError::from)?;
    Ok(outcome)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BatchOutcome {
    pub created: i64,
    pub updated: i64,
}

/// Upsert many records in fixed-size chunks. Duplicate identifiers within
/// `records` are resolved last-occurrence-wins before any writes happen
/// (§4.4), and each chunk is retried once on a transient failure.
pub async fn upsert_batch(records: Vec<LeiRecord>, actor: &str, pool: &PgPool) -> Result<BatchOutcome> {
    let deduped = dedup_last_occurrence_wins(records);
    let mut outcome = BatchOutcome::default();

    for chunk in deduped.chunks(BATCH_SIZE) {
        let result = match upsert_chunk(chunk, actor, pool).await {
            Ok(r) => r,
            Err(e) if is_transient(&e) => {
                tracing::warn!(error = %e, "batch chunk failed, retrying once");
                upsert_chunk(chunk, actor, pool).await?
            }
            Err(e) => return Err(e),
        };
        outcome.created += result.created;
        outcome.updated += result.updated;
    }

    Ok(outcome)
}

async fn upsert_chunk(chunk: &[LeiRecord], actor: &str, pool: &PgPool) -> Result<BatchOutcome> {
    let mut tx = pool.begin().await?;
    let mut outcome = BatchOutcome::default();

    for record in chunk {
        let mut record = record.clone();
        record.created_by = actor.to_string();
        record.updated_by = actor.to_string();
        record.last_change = serde_json::json!({});

        let (stored, was_insert) = LeiRecord::upsert_no_diff(&record, &mut *tx).await?;

        let action = if was_insert {
            outcome.created += 1;
            AuditAction::Create
        } else {
            outcome.updated += 1;
            AuditAction::Update
        };

        LeiAuditEntry::insert(
            Uuid::new_v4(),
            &stored,
            action,
            serde_json::json!({}),
            actor,
            &mut *tx,
        )
        .await?;
    }

    tx.commit().await.map_err(CoreError::from)?;
    Ok(outcome)
}

fn is_transient(err: &CoreError) -> bool {
    matches!(err, CoreError::Transient(_))
}

/// Keep only the last occurrence of each identifier, preserving the overall
/// relative order of those survivors.
fn dedup_last_occurrence_wins(records: Vec<LeiRecord>) -> Vec<LeiRecord> {
    let mut last_index: HashMap<String, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        last_index.insert(record.lei.clone(), i);
    }

    records
        .into_iter()
        .enumerate()
        .filter(|(i, record)| last_index.get(&record.lei) == Some(i))
        .map(|(_, record)| record)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_lei(lei: &str, legal_name: &str) -> LeiRecord {
        LeiRecord {
            lei: lei.to_string(),
            legal_name: legal_name.to_string(),
            legal_name_transliterated: None,
            other_names: serde_json::json!([]),
            legal_address_line1: None,
            legal_address_line2: None,
            legal_address_line3: None,
            legal_address_line4: None,
            legal_address_city: None,
            legal_address_region: None,
            legal_address_country: None,
            legal_address_postal_code: None,
            hq_address_line1: None,
            hq_address_line2: None,
            hq_address_line3: None,
            hq_address_line4: None,
            hq_address_city: None,
            hq_address_region: None,
            hq_address_country: None,
            hq_address_postal_code: None,
            registration_authority_id: None,
            registration_authority_entity_id: None,
            legal_form: None,
            entity_category: None,
            entity_sub_category: None,
            entity_status: None,
            successor_lei: None,
            initial_registration_date: None,
            last_update_date: None,
            next_renewal_date: None,
            managing_lou: None,
            validation_sources: None,
            validation_authority_id: None,
            source_file_id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            created_by: "system".to_string(),
            updated_by: "system".to_string(),
            deleted_at: None,
            last_change: serde_json::json!({}),
        }
    }

    #[test]
    fn dedup_keeps_last_occurrence() {
        let records = vec![
            record_with_lei("AAAAAAAAAAAAAAAAAAAA", "First"),
            record_with_lei("BBBBBBBBBBBBBBBBBBBB", "Only"),
            record_with_lei("AAAAAAAAAAAAAAAAAAAA", "Second"),
        ];
        let deduped = dedup_last_occurrence_wins(records);
        assert_eq!(deduped.len(), 2);
        let a = deduped.iter().find(|r| r.lei == "AAAAAAAAAAAAAAAAAAAA").unwrap();
        assert_eq!(a.legal_name, "Second");
    }

    #[test]
    fn dedup_is_a_no_op_without_duplicates() {
        let records = vec![
            record_with_lei("AAAAAAAAAAAAAAAAAAAA", "First"),
            record_with_lei("BBBBBBBBBBBBBBBBBBBB", "Second"),
        ];
        let deduped = dedup_last_occurrence_wins(records);
        assert_eq!(deduped.len(), 2);
    }
}
