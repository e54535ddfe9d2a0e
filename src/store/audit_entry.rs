//! LEI Audit Entry: an immutable post-image of one mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::store::lei_record::LeiRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeiAuditEntry {
    pub id: Uuid,
    pub lei_record_id: String,
    pub lei: String,
    pub action: AuditAction,
    pub snapshot: serde_json::Value,
    /// Empty object for CREATE/DELETE, non-empty for UPDATE.
    pub change_descriptor: serde_json::Value,
    pub source_file_id: Uuid,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl LeiAuditEntry {
    /// Insert one audit entry. Callers are responsible for running this in
    /// the same transaction as the record mutation it documents — audit
    /// entries are never written outside that boundary (§3, §8).
    pub async fn insert(
        id: Uuid,
        record: &LeiRecord,
        action: AuditAction,
        change_descriptor: serde_json::Value,
        actor: &str,
        executor: impl sqlx::PgExecutor<'_>,
    ) -> Result<Self> {
        let snapshot = serde_json::to_value(record)
            .map_err(crate::error::CoreError::from)?;
        let row = sqlx::query_as::<_, LeiAuditEntry>(
            r#"
            INSERT INTO lei_audit_entries
                (id, lei_record_id, lei, action, snapshot, change_descriptor, source_file_id, actor)
            VALUES ($1, $2, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&record.lei)
        .bind(action)
        .bind(snapshot)
        .bind(change_descriptor)
        .bind(record.source_file_id)
        .bind(actor)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    /// Descending history for one identifier, bounded by `limit`.
    pub async fn find_for_lei(lei: &str, limit: i64, pool: &sqlx::PgPool) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, LeiAuditEntry>(
            r#"
            SELECT * FROM lei_audit_entries
            WHERE lei = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(lei)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
