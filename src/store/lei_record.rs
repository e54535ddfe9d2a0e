//! LEI Record: one legal entity as published by the registry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::common::pagination::{ListLeiFilter, SortBy, SortOrder};
use crate::error::Result;

/// One field's before/after value in a change descriptor.
///
/// Values are rendered as strings at the storage boundary regardless of the
/// underlying attribute type (string, date, optional-string) — §4.4, §9.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    #[serde(rename = "OldValue")]
    pub old_value: String,
    #[serde(rename = "NewValue")]
    pub new_value: String,
}

/// Map from changed field name (PascalCase, e.g. "LegalName") to its change.
pub type ChangeDescriptor = BTreeMap<String, FieldChange>;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeiRecord {
    pub lei: String,
    pub legal_name: String,
    pub legal_name_transliterated: Option<String>,
    /// JSON array, `"[]"` when absent — never null (§4.4).
    pub other_names: serde_json::Value,

    pub legal_address_line1: Option<String>,
    pub legal_address_line2: Option<String>,
    pub legal_address_line3: Option<String>,
    pub legal_address_line4: Option<String>,
    pub legal_address_city: Option<String>,
    pub legal_address_region: Option<String>,
    pub legal_address_country: Option<String>,
    pub legal_address_postal_code: Option<String>,

    pub hq_address_line1: Option<String>,
    pub hq_address_line2: Option<String>,
    pub hq_address_line3: Option<String>,
    pub hq_address_line4: Option<String>,
    pub hq_address_city: Option<String>,
    pub hq_address_region: Option<String>,
    pub hq_address_country: Option<String>,
    pub hq_address_postal_code: Option<String>,

    pub registration_authority_id: Option<String>,
    pub registration_authority_entity_id: Option<String>,
    pub legal_form: Option<String>,
    pub entity_category: Option<String>,
    pub entity_sub_category: Option<String>,
    pub entity_status: Option<String>,
    pub successor_lei: Option<String>,

    pub initial_registration_date: Option<DateTime<Utc>>,
    pub last_update_date: Option<DateTime<Utc>>,
    pub next_renewal_date: Option<DateTime<Utc>>,

    pub managing_lou: Option<String>,
    pub validation_sources: Option<String>,
    pub validation_authority_id: Option<String>,

    pub source_file_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
    pub deleted_at: Option<DateTime<Utc>>,
    /// JSON object, `"{}"` when empty — never null (§4.4).
    pub last_change: serde_json::Value,
}

impl LeiRecord {
    pub async fn find_by_lei(lei: &str, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, LeiRecord>(
            r#"SELECT * FROM lei_records WHERE lei = $1 AND deleted_at IS NULL"#,
        )
        .bind(lei)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Insert a brand-new record (CREATE path of the single-record upsert).
    pub async fn insert(
        record: &LeiRecord,
        executor: impl sqlx::PgExecutor<'_>,
    ) -> Result<LeiRecord> {
        let row = sqlx::query_as::<_, LeiRecord>(
            r#"
            INSERT INTO lei_records (
                lei, legal_name, legal_name_transliterated, other_names,
                legal_address_line1, legal_address_line2, legal_address_line3, legal_address_line4,
                legal_address_city, legal_address_region, legal_address_country, legal_address_postal_code,
                hq_address_line1, hq_address_line2, hq_address_line3, hq_address_line4,
                hq_address_city, hq_address_region, hq_address_country, hq_address_postal_code,
                registration_authority_id, registration_authority_entity_id, legal_form,
                entity_category, entity_sub_category, entity_status, successor_lei,
                initial_registration_date, last_update_date, next_renewal_date,
                managing_lou, validation_sources, validation_authority_id,
                source_file_id, created_by, updated_by, last_change
            ) VALUES (
                $1, $2, $3, $4,
                $5, $6, $7, $8,
                $9, $10, $11, $12,
                $13, $14, $15, $16,
                $17, $18, $19, $20,
                $21, $22, $23,
                $24, $25, $26, $27,
                $28, $29, $30,
                $31, $32, $33,
                $34, $35, $36, $37
            )
            RETURNING *
            "#,
        )
        .bind(&record.lei)
        .bind(&record.legal_name)
        .bind(&record.legal_name_transliterated)
        .bind(&record.other_names)
        .bind(&record.legal_address_line1)
        .bind(&record.legal_address_line2)
        .bind(&record.legal_address_line3)
        .bind(&record.legal_address_line4)
        .bind(&record.legal_address_city)
        .bind(&record.legal_address_region)
        .bind(&record.legal_address_country)
        .bind(&record.legal_address_postal_code)
        .bind(&record.hq_address_line1)
        .bind(&record.hq_address_line2)
        .bind(&record.hq_address_line3)
        .bind(&record.hq_address_line4)
        .bind(&record.hq_address_city)
        .bind(&record.hq_address_region)
        .bind(&record.hq_address_country)
        .bind(&record.hq_address_postal_code)
        .bind(&record.registration_authority_id)
        .bind(&record.registration_authority_entity_id)
        .bind(&record.legal_form)
        .bind(&record.entity_category)
        .bind(&record.entity_sub_category)
        .bind(&record.entity_status)
        .bind(&record.successor_lei)
        .bind(record.initial_registration_date)
        .bind(record.last_update_date)
        .bind(record.next_renewal_date)
        .bind(&record.managing_lou)
        .bind(&record.validation_sources)
        .bind(&record.validation_authority_id)
        .bind(record.source_file_id)
        .bind(&record.created_by)
        .bind(&record.updated_by)
        .bind(&record.last_change)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    /// Update an existing record in place (UPDATE path of the single-record
    /// upsert), preserving `created_at`/`created_by`.
    pub async fn update_in_place(
        record: &LeiRecord,
        executor: impl sqlx::PgExecutor<'_>,
    ) -> Result<LeiRecord> {
        let row = sqlx::query_as::<_, LeiRecord>(
            r#"
            UPDATE lei_records SET
                legal_name = $2, legal_name_transliterated = $3, other_names = $4,
                legal_address_line1 = $5, legal_address_line2 = $6, legal_address_line3 = $7, legal_address_line4 = $8,
                legal_address_city = $9, legal_address_region = $10, legal_address_country = $11, legal_address_postal_code = $12,
                hq_address_line1 = $13, hq_address_line2 = $14, hq_address_line3 = $15, hq_address_line4 = $16,
                hq_address_city = $17, hq_address_region = $18, hq_address_country = $19, hq_address_postal_code = $20,
                registration_authority_id = $21, registration_authority_entity_id = $22, legal_form = $23,
                entity_category = $24, entity_sub_category = $25, entity_status = $26, successor_lei = $27,
                initial_registration_date = $28, last_update_date = $29, next_renewal_date = $30,
                managing_lou = $31, validation_sources = $32, validation_authority_id = $33,
                source_file_id = $34, updated_by = $35, updated_at = now(), last_change = $36
            WHERE lei = $1
            RETURNING *
            "#,
        )
        .bind(&record.lei)
        .bind(&record.legal_name)
        .bind(&record.legal_name_transliterated)
        .bind(&record.other_names)
        .bind(&record.legal_address_line1)
        .bind(&record.legal_address_line2)
        .bind(&record.legal_address_line3)
        .bind(&record.legal_address_line4)
        .bind(&record.legal_address_city)
        .bind(&record.legal_address_region)
        .bind(&record.legal_address_country)
        .bind(&record.legal_address_postal_code)
        .bind(&record.hq_address_line1)
        .bind(&record.hq_address_line2)
        .bind(&record.hq_address_line3)
        .bind(&record.hq_address_line4)
        .bind(&record.hq_address_city)
        .bind(&record.hq_address_region)
        .bind(&record.hq_address_country)
        .bind(&record.hq_address_postal_code)
        .bind(&record.registration_authority_id)
        .bind(&record.registration_authority_entity_id)
        .bind(&record.legal_form)
        .bind(&record.entity_category)
        .bind(&record.entity_sub_category)
        .bind(&record.entity_status)
        .bind(&record.successor_lei)
        .bind(record.initial_registration_date)
        .bind(record.last_update_date)
        .bind(record.next_renewal_date)
        .bind(&record.managing_lou)
        .bind(&record.validation_sources)
        .bind(&record.validation_authority_id)
        .bind(record.source_file_id)
        .bind(&record.updated_by)
        .bind(&record.last_change)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    /// Insert-or-replace in one round trip, used by the batched upsert path
    /// where per-field diffing is skipped (§4.4: batch-mode audit entries
    /// carry an empty change descriptor regardless of create vs. update).
    /// Returns the stored row and whether this was a new insert.
    pub async fn upsert_no_diff(
        record: &LeiRecord,
        executor: impl sqlx::PgExecutor<'_>,
    ) -> Result<(LeiRecord, bool)> {
        use sqlx::Row;

        let row = sqlx::query(
            r#"
            INSERT INTO lei_records (
                lei, legal_name, legal_name_transliterated, other_names,
                legal_address_line1, legal_address_line2, legal_address_line3, legal_address_line4,
                legal_address_city, legal_address_region, legal_address_country, legal_address_postal_code,
                hq_address_line1, hq_address_line2, hq_address_line3, hq_address_line4,
                hq_address_city, hq_address_region, hq_address_country, hq_address_postal_code,
                registration_authority_id, registration_authority_entity_id, legal_form,
                entity_category, entity_sub_category, entity_status, successor_lei,
                initial_registration_date, last_update_date, next_renewal_date,
                managing_lou, validation_sources, validation_authority_id,
                source_file_id, created_by, updated_by, last_change
            ) VALUES (
                $1, $2, $3, $4,
                $5, $6, $7, $8,
                $9, $10, $11, $12,
                $13, $14, $15, $16,
                $17, $18, $19, $20,
                $21, $22, $23,
                $24, $25, $26, $27,
                $28, $29, $30,
                $31, $32, $33,
                $34, $35, $36, $37
            )
            ON CONFLICT (lei) DO UPDATE SET
                legal_name = EXCLUDED.legal_name,
                legal_name_transliterated = EXCLUDED.legal_name_transliterated,
                other_names = EXCLUDED.other_names,
                legal_address_line1 = EXCLUDED.legal_address_line1,
                legal_address_line2 = EXCLUDED.legal_address_line2,
                legal_address_line3 = EXCLUDED.legal_address_line3,
                legal_address_line4 = EXCLUDED.legal_address_line4,
                legal_address_city = EXCLUDED.legal_address_city,
                legal_address_region = EXCLUDED.legal_address_region,
                legal_address_country = EXCLUDED.legal_address_country,
                legal_address_postal_code = EXCLUDED.legal_address_postal_code,
                hq_address_line1 = EXCLUDED.hq_address_line1,
                hq_address_line2 = EXCLUDED.hq_address_line2,
                hq_address_line3 = EXCLUDED.hq_address_line3,
                hq_address_line4 = EXCLUDED.hq_address_line4,
                hq_address_city = EXCLUDED.hq_address_city,
                hq_address_region = EXCLUDED.hq_address_region,
                hq_address_country = EXCLUDED.hq_address_country,
                hq_address_postal_code = EXCLUDED.hq_address_postal_code,
                registration_authority_id = EXCLUDED.registration_authority_id,
                registration_authority_entity_id = EXCLUDED.registration_authority_entity_id,
                legal_form = EXCLUDED.legal_form,
                entity_category = EXCLUDED.entity_category,
                entity_sub_category = EXCLUDED.entity_sub_category,
                entity_status = EXCLUDED.entity_status,
                successor_lei = EXCLUDED.successor_lei,
                initial_registration_date = EXCLUDED.initial_registration_date,
                last_update_date = EXCLUDED.last_update_date,
                next_renewal_date = EXCLUDED.next_renewal_date,
                managing_lou = EXCLUDED.managing_lou,
                validation_sources = EXCLUDED.validation_sources,
                validation_authority_id = EXCLUDED.validation_authority_id,
                source_file_id = EXCLUDED.source_file_id,
                updated_by = EXCLUDED.updated_by,
                updated_at = now(),
                last_change = EXCLUDED.last_change
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.lei)
        .bind(&record.legal_name)
        .bind(&record.legal_name_transliterated)
        .bind(&record.other_names)
        .bind(&record.legal_address_line1)
        .bind(&record.legal_address_line2)
        .bind(&record.legal_address_line3)
        .bind(&record.legal_address_line4)
        .bind(&record.legal_address_city)
        .bind(&record.legal_address_region)
        .bind(&record.legal_address_country)
        .bind(&record.legal_address_postal_code)
        .bind(&record.hq_address_line1)
        .bind(&record.hq_address_line2)
        .bind(&record.hq_address_line3)
        .bind(&record.hq_address_line4)
        .bind(&record.hq_address_city)
        .bind(&record.hq_address_region)
        .bind(&record.hq_address_country)
        .bind(&record.hq_address_postal_code)
        .bind(&record.registration_authority_id)
        .bind(&record.registration_authority_entity_id)
        .bind(&record.legal_form)
        .bind(&record.entity_category)
        .bind(&record.entity_sub_category)
        .bind(&record.entity_status)
        .bind(&record.successor_lei)
        .bind(record.initial_registration_date)
        .bind(record.last_update_date)
        .bind(record.next_renewal_date)
        .bind(&record.managing_lou)
        .bind(&record.validation_sources)
        .bind(&record.validation_authority_id)
        .bind(record.source_file_id)
        .bind(&record.created_by)
        .bind(&record.updated_by)
        .bind(&record.last_change)
        .fetch_one(executor)
        .await?;

        let inserted: bool = row.try_get("inserted")?;
        let stored = LeiRecord::from_row(&row)?;
        Ok((stored, inserted))
    }

    /// Paginated, filtered list for the `GET /lei` external endpoint.
    pub async fn list(filter: &ListLeiFilter, pool: &PgPool) -> Result<Vec<Self>> {
        let sort_column = match filter.sort_by {
            SortBy::Identifier => "lei",
            SortBy::LegalName => "legal_name",
            SortBy::Status => "entity_status",
            SortBy::Category => "entity_category",
            SortBy::Country => "legal_address_country",
            SortBy::LastUpdateDate => "last_update_date",
        };
        let order = match filter.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        // Column names come from a fixed whitelist (SortBy/SortOrder enums),
        // never from raw caller input, so interpolating them is safe; all
        // caller-supplied values remain bound parameters below.
        let sql = format!(
            r#"
            SELECT * FROM lei_records
            WHERE deleted_at IS NULL
              AND ($1::text IS NULL OR lei ILIKE $1 || '%' OR legal_name ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR entity_status = $2)
              AND ($3::text IS NULL OR entity_category = $3)
              AND ($4::text IS NULL OR legal_address_country = $4)
            ORDER BY {sort_column} {order}
            LIMIT $5 OFFSET $6
            "#
        );

        let rows = sqlx::query_as::<_, LeiRecord>(&sql)
            .bind(&filter.search)
            .bind(&filter.status)
            .bind(&filter.category)
            .bind(&filter.country)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    pub async fn distinct_countries(pool: &PgPool) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT legal_address_country FROM lei_records
            WHERE deleted_at IS NULL AND legal_address_country IS NOT NULL
            ORDER BY legal_address_country ASC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(c,)| c).collect())
    }
}
