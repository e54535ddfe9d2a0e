use serde_json::json;
use uuid::Uuid;

use lei_sync_core::store::{LeiRecord, SourceFile, SourceFileKind};

pub fn sample_record(lei: &str, legal_name: &str, country: &str, source_file_id: Uuid) -> LeiRecord {
    LeiRecord {
        lei: lei.to_string(),
        legal_name: legal_name.to_string(),
        legal_name_transliterated: None,
        other_names: json!([]),
        legal_address_line1: Some("1 Example Street".to_string()),
        legal_address_line2: None,
        legal_address_line3: None,
        legal_address_line4: None,
        legal_address_city: Some("Exampletown".to_string()),
        legal_address_region: None,
        legal_address_country: Some(country.to_string()),
        legal_address_postal_code: None,
        hq_address_line1: Some("1 Example Street".to_string()),
        hq_address_line2: None,
        hq_address_line3: None,
        hq_address_line4: None,
        hq_address_city: Some("Exampletown".to_string()),
        hq_address_region: None,
        hq_address_country: Some(country.to_string()),
        hq_address_postal_code: None,
        registration_authority_id: None,
        registration_authority_entity_id: None,
        legal_form: None,
        entity_category: None,
        entity_sub_category: None,
        entity_status: Some("ACTIVE".to_string()),
        successor_lei: None,
        initial_registration_date: None,
        last_update_date: None,
        next_renewal_date: None,
        managing_lou: None,
        validation_sources: None,
        validation_authority_id: None,
        source_file_id,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
        created_by: "system".to_string(),
        updated_by: "system".to_string(),
        deleted_at: None,
        last_change: json!({}),
    }
}

pub async fn sample_source_file(kind: SourceFileKind, content_hash: &str, pool: &sqlx::PgPool) -> SourceFile {
    SourceFile::create(
        Uuid::new_v4(),
        &format!("{content_hash}.json.zip"),
        kind,
        "https://example.org/artifact.json.zip",
        1024,
        content_hash,
        None,
        3,
        pool,
    )
    .await
    .expect("failed to create fixture source file")
}
