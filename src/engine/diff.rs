//! Field-level diffing between an existing record and its replacement,
//! producing the `ChangeDescriptor` persisted on the UPDATE audit entry.
//!
//! Deliberately not reflection-driven (no `serde_json::to_value` round-trip
//! over both sides and structural diff): identifier, timestamps, actor, and
//! bookkeeping fields are excluded by construction rather than by name
//! filtering, so adding a new bookkeeping field to `LeiRecord` can't
//! accidentally leak into a change descriptor (§4.4).

use crate::store::{ChangeDescriptor, FieldChange, LeiRecord};

fn push_string(out: &mut ChangeDescriptor, field: &str, old: &str, new: &str) {
    if old != new {
        out.insert(
            field.to_string(),
            FieldChange {
                old_value: old.to_string(),
                new_value: new.to_string(),
            },
        );
    }
}

fn push_opt_string(out: &mut ChangeDescriptor, field: &str, old: &Option<String>, new: &Option<String>) {
    if old != new {
        out.insert(
            field.to_string(),
            FieldChange {
                old_value: old.clone().unwrap_or_default(),
                new_value: new.clone().unwrap_or_default(),
            },
        );
    }
}

fn push_opt_date(
    out: &mut ChangeDescriptor,
    field: &str,
    old: &Option<chrono::DateTime<chrono::Utc>>,
    new: &Option<chrono::DateTime<chrono::Utc>>,
) {
    // Two unset dates are equal; only a changed or newly-populated value
    // counts as a diff.
    match (old, new) {
        (None, None) => {}
        _ if old == new => {}
        _ => {
            out.insert(
                field.to_string(),
                FieldChange {
                    old_value: old.map(|d| d.to_rfc3339()).unwrap_or_default(),
                    new_value: new.map(|d| d.to_rfc3339()).unwrap_or_default(),
                },
            );
        }
    }
}

fn push_json(out: &mut ChangeDescriptor, field: &str, old: &serde_json::Value, new: &serde_json::Value) {
    if old != new {
        out.insert(
            field.to_string(),
            FieldChange {
                old_value: old.to_string(),
                new_value: new.to_string(),
            },
        );
    }
}

/// Compare `existing` against `incoming`, ignoring identity, provenance, and
/// audit-bookkeeping fields. Field names are PascalCase to match the
/// published change-descriptor shape.
pub fn diff_records(existing: &LeiRecord, incoming: &LeiRecord) -> ChangeDescriptor {
    let mut out = ChangeDescriptor::new();

    push_string(&mut out, "LegalName", &existing.legal_name, &incoming.legal_name);
    push_opt_string(
        &mut out,
        "LegalNameTransliterated",
        &existing.legal_name_transliterated,
        &incoming.legal_name_transliterated,
    );
    push_json(&mut out, "OtherNames", &existing.other_names, &incoming.other_names);

    push_opt_string(&mut out, "LegalAddressLine1", &existing.legal_address_line1, &incoming.legal_address_line1);
    push_opt_string(&mut out, "LegalAddressLine2", &existing.legal_address_line2, &incoming.legal_address_line2);
    push_opt_string(&mut out, "LegalAddressLine3", &existing.legal_address_line3, &incoming.legal_address_line3);
    push_opt_string(&mut out, "LegalAddressLine4", &existing.legal_address_line4, &incoming.legal_address_line4);
    push_opt_string(&mut out, "LegalAddressCity", &existing.legal_address_city, &incoming.legal_address_city);
    push_opt_string(&mut out, "LegalAddressRegion", &existing.legal_address_region, &incoming.legal_address_region);
    push_opt_string(&mut out, "LegalAddressCountry", &existing.legal_address_country, &incoming.legal_address_country);
    push_opt_string(&mut out, "LegalAddressPostalCode", &existing.legal_address_postal_code, &incoming.legal_address_postal_code);

    push_opt_string(&mut out, "HqAddressLine1", &existing.hq_address_line1, &incoming.hq_address_line1);
    push_opt_string(&mut out, "HqAddressLine2", &existing.hq_address_line2, &incoming.hq_address_line2);
    push_opt_string(&mut out, "HqAddressLine3", &existing.hq_address_line3, &incoming.hq_address_line3);
    push_opt_string(&mut out, "HqAddressLine4", &existing.hq_address_line4, &incoming.hq_address_line4);
    push_opt_string(&mut out, "HqAddressCity", &existing.hq_address_city, &incoming.hq_address_city);
    push_opt_string(&mut out, "HqAddressRegion", &existing.hq_address_region, &incoming.hq_address_region);
    push_opt_string(&mut out, "HqAddressCountry", &existing.hq_address_country, &incoming.hq_address_country);
    push_opt_string(&mut out, "HqAddressPostalCode", &existing.hq_address_postal_code, &incoming.hq_address_postal_code);

    push_opt_string(
        &mut out,
        "RegistrationAuthorityId",
        &existing.registration_authority_id,
        &incoming.registration_authority_id,
    );
    push_opt_string(
        &mut out,
        "RegistrationAuthorityEntityId",
        &existing.registration_authority_entity_id,
        &incoming.registration_authority_entity_id,
    );
    push_opt_string(&mut out, "LegalForm", &existing.legal_form, &incoming.legal_form);
    push_opt_string(&mut out, "EntityCategory", &existing.entity_category, &incoming.entity_category);
    push_opt_string(&mut out, "EntitySubCategory", &existing.entity_sub_category, &incoming.entity_sub_category);
    push_opt_string(&mut out, "EntityStatus", &existing.entity_status, &incoming.entity_status);
    push_opt_string(&mut out, "SuccessorLei", &existing.successor_lei, &incoming.successor_lei);

    push_opt_date(&mut out, "InitialRegistrationDate", &existing.initial_registration_date, &incoming.initial_registration_date);
    push_opt_date(&mut out, "LastUpdateDate", &existing.last_update_date, &incoming.last_update_date);
    push_opt_date(&mut out, "NextRenewalDate", &existing.next_renewal_date, &incoming.next_renewal_date);

    push_opt_string(&mut out, "ManagingLou", &existing.managing_lou, &incoming.managing_lou);
    push_opt_string(&mut out, "ValidationSources", &existing.validation_sources, &incoming.validation_sources);
    push_opt_string(&mut out, "ValidationAuthorityId", &existing.validation_authority_id, &incoming.validation_authority_id);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn base_record() -> LeiRecord {
        LeiRecord {
            lei: "5493001KJTIIGC8Y1R12".to_string(),
            legal_name: "ALPHA LTD".to_string(),
            legal_name_transliterated: None,
            other_names: serde_json::json!([]),
            legal_address_line1: None,
            legal_address_line2: None,
            legal_address_line3: None,
            legal_address_line4: None,
            legal_address_city: Some("New York".to_string()),
            legal_address_region: None,
            legal_address_country: Some("US".to_string()),
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
            entity_status: Some("ACTIVE".to_string()),
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
    fn identical_records_produce_no_changes() {
        let existing = base_record();
        let incoming = base_record();
        assert!(diff_records(&existing, &incoming).is_empty());
    }

    #[test]
    fn detects_a_changed_scalar_field() {
        let existing = base_record();
        let mut incoming = base_record();
        incoming.legal_name = "ALPHA HOLDINGS LTD".to_string();

        let changes = diff_records(&existing, &incoming);
        assert_eq!(changes.len(), 1);
        let change = &changes["LegalName"];
        assert_eq!(change.old_value, "ALPHA LTD");
        assert_eq!(change.new_value, "ALPHA HOLDINGS LTD");
    }

    #[test]
    fn two_unset_dates_do_not_count_as_a_change() {
        let existing = base_record();
        let incoming = base_record();
        assert!(diff_records(&existing, &incoming).is_empty());
        assert_eq!(existing.next_renewal_date, None);
        assert_eq!(incoming.next_renewal_date, None);
    }

    #[test]
    fn newly_populated_date_counts_as_a_change() {
        let existing = base_record();
        let mut incoming = base_record();
        incoming.next_renewal_date = Some(chrono::Utc::now());

        let changes = diff_records(&existing, &incoming);
        assert_eq!(changes.len(), 1);
        assert!(changes.contains_key("NextRenewalDate"));
    }

    #[test]
    fn identifier_and_timestamp_fields_are_never_diffed() {
        let existing = base_record();
        let mut incoming = base_record();
        incoming.created_at = chrono::Utc::now() + chrono::Duration::days(1);
        incoming.updated_at = chrono::Utc::now() + chrono::Duration::days(1);
        incoming.source_file_id = Uuid::new_v4();

        assert!(diff_records(&existing, &incoming).is_empty());
    }
}
