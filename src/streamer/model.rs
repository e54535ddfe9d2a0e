//! Raw GLEIF bulk-format shapes and their transformation into `LeiRecord`.
//!
//! Most leaf values are wrapped as `{"$": "literal"}`; attributes surface as
//! `@`-prefixed keys we don't currently project into the store. `Literal<T>`
//! captures the common wrapper once instead of repeating `.get("$")`
//! traversal at every call site.

use serde::Deserialize;
use uuid::Uuid;

use super::date::parse_tolerant_date;
use crate::error::{CoreError, Result};
use crate::store::LeiRecord;

#[derive(Debug, Clone, Deserialize)]
pub struct Literal<T> {
    #[serde(rename = "$")]
    pub value: T,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAddress {
    #[serde(rename = "FirstAddressLine")]
    pub first_address_line: Option<Literal<String>>,
    #[serde(rename = "AdditionalAddressLine", default)]
    pub additional_address_line: Vec<Literal<String>>,
    #[serde(rename = "City")]
    pub city: Option<Literal<String>>,
    #[serde(rename = "Region")]
    pub region: Option<Literal<String>>,
    #[serde(rename = "Country")]
    pub country: Option<Literal<String>>,
    #[serde(rename = "PostalCode")]
    pub postal_code: Option<Literal<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRegistrationAuthority {
    #[serde(rename = "RegistrationAuthorityID")]
    pub id: Option<Literal<String>>,
    #[serde(rename = "RegistrationAuthorityEntityID")]
    pub entity_id: Option<Literal<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLegalForm {
    #[serde(rename = "EntityLegalFormCode")]
    pub code: Option<Literal<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSuccessorEntity {
    #[serde(rename = "LEI")]
    pub lei: Option<Literal<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEntity {
    #[serde(rename = "LegalName")]
    pub legal_name: Literal<String>,
    #[serde(rename = "TransliteratedOtherEntityName")]
    pub transliterated_legal_name: Option<Literal<String>>,
    #[serde(rename = "OtherEntityNames", default)]
    pub other_entity_names: Option<serde_json::Value>,
    #[serde(rename = "LegalAddress", default)]
    pub legal_address: RawAddress,
    #[serde(rename = "HeadquartersAddress", default)]
    pub headquarters_address: RawAddress,
    #[serde(rename = "RegistrationAuthority", default)]
    pub registration_authority: RawRegistrationAuthority,
    #[serde(rename = "LegalForm", default)]
    pub legal_form: RawLegalForm,
    #[serde(rename = "EntityCategory")]
    pub entity_category: Option<Literal<String>>,
    #[serde(rename = "EntitySubCategory")]
    pub entity_sub_category: Option<Literal<String>>,
    #[serde(rename = "EntityStatus")]
    pub entity_status: Option<Literal<String>>,
    #[serde(rename = "SuccessorEntity", default)]
    pub successor_entity: RawSuccessorEntity,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawValidationAuthority {
    #[serde(rename = "ValidationAuthorityID")]
    pub id: Option<Literal<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRegistration {
    #[serde(rename = "InitialRegistrationDate")]
    pub initial_registration_date: Option<Literal<String>>,
    #[serde(rename = "LastUpdateDate")]
    pub last_update_date: Option<Literal<String>>,
    #[serde(rename = "NextRenewalDate")]
    pub next_renewal_date: Option<Literal<String>>,
    #[serde(rename = "ManagingLOU")]
    pub managing_lou: Option<Literal<String>>,
    #[serde(rename = "ValidationSources")]
    pub validation_sources: Option<Literal<String>>,
    #[serde(rename = "ValidationAuthority", default)]
    pub validation_authority: RawValidationAuthority,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLeiEntry {
    #[serde(rename = "LEI")]
    pub lei: Literal<String>,
    #[serde(rename = "Entity")]
    pub entity: RawEntity,
    #[serde(rename = "Registration")]
    pub registration: RawRegistration,
}

fn literal_string(lit: &Option<Literal<String>>) -> Option<String> {
    lit.as_ref().map(|l| l.value.clone())
}

fn literal_date(lit: &Option<Literal<String>>) -> Option<chrono::DateTime<chrono::Utc>> {
    lit.as_ref().and_then(|l| parse_tolerant_date(&l.value))
}

impl RawLeiEntry {
    pub fn identifier(&self) -> &str {
        &self.lei.value
    }

    /// Transform into a store-ready `LeiRecord`. `source_file_id` is the
    /// current run's Source File, bound per §4.4's provenance rule.
    pub fn into_record(self, source_file_id: Uuid) -> Result<LeiRecord> {
        if self.lei.value.len() != 20 {
            return Err(CoreError::DataFormat(format!(
                "LEI {:?} is not 20 characters",
                self.lei.value
            )));
        }

        let other_names = self
            .entity
            .other_entity_names
            .unwrap_or_else(|| serde_json::json!([]));

        let legal = &self.entity.legal_address;
        let hq = &self.entity.headquarters_address;

        Ok(LeiRecord {
            lei: self.lei.value,
            legal_name: self.entity.legal_name.value,
            legal_name_transliterated: literal_string(&self.entity.transliterated_legal_name),
            other_names,

            legal_address_line1: literal_string(&legal.first_address_line),
            legal_address_line2: legal.additional_address_line.first().map(|l| l.value.clone()),
            legal_address_line3: legal.additional_address_line.get(1).map(|l| l.value.clone()),
            legal_address_line4: legal.additional_address_line.get(2).map(|l| l.value.clone()),
            legal_address_city: literal_string(&legal.city),
            legal_address_region: literal_string(&legal.region),
            legal_address_country: literal_string(&legal.country),
            legal_address_postal_code: literal_string(&legal.postal_code),

            hq_address_line1: literal_string(&hq.first_address_line),
            hq_address_line2: hq.additional_address_line.first().map(|l| l.value.clone()),
            hq_address_line3: hq.additional_address_line.get(1).map(|l| l.value.clone()),
            hq_address_line4: hq.additional_address_line.get(2).map(|l| l.value.clone()),
            hq_address_city: literal_string(&hq.city),
            hq_address_region: literal_string(&hq.region),
            hq_address_country: literal_string(&hq.country),
            hq_address_postal_code: literal_string(&hq.postal_code),

            registration_authority_id: literal_string(&self.entity.registration_authority.id),
            registration_authority_entity_id: literal_string(
                &self.entity.registration_authority.entity_id,
            ),
            legal_form: literal_string(&self.entity.legal_form.code),
            entity_category: literal_string(&self.entity.entity_category),
            entity_sub_category: literal_string(&self.entity.entity_sub_category),
            entity_status: literal_string(&self.entity.entity_status),
            successor_lei: literal_string(&self.entity.successor_entity.lei),

            initial_registration_date: literal_date(&self.registration.initial_registration_date),
            last_update_date: literal_date(&self.registration.last_update_date),
            next_renewal_date: literal_date(&self.registration.next_renewal_date),

            managing_lou: literal_string(&self.registration.managing_lou),
            validation_sources: literal_string(&self.registration.validation_sources),
            validation_authority_id: literal_string(&self.registration.validation_authority.id),

            source_file_id,

            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            created_by: "system".to_string(),
            updated_by: "system".to_string(),
            deleted_at: None,
            last_change: serde_json::json!({}),
        })
    }
}
