//! Offset-based pagination and filtering for the `GET /lei` list endpoint.
//!
//! Unlike the cursor-based Relay connections elsewhere in the corpus, §6 of
//! the spec calls for plain `limit`/`offset` — this module validates and
//! normalizes raw query parameters into a type the store layer can trust.

use serde::Deserialize;

use crate::error::{CoreError, Result};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 501;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    Identifier,
    #[default]
    LegalName,
    Status,
    Category,
    Country,
    LastUpdateDate,
}

impl SortBy {
    /// Unknown `sort_by` falls back to legal name (§6).
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("identifier") => SortBy::Identifier,
            Some("legal_name") | Some("legalname") => SortBy::LegalName,
            Some("status") => SortBy::Status,
            Some("category") => SortBy::Category,
            Some("country") => SortBy::Country,
            Some("last_update_date") | Some("lastupdatedate") => SortBy::LastUpdateDate,
            _ => SortBy::LegalName,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// Raw query parameters as received from the external interface, before
/// validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeiListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Validated filter ready to bind into a query.
#[derive(Debug, Clone)]
pub struct ListLeiFilter {
    pub limit: i64,
    pub offset: i64,
    pub search: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl LeiListQuery {
    /// Validate and normalize into a `ListLeiFilter`.
    ///
    /// `limit` must be in `1..=501`; `offset` must be `>= 0`; `country`, when
    /// present, must be exactly 2 letters.
    pub fn validate(self) -> Result<ListLeiFilter> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(CoreError::InvalidInput(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {limit}"
            )));
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(CoreError::InvalidInput(format!(
                "offset must be >= 0, got {offset}"
            )));
        }

        if let Some(country) = &self.country {
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(CoreError::InvalidInput(format!(
                    "country must be a 2-letter code, got {country:?}"
                )));
            }
        }

        Ok(ListLeiFilter {
            limit,
            offset,
            search: self.search.filter(|s| !s.is_empty()),
            status: self.status.filter(|s| !s.is_empty()),
            category: self.category.filter(|s| !s.is_empty()),
            country: self.country.map(|c| c.to_ascii_uppercase()),
            sort_by: SortBy::parse(self.sort_by.as_deref()),
            sort_order: SortOrder::parse(self.sort_order.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_validates_with_defaults() {
        let filter = LeiListQuery::default().validate().unwrap();
        assert_eq!(filter.limit, DEFAULT_LIMIT);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.sort_by, SortBy::LegalName);
        assert_eq!(filter.sort_order, SortOrder::Asc);
    }

    #[test]
    fn limit_above_max_is_rejected() {
        let query = LeiListQuery {
            limit: Some(502),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn limit_zero_is_rejected() {
        let query = LeiListQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn negative_offset_is_rejected() {
        let query = LeiListQuery {
            offset: Some(-1),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn unknown_sort_by_falls_back_to_legal_name() {
        assert_eq!(SortBy::parse(Some("bogus")), SortBy::LegalName);
        assert_eq!(SortBy::parse(None), SortBy::LegalName);
    }

    #[test]
    fn malformed_country_code_is_rejected() {
        let query = LeiListQuery {
            country: Some("USA".to_string()),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn country_code_is_uppercased() {
        let query = LeiListQuery {
            country: Some("us".to_string()),
            ..Default::default()
        };
        let filter = query.validate().unwrap();
        assert_eq!(filter.country, Some("US".to_string()));
    }
}
