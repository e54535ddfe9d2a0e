//! Discovery of the latest published FULL/DELTA artifact URLs.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactInfo {
    pub url: String,
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
}

/// The provider lists each artifact as an array of publishes (current plus
/// any still-mirrored prior copies); the acquirer always wants the first.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactPublishes {
    pub publishes: Vec<ArtifactInfo>,
}

impl ArtifactPublishes {
    fn latest(&self) -> Result<&ArtifactInfo> {
        self.publishes
            .first()
            .ok_or_else(|| CoreError::DataFormat("artifact has no publishes entries".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeltaFiles {
    pub intraday: ArtifactPublishes,
    pub last_day: ArtifactPublishes,
    pub last_week: ArtifactPublishes,
    pub last_month: ArtifactPublishes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Lei2Publishes {
    pub full: ArtifactPublishes,
    pub delta_files: DeltaFiles,
}

/// The provider's "latest publishes" document, trimmed to the fields the
/// acquirer cares about (the LEI level-2 feed).
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub lei2: Lei2Publishes,
}

/// Which delta window to select. Configurable by contract; default fixed to
/// `LastWeek` (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaWindow {
    Intraday,
    LastDay,
    #[default]
    LastWeek,
    LastMonth,
}

impl DiscoveryDocument {
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| {
            CoreError::DataFormat(format!("malformed discovery document: {e}"))
        })
    }

    pub fn full_artifact(&self) -> Result<&ArtifactInfo> {
        self.lei2.full.latest()
    }

    pub fn delta_artifact(&self, window: DeltaWindow) -> Result<&ArtifactInfo> {
        match window {
            DeltaWindow::Intraday => &self.lei2.delta_files.intraday,
            DeltaWindow::LastDay => &self.lei2.delta_files.last_day,
            DeltaWindow::LastWeek => &self.lei2.delta_files.last_week,
            DeltaWindow::LastMonth => &self.lei2.delta_files.last_month,
        }
        .latest()
    }
}

/// Issue the discovery GET and parse the response.
pub async fn discover(
    client: &reqwest::Client,
    endpoint_url: &str,
) -> Result<DiscoveryDocument> {
    let response = client
        .get(endpoint_url)
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .map_err(CoreError::from)?;

    if !response.status().is_success() {
        return Err(CoreError::Transient(format!(
            "discovery endpoint returned status {}",
            response.status()
        )));
    }

    let body = response.text().await.map_err(CoreError::from)?;
    DiscoveryDocument::parse(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "lei2": {
            "full": {
                "publishes": [
                    { "url": "https://example.org/full.json.zip", "publish_date": "2026-07-20T00:00:00Z" }
                ]
            },
            "delta_files": {
                "intraday": { "publishes": [{ "url": "https://example.org/intraday.json.zip" }] },
                "last_day": { "publishes": [{ "url": "https://example.org/last_day.json.zip" }] },
                "last_week": { "publishes": [{ "url": "https://example.org/last_week.json.zip" }] },
                "last_month": { "publishes": [{ "url": "https://example.org/last_month.json.zip" }] }
            }
        }
    }
    "#;

    #[test]
    fn parses_well_formed_document() {
        let doc = DiscoveryDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.full_artifact().unwrap().url, "https://example.org/full.json.zip");
        assert_eq!(
            doc.delta_artifact(DeltaWindow::LastWeek).unwrap().url,
            "https://example.org/last_week.json.zip"
        );
    }

    #[test]
    fn empty_publishes_array_is_a_data_format_error() {
        let doc = DiscoveryDocument::parse(
            r#"{"lei2":{"full":{"publishes":[]},"delta_files":{
                "intraday":{"publishes":[{"url":"https://example.org/i.zip"}]},
                "last_day":{"publishes":[{"url":"https://example.org/d.zip"}]},
                "last_week":{"publishes":[{"url":"https://example.org/w.zip"}]},
                "last_month":{"publishes":[{"url":"https://example.org/m.zip"}]}
            }}}"#,
        )
        .unwrap();
        assert!(matches!(doc.full_artifact(), Err(CoreError::DataFormat(_))));
    }

    #[test]
    fn malformed_document_is_data_format_error() {
        let err = DiscoveryDocument::parse("{ not json").unwrap_err();
        assert!(matches!(err, CoreError::DataFormat(_)));
    }

    #[test]
    fn default_delta_window_is_last_week() {
        assert_eq!(DeltaWindow::default(), DeltaWindow::LastWeek);
    }
}
