//! CISA Known Exploited Vulnerabilities catalog client

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::{FeedError, KevCatalog, KevEntry};

#[derive(Debug, Deserialize)]
struct KevDocument {
    #[serde(default)]
    vulnerabilities: Vec<KevVulnerability>,
}

#[derive(Debug, Deserialize)]
struct KevVulnerability {
    #[serde(rename = "cveID", default)]
    cve_id: Option<String>,
    #[serde(rename = "dateAdded", default)]
    date_added: Option<String>,
    #[serde(rename = "vulnerabilityName", default)]
    vulnerability_name: Option<String>,
}

/// HTTP client for the KEV catalog JSON
pub struct HttpKevCatalog {
    client: reqwest::Client,
    url: String,
}

impl HttpKevCatalog {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl KevCatalog for HttpKevCatalog {
    async fn fetch(&self) -> Result<HashMap<String, KevEntry>, FeedError> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let document: KevDocument = response
            .json()
            .await
            .map_err(|e| FeedError::Decode(e.to_string()))?;

        let catalog = build_catalog(document);
        debug!(entries = catalog.len(), "KEV catalog snapshot loaded");
        Ok(catalog)
    }
}

fn build_catalog(document: KevDocument) -> HashMap<String, KevEntry> {
    let mut catalog = HashMap::new();
    for vuln in document.vulnerabilities {
        let Some(cve_id) = vuln.cve_id.filter(|id| !id.trim().is_empty()) else {
            continue;
        };
        let date_added = vuln
            .date_added
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());
        catalog.insert(
            cve_id.trim().to_uppercase(),
            KevEntry {
                date_added,
                name: vuln.vulnerability_name.unwrap_or_default(),
            },
        );
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_catalog_keyed_by_cve() {
        let document: KevDocument = serde_json::from_str(
            r#"{
                "title": "CISA Catalog of Known Exploited Vulnerabilities",
                "vulnerabilities": [
                    {
                        "cveID": "cve-2021-44228",
                        "dateAdded": "2021-12-10",
                        "vulnerabilityName": "Apache Log4j2 RCE"
                    },
                    {"vulnerabilityName": "orphan entry"},
                    {"cveID": "CVE-2023-0001", "dateAdded": "bad-date"}
                ]
            }"#,
        )
        .unwrap();

        let catalog = build_catalog(document);
        assert_eq!(catalog.len(), 2);

        let log4j = catalog.get("CVE-2021-44228").unwrap();
        assert_eq!(
            log4j.date_added,
            NaiveDate::from_ymd_opt(2021, 12, 10)
        );
        assert_eq!(log4j.name, "Apache Log4j2 RCE");

        // Unparseable dates degrade to None rather than dropping the entry
        assert!(catalog.get("CVE-2023-0001").unwrap().date_added.is_none());
    }
}
