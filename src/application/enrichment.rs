//! Threat-intelligence enrichment pipeline
//!
//! One run downloads the EPSS and KEV feeds, then walks the enrichable
//! findings in bounded batches, writing per-finding intel through the store's
//! conditional update. A failed feed leaves the affected fields untouched so
//! the next scheduled run can retry; the run itself still proceeds with
//! whichever feed succeeded.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::EnrichmentConfig;
use crate::domain::finding::{Finding, FindingStatus};
use crate::domain::repositories::{EnrichmentUpdate, FindingFilter, IFindingRepository};
use crate::infrastructure::feeds::{EpssFeed, EpssRecord, KevCatalog, KevEntry};

use super::errors::EnrichmentError;

/// Outcome of one enrichment run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Findings examined against the feeds
    pub examined: usize,
    /// Findings whose intel actually changed
    pub updated: usize,
    pub epss_available: bool,
    pub kev_available: bool,
}

/// Enriches findings with EPSS scores and KEV listings.
pub struct EnrichFindingsUseCase {
    findings: Arc<dyn IFindingRepository>,
    epss: Arc<dyn EpssFeed>,
    kev: Arc<dyn KevCatalog>,
    config: EnrichmentConfig,
}

impl EnrichFindingsUseCase {
    pub fn new(
        findings: Arc<dyn IFindingRepository>,
        epss: Arc<dyn EpssFeed>,
        kev: Arc<dyn KevCatalog>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            findings,
            epss,
            kev,
            config,
        }
    }

    pub async fn execute(&self) -> Result<EnrichmentSummary, EnrichmentError> {
        let epss = match self.epss.fetch().await {
            Ok(records) => {
                info!(records = records.len(), "EPSS feed loaded");
                Some(records)
            }
            Err(err) => {
                warn!(error = %err, "EPSS feed unavailable, keeping previous scores");
                None
            }
        };
        let kev = match self.kev.fetch().await {
            Ok(catalog) => {
                info!(entries = catalog.len(), "KEV catalog loaded");
                Some(catalog)
            }
            Err(err) => {
                warn!(error = %err, "KEV catalog unavailable, keeping previous listings");
                None
            }
        };

        let mut summary = EnrichmentSummary {
            epss_available: epss.is_some(),
            kev_available: kev.is_some(),
            ..EnrichmentSummary::default()
        };
        if epss.is_none() && kev.is_none() {
            return Ok(summary);
        }

        let filter = FindingFilter::default().with_statuses(&[
            FindingStatus::Active,
            FindingStatus::FalsePositive,
            FindingStatus::RiskAccepted,
        ]);
        let candidates: Vec<Finding> = self
            .findings
            .list(&filter)
            .await?
            .into_iter()
            .filter(|f| f.vulnerability_id.is_some())
            .collect();

        let epss = epss.map(Arc::new);
        let kev = kev.map(Arc::new);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));

        for batch in candidates.chunks(self.config.batch_size) {
            let mut tasks = Vec::with_capacity(batch.len());
            for finding in batch {
                let update = build_update(finding, epss.as_deref(), kev.as_deref());
                let findings = Arc::clone(&self.findings);
                let semaphore = Arc::clone(&semaphore);
                let id = finding.id;
                tasks.push(tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(err) => {
                            // Closed semaphore: skip rather than writing
                            // outside the concurrency bound
                            warn!(finding_id = %id, error = %err, "Enrichment pool closed, skipping write");
                            return Ok(false);
                        }
                    };
                    findings.apply_enrichment(id, update).await
                }));
            }
            for task in tasks {
                match task.await {
                    Ok(Ok(written)) => {
                        summary.examined += 1;
                        if written {
                            summary.updated += 1;
                        }
                    }
                    Ok(Err(err)) => {
                        // A vanished finding is not fatal to the run
                        warn!(error = %err, "Enrichment write failed");
                        summary.examined += 1;
                    }
                    Err(err) => warn!(error = %err, "Enrichment task panicked"),
                }
            }
        }

        info!(
            examined = summary.examined,
            updated = summary.updated,
            "Enrichment run complete"
        );
        Ok(summary)
    }
}

/// Compute the target intel for one finding.
///
/// An available feed is authoritative: absence from it clears the field,
/// covering CVEs delisted since the last run. An unavailable feed preserves
/// whatever the finding already carries.
fn build_update(
    finding: &Finding,
    epss: Option<&HashMap<String, EpssRecord>>,
    kev: Option<&HashMap<String, KevEntry>>,
) -> EnrichmentUpdate {
    let cve = finding
        .vulnerability_id
        .as_deref()
        .unwrap_or_default()
        .to_ascii_uppercase();

    let (epss_score, epss_percentile) = match epss {
        Some(records) => match records.get(&cve) {
            Some(record) => (Some(record.score), Some(record.percentile)),
            None => (None, None),
        },
        None => (finding.epss_score, finding.epss_percentile),
    };

    let (kev_status, kev_date) = match kev {
        Some(catalog) => match catalog.get(&cve) {
            Some(entry) => (true, entry.date_added),
            None => (false, None),
        },
        None => (finding.kev_status, finding.kev_date),
    };

    EnrichmentUpdate {
        epss_score,
        epss_percentile,
        kev_status,
        kev_date,
        enriched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::finding::{FindingCategory, NormalizedFinding, Severity};
    use uuid::Uuid;

    fn finding_with_cve(cve: &str) -> Finding {
        let normalized = NormalizedFinding {
            category: FindingCategory::Sca,
            title: cve.to_string(),
            description: String::new(),
            severity: Severity::High,
            vulnerability_id: Some(cve.to_string()),
            package_name: Some("lodash".to_string()),
            package_version: None,
            package_ecosystem: Some("npm".to_string()),
            fix_version: None,
            rule_id: None,
            location: None,
            line_number: None,
        };
        Finding::from_observation(Uuid::new_v4(), Uuid::new_v4(), "trivy", normalized, Utc::now())
    }

    #[test]
    fn available_feed_clears_delisted_cve() {
        let mut finding = finding_with_cve("CVE-2024-9");
        finding.epss_score = Some(0.5);
        finding.kev_status = true;

        let update = build_update(&finding, Some(&HashMap::new()), Some(&HashMap::new()));
        assert_eq!(update.epss_score, None);
        assert!(!update.kev_status);
    }

    #[test]
    fn unavailable_feed_preserves_existing_intel() {
        let mut finding = finding_with_cve("CVE-2024-9");
        finding.epss_score = Some(0.5);
        finding.epss_percentile = Some(0.8);
        finding.kev_status = true;

        let update = build_update(&finding, None, None);
        assert_eq!(update.epss_score, Some(0.5));
        assert_eq!(update.epss_percentile, Some(0.8));
        assert!(update.kev_status);
    }

    #[test]
    fn cve_lookup_is_case_insensitive() {
        let finding = finding_with_cve("cve-2024-9");
        let mut records = HashMap::new();
        records.insert(
            "CVE-2024-9".to_string(),
            EpssRecord {
                score: 0.75,
                percentile: 0.98,
            },
        );
        let update = build_update(&finding, Some(&records), None);
        assert_eq!(update.epss_score, Some(0.75));
    }
}
