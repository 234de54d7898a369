//! Scan ingestion: parse, deduplicate, reconcile lifecycle
//!
//! One execution covers the full pipeline for a single upload: adapter
//! resolution, payload parsing, in-batch duplicate collapsing, per-fingerprint
//! create/observe reconciliation and fixed-by-absence. Writes for a release
//! are serialized through a per-release lock so two concurrent uploads cannot
//! interleave their reconciliation; as a second line of defense the store's
//! unique (release, fingerprint) constraint is honored with a single
//! read-again retry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::IngestionConfig;
use crate::domain::finding::{Finding, FindingStatus, NormalizedFinding};
use crate::domain::fingerprint;
use crate::domain::release::{Scan, ScanCounters, ScanStatus};
use crate::domain::repositories::{
    FindingFilter, IFindingRepository, IReleaseRepository, IScanRepository, StoreError,
};
use crate::infrastructure::adapters::{AdapterRegistry, SkipReason};

use super::errors::IngestError;

/// One scan upload
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub release_id: Uuid,
    /// Scanner tag selecting the adapter, e.g. "trivy"
    pub scanner: String,
    pub payload: Vec<u8>,
    /// Whether the payload is a complete snapshot of the scanner's view.
    /// Partial payloads never drive fixed-by-absence.
    pub complete: bool,
}

impl IngestRequest {
    pub fn new(release_id: Uuid, scanner: &str, payload: Vec<u8>) -> Self {
        Self {
            release_id,
            scanner: scanner.to_string(),
            payload,
            complete: true,
        }
    }

    pub fn partial(mut self) -> Self {
        self.complete = false;
        self
    }
}

/// Outcome of one ingestion run
#[derive(Debug)]
pub struct IngestSummary {
    pub scan_id: Uuid,
    pub counters: ScanCounters,
    pub skip_reasons: Vec<SkipReason>,
    /// Set when a non-empty payload yielded zero findings, which usually
    /// means a scanner output format drifted
    pub warning: Option<String>,
}

/// Ingests scanner payloads into the finding lifecycle.
pub struct IngestScanUseCase {
    findings: Arc<dyn IFindingRepository>,
    scans: Arc<dyn IScanRepository>,
    releases: Arc<dyn IReleaseRepository>,
    registry: AdapterRegistry,
    config: IngestionConfig,
    release_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl IngestScanUseCase {
    pub fn new(
        findings: Arc<dyn IFindingRepository>,
        scans: Arc<dyn IScanRepository>,
        releases: Arc<dyn IReleaseRepository>,
        registry: AdapterRegistry,
        config: IngestionConfig,
    ) -> Self {
        Self {
            findings,
            scans,
            releases,
            registry,
            config,
            release_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Lock guarding all finding writes of one release
    async fn lock_for(&self, release_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.release_locks.lock().await;
        locks.entry(release_id).or_default().clone()
    }

    pub async fn execute(&self, request: IngestRequest) -> Result<IngestSummary, IngestError> {
        let limit = self.config.max_payload_mb * 1024 * 1024;
        if request.payload.len() > limit {
            return Err(IngestError::PayloadTooLarge {
                size: request.payload.len(),
                limit,
            });
        }

        if self
            .releases
            .get_release(request.release_id)
            .await?
            .is_none()
        {
            return Err(IngestError::ReleaseNotFound(request.release_id));
        }

        let adapter = self
            .registry
            .resolve(&request.scanner)
            .ok_or_else(|| IngestError::UnknownScanner(request.scanner.clone()))?;

        let mut scan = Scan::new(request.release_id, &request.scanner, request.complete, Utc::now());
        let scan_id = scan.id;
        IScanRepository::insert(self.scans.as_ref(), scan.clone()).await?;

        scan.status = ScanStatus::Processing;
        IScanRepository::update(self.scans.as_ref(), scan.clone()).await?;

        info!(
            scan_id = %scan_id,
            release_id = %request.release_id,
            scanner = %request.scanner,
            complete = request.complete,
            bytes = request.payload.len(),
            "Ingesting scan"
        );

        let outcome = match adapter.parse(&request.payload) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(scan_id = %scan_id, error = %err, "Scan payload rejected");
                scan.status = ScanStatus::Failed;
                scan.completed_at = Some(Utc::now());
                IScanRepository::update(self.scans.as_ref(), scan).await?;
                return Err(err.into());
            }
        };

        let mut counters = ScanCounters {
            parsed: outcome.findings.len(),
            skipped: outcome.skipped.len(),
            ..ScanCounters::default()
        };

        let (batch, collapsed) = collapse_batch(outcome.findings);
        counters.duplicates_collapsed = collapsed;

        let lock = self.lock_for(request.release_id).await;
        let _guard = lock.lock().await;

        // All lifecycle timestamps of this batch agree with the scan record
        let observed_at = scan.uploaded_at;
        let mut seen = HashSet::new();
        for (fingerprint, normalized) in batch {
            seen.insert(fingerprint.clone());
            let existing = self
                .findings
                .find_by_fingerprint(request.release_id, &fingerprint)
                .await?;
            match existing {
                Some(mut finding) => {
                    finding.observe(scan_id, observed_at);
                    self.findings.update(finding).await?;
                    counters.updated += 1;
                }
                None => {
                    let finding = Finding::from_observation(
                        request.release_id,
                        scan_id,
                        &request.scanner,
                        normalized,
                        observed_at,
                    );
                    match self.findings.insert(finding).await {
                        Ok(()) => counters.created += 1,
                        Err(StoreError::FingerprintConflict { .. }) => {
                            // Lost a race with a concurrent writer; the row
                            // now exists, so observe it instead
                            let mut finding = self
                                .findings
                                .find_by_fingerprint(request.release_id, &fingerprint)
                                .await?
                                .ok_or(IngestError::ConcurrencyConflict {
                                    fingerprint: fingerprint.clone(),
                                })?;
                            finding.observe(scan_id, observed_at);
                            self.findings.update(finding).await?;
                            counters.updated += 1;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
            }
        }

        if request.complete {
            counters.fixed = self
                .fix_absent(request.release_id, &request.scanner, &seen, observed_at)
                .await?;
        }

        drop(_guard);

        let warning = if counters.parsed == 0
            && !request.payload.is_empty()
            && self.config.warn_on_empty_batch
        {
            let message = format!(
                "Scanner {:?} produced zero findings from a non-empty payload",
                request.scanner
            );
            warn!(scan_id = %scan_id, "{message}");
            Some(message)
        } else {
            None
        };

        scan.status = ScanStatus::Completed;
        scan.completed_at = Some(Utc::now());
        scan.counters = counters;
        IScanRepository::update(self.scans.as_ref(), scan).await?;

        info!(
            scan_id = %scan_id,
            created = counters.created,
            updated = counters.updated,
            fixed = counters.fixed,
            skipped = counters.skipped,
            duplicates_collapsed = counters.duplicates_collapsed,
            "Scan ingested"
        );

        Ok(IngestSummary {
            scan_id,
            counters,
            skip_reasons: outcome.skipped,
            warning,
        })
    }

    /// Mark ACTIVE findings from the same scanner fixed when the latest
    /// complete snapshot no longer reports them.
    async fn fix_absent(
        &self,
        release_id: Uuid,
        scanner: &str,
        seen: &HashSet<String>,
        fixed_at: DateTime<Utc>,
    ) -> Result<usize, IngestError> {
        let filter = FindingFilter {
            release_id: Some(release_id),
            statuses: vec![FindingStatus::Active],
            scanner: Some(scanner.to_string()),
            ..FindingFilter::default()
        };
        let mut fixed = 0;
        for mut finding in self.findings.list(&filter).await? {
            if seen.contains(&finding.fingerprint) {
                continue;
            }
            if finding.fix(fixed_at).is_ok() {
                debug!(finding_id = %finding.id, fingerprint = %finding.fingerprint, "Fixed by absence");
                self.findings.update(finding).await?;
                fixed += 1;
            }
        }
        Ok(fixed)
    }
}

/// Collapse same-fingerprint entries within one batch, keeping the first
/// occurrence. Returns the deduplicated batch keyed by fingerprint plus the
/// collapsed count.
fn collapse_batch(findings: Vec<NormalizedFinding>) -> (Vec<(String, NormalizedFinding)>, usize) {
    let mut seen = HashSet::new();
    let mut batch = Vec::with_capacity(findings.len());
    let mut collapsed = 0;
    for normalized in findings {
        let computed = fingerprint::compute(&normalized.identity());
        if seen.insert(computed.value.clone()) {
            batch.push((computed.value, normalized));
        } else {
            collapsed += 1;
        }
    }
    (batch, collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::finding::{FindingCategory, Severity};

    fn sca(vuln: &str) -> NormalizedFinding {
        NormalizedFinding {
            category: FindingCategory::Sca,
            title: vuln.to_string(),
            description: String::new(),
            severity: Severity::High,
            vulnerability_id: Some(vuln.to_string()),
            package_name: Some("lodash".to_string()),
            package_version: Some("4.17.20".to_string()),
            package_ecosystem: Some("npm".to_string()),
            fix_version: None,
            rule_id: None,
            location: None,
            line_number: None,
        }
    }

    #[test]
    fn collapse_keeps_first_occurrence() {
        let (batch, collapsed) =
            collapse_batch(vec![sca("CVE-2024-1"), sca("CVE-2024-1"), sca("CVE-2024-2")]);
        assert_eq!(batch.len(), 2);
        assert_eq!(collapsed, 1);
    }

    #[test]
    fn collapse_of_empty_batch_is_empty() {
        let (batch, collapsed) = collapse_batch(vec![]);
        assert!(batch.is_empty());
        assert_eq!(collapsed, 0);
    }
}
