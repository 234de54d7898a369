//! Read-side queries: release risk statistics

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::finding::{FindingStatus, Severity};
use crate::domain::repositories::{FindingFilter, IFindingRepository, StoreError};

/// EPSS probability at or above which a finding counts as "likely exploited"
pub const HIGH_EPSS_THRESHOLD: f64 = 0.7;

/// Aggregate risk picture of one release, computed over its ACTIVE findings
#[derive(Debug, Default, PartialEq)]
pub struct ReleaseRiskStats {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    /// Findings listed in the KEV catalog
    pub kev: usize,
    /// Findings with EPSS at or above [`HIGH_EPSS_THRESHOLD`]
    pub high_epss: usize,
    pub max_risk_score: f64,
}

/// Computes risk statistics for releases.
pub struct ReleaseRiskQuery {
    findings: Arc<dyn IFindingRepository>,
}

impl ReleaseRiskQuery {
    pub fn new(findings: Arc<dyn IFindingRepository>) -> Self {
        Self { findings }
    }

    pub async fn stats(&self, release_id: Uuid) -> Result<ReleaseRiskStats, StoreError> {
        let filter =
            FindingFilter::for_release(release_id).with_statuses(&[FindingStatus::Active]);
        let mut stats = ReleaseRiskStats::default();
        for finding in self.findings.list(&filter).await? {
            stats.total += 1;
            match finding.severity {
                Severity::Critical => stats.critical += 1,
                Severity::High => stats.high += 1,
                Severity::Medium => stats.medium += 1,
                Severity::Low => stats.low += 1,
                Severity::Info => stats.info += 1,
            }
            if finding.kev_status {
                stats.kev += 1;
            }
            if finding
                .epss_score
                .is_some_and(|epss| epss >= HIGH_EPSS_THRESHOLD)
            {
                stats.high_epss += 1;
            }
            if finding.risk_score > stats.max_risk_score {
                stats.max_risk_score = finding.risk_score;
            }
        }
        Ok(stats)
    }
}
