//! Human triage operations and the risk-acceptance expiry sweep

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::domain::finding::{Finding, FindingStatus};
use crate::domain::repositories::{FindingFilter, IFindingRepository};

use super::errors::TriageError;

/// Applies human triage decisions to findings.
///
/// Triage decisions are sticky: re-scanning never overrides them, only a
/// later triage call or the expiry sweep does.
pub struct TriageUseCase {
    findings: Arc<dyn IFindingRepository>,
}

impl TriageUseCase {
    pub fn new(findings: Arc<dyn IFindingRepository>) -> Self {
        Self { findings }
    }

    async fn load(&self, id: Uuid) -> Result<Finding, TriageError> {
        self.findings
            .get(id)
            .await?
            .ok_or(TriageError::NotFound(id))
    }

    pub async fn mark_false_positive(
        &self,
        id: Uuid,
        note: Option<String>,
    ) -> Result<Finding, TriageError> {
        let mut finding = self.load(id).await?;
        finding.mark_false_positive(note)?;
        self.findings.update(finding.clone()).await?;
        info!(finding_id = %id, "Finding dismissed as false positive");
        Ok(finding)
    }

    pub async fn accept_risk(
        &self,
        id: Uuid,
        note: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Finding, TriageError> {
        let mut finding = self.load(id).await?;
        finding.accept_risk(note, expires_at)?;
        self.findings.update(finding.clone()).await?;
        info!(finding_id = %id, expires_at = ?expires_at, "Finding risk accepted");
        Ok(finding)
    }

    pub async fn reactivate(&self, id: Uuid, note: Option<String>) -> Result<Finding, TriageError> {
        let mut finding = self.load(id).await?;
        finding.reactivate(note)?;
        self.findings.update(finding.clone()).await?;
        info!(finding_id = %id, "Finding reactivated");
        Ok(finding)
    }

    /// Collapse `duplicate_id` into `canonical_id`.
    ///
    /// Both findings must belong to the same release and the canonical target
    /// must not itself be a duplicate. Collapsing frees the duplicate's
    /// fingerprint slot, so a later scan reporting that fingerprint creates a
    /// fresh row rather than resurrecting the collapsed one.
    pub async fn collapse_duplicate(
        &self,
        duplicate_id: Uuid,
        canonical_id: Uuid,
    ) -> Result<Finding, TriageError> {
        let mut duplicate = self.load(duplicate_id).await?;
        let canonical = self.load(canonical_id).await?;

        if duplicate.release_id != canonical.release_id {
            return Err(TriageError::CrossReleaseDuplicate {
                duplicate: duplicate_id,
                canonical: canonical_id,
            });
        }
        if canonical.status == FindingStatus::Duplicate {
            return Err(TriageError::CanonicalIsDuplicate(canonical_id));
        }

        duplicate.mark_duplicate()?;
        self.findings.update(duplicate.clone()).await?;
        info!(
            finding_id = %duplicate_id,
            canonical_id = %canonical_id,
            "Finding collapsed as duplicate"
        );
        Ok(duplicate)
    }

    /// Revert every RISK_ACCEPTED finding whose deadline has elapsed back to
    /// ACTIVE. Returns how many findings were reverted.
    pub async fn reopen_expired_acceptances(
        &self,
        now: DateTime<Utc>,
    ) -> Result<usize, TriageError> {
        let filter = FindingFilter::default().with_statuses(&[FindingStatus::RiskAccepted]);
        let mut reopened = 0;
        for mut finding in self.findings.list(&filter).await? {
            if !finding.risk_acceptance_expired(now) {
                continue;
            }
            finding.expire_risk_acceptance(now)?;
            self.findings.update(finding.clone()).await?;
            info!(finding_id = %finding.id, "Risk acceptance expired, finding reopened");
            reopened += 1;
        }
        if reopened > 0 {
            info!(reopened, "Risk acceptance sweep complete");
        }
        Ok(reopened)
    }
}
