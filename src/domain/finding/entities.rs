//! Finding entities and lifecycle behavior

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::LifecycleError;
use super::value_objects::{FindingCategory, FindingStatus, Severity};
use crate::domain::fingerprint::{self, FindingIdentity};
use crate::domain::risk;

/// Scanner-agnostic representation of one parsed scan entry.
///
/// Adapters emit these; the fingerprint engine derives identity from them.
/// Free-text fields (title, description) never contribute to identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedFinding {
    pub category: FindingCategory,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// CVE / GHSA / vendor advisory id, when the scanner reports one
    pub vulnerability_id: Option<String>,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    pub package_ecosystem: Option<String>,
    pub fix_version: Option<String>,
    /// SAST rule id or malware signature id
    pub rule_id: Option<String>,
    /// File path (SAST) or image/layer/artifact digest (container, malware)
    pub location: Option<String>,
    pub line_number: Option<u32>,
}

impl NormalizedFinding {
    pub fn identity(&self) -> FindingIdentity<'_> {
        FindingIdentity {
            category: self.category,
            vulnerability_id: self.vulnerability_id.as_deref(),
            package_name: self.package_name.as_deref(),
            package_ecosystem: self.package_ecosystem.as_deref(),
            rule_id: self.rule_id.as_deref(),
            location: self.location.as_deref(),
            line_number: self.line_number,
        }
    }
}

/// One vulnerability instance tracked over the life of a release.
///
/// At most one non-duplicate finding exists per (release, fingerprint); the
/// lifecycle methods below are the only mutation path for `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub release_id: Uuid,
    /// Scan that most recently observed this finding
    pub scan_id: Uuid,
    pub fingerprint: String,
    pub category: FindingCategory,
    pub status: FindingStatus,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub vulnerability_id: Option<String>,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    pub package_ecosystem: Option<String>,
    pub fix_version: Option<String>,
    pub rule_id: Option<String>,
    pub location: Option<String>,
    pub line_number: Option<u32>,
    pub scanner: String,
    /// A mandatory identity field was missing and the fingerprint used the
    /// sentinel token in its place
    pub low_confidence: bool,
    pub epss_score: Option<f64>,
    pub epss_percentile: Option<f64>,
    pub kev_status: bool,
    pub kev_date: Option<NaiveDate>,
    pub risk_score: f64,
    pub triage_note: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub fixed_at: Option<DateTime<Utc>>,
    pub risk_accepted_expires_at: Option<DateTime<Utc>>,
    pub enriched_at: Option<DateTime<Utc>>,
}

impl Finding {
    /// Create a new ACTIVE finding from its first observation.
    pub fn from_observation(
        release_id: Uuid,
        scan_id: Uuid,
        scanner: &str,
        normalized: NormalizedFinding,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let computed = fingerprint::compute(&normalized.identity());
        let mut finding = Self {
            id: Uuid::new_v4(),
            release_id,
            scan_id,
            fingerprint: computed.value,
            category: normalized.category,
            status: FindingStatus::Active,
            severity: normalized.severity,
            title: normalized.title,
            description: normalized.description,
            vulnerability_id: normalized.vulnerability_id,
            package_name: normalized.package_name,
            package_version: normalized.package_version,
            package_ecosystem: normalized.package_ecosystem,
            fix_version: normalized.fix_version,
            rule_id: normalized.rule_id,
            location: normalized.location,
            line_number: normalized.line_number,
            scanner: scanner.to_string(),
            low_confidence: computed.low_confidence,
            epss_score: None,
            epss_percentile: None,
            kev_status: false,
            kev_date: None,
            risk_score: 0.0,
            triage_note: None,
            first_seen_at: observed_at,
            last_seen_at: observed_at,
            fixed_at: None,
            risk_accepted_expires_at: None,
            enriched_at: None,
        };
        finding.recompute_risk();
        finding
    }

    /// Identity fields of this finding, for fingerprint verification.
    pub fn identity(&self) -> FindingIdentity<'_> {
        FindingIdentity {
            category: self.category,
            vulnerability_id: self.vulnerability_id.as_deref(),
            package_name: self.package_name.as_deref(),
            package_ecosystem: self.package_ecosystem.as_deref(),
            rule_id: self.rule_id.as_deref(),
            location: self.location.as_deref(),
            line_number: self.line_number,
        }
    }

    /// Record a re-observation of this fingerprint by a later scan.
    ///
    /// Active findings only advance `last_seen_at`; fixed findings reopen;
    /// triaged findings keep their status (human decisions are never
    /// auto-overridden by re-scanning).
    pub fn observe(&mut self, scan_id: Uuid, observed_at: DateTime<Utc>) {
        self.scan_id = scan_id;
        self.last_seen_at = observed_at;
        if self.status == FindingStatus::Fixed {
            self.status = FindingStatus::Active;
            self.fixed_at = None;
        }
    }

    /// Mark the finding fixed because it was absent from the latest complete
    /// scan from the same scanner.
    pub fn fix(&mut self, fixed_at: DateTime<Utc>) -> Result<(), LifecycleError> {
        if self.status != FindingStatus::Active {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: FindingStatus::Fixed,
            });
        }
        self.status = FindingStatus::Fixed;
        self.fixed_at = Some(fixed_at);
        Ok(())
    }

    /// Human triage: dismiss as a false positive.
    pub fn mark_false_positive(&mut self, note: Option<String>) -> Result<(), LifecycleError> {
        if self.status == FindingStatus::Duplicate {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: FindingStatus::FalsePositive,
            });
        }
        self.status = FindingStatus::FalsePositive;
        self.triage_note = note;
        self.risk_accepted_expires_at = None;
        Ok(())
    }

    /// Human triage: accept the risk, optionally until an expiry deadline.
    pub fn accept_risk(
        &mut self,
        note: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), LifecycleError> {
        if self.status == FindingStatus::Duplicate {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: FindingStatus::RiskAccepted,
            });
        }
        self.status = FindingStatus::RiskAccepted;
        self.triage_note = note;
        self.risk_accepted_expires_at = expires_at;
        Ok(())
    }

    /// Revert an expired risk acceptance back to ACTIVE, keeping an audit
    /// trail in the triage note.
    pub fn expire_risk_acceptance(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if self.status != FindingStatus::RiskAccepted {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: FindingStatus::Active,
            });
        }
        let note = format!(
            "{}\n[risk acceptance expired {}]",
            self.triage_note.as_deref().unwrap_or_default(),
            now.format("%Y-%m-%d %H:%M")
        );
        self.triage_note = Some(note.trim_start().to_string());
        self.risk_accepted_expires_at = None;
        self.status = FindingStatus::Active;
        Ok(())
    }

    /// Reinstate a triaged finding to ACTIVE.
    pub fn reactivate(&mut self, note: Option<String>) -> Result<(), LifecycleError> {
        if !self.status.is_triaged() {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: FindingStatus::Active,
            });
        }
        self.status = FindingStatus::Active;
        self.triage_note = note;
        self.risk_accepted_expires_at = None;
        Ok(())
    }

    /// Collapse this finding into another, marking it a duplicate.
    pub fn mark_duplicate(&mut self) -> Result<(), LifecycleError> {
        if self.status == FindingStatus::Duplicate {
            return Ok(());
        }
        self.status = FindingStatus::Duplicate;
        Ok(())
    }

    /// Whether a risk acceptance deadline has elapsed.
    pub fn risk_acceptance_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == FindingStatus::RiskAccepted
            && self
                .risk_accepted_expires_at
                .map(|deadline| deadline < now)
                .unwrap_or(false)
    }

    /// Recompute the derived risk score from severity, EPSS and KEV.
    pub fn recompute_risk(&mut self) {
        self.risk_score = risk::risk_score(self.severity, self.epss_score, self.kev_status);
    }
}
