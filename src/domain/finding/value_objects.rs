//! Finding value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a finding, as reported by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Parse a scanner-reported severity string, tolerating case and
    /// common vendor spellings. Unknown values map to `Info`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" | "ERROR" => Severity::High,
            "MEDIUM" | "MODERATE" | "WARNING" => Severity::Medium,
            "LOW" => Severity::Low,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingStatus {
    Active,
    Fixed,
    FalsePositive,
    RiskAccepted,
    Duplicate,
}

impl FindingStatus {
    /// Statuses set by human triage. Re-scanning never overrides them.
    pub fn is_triaged(&self) -> bool {
        matches!(self, FindingStatus::FalsePositive | FindingStatus::RiskAccepted)
    }

    /// Statuses still eligible for threat-intel enrichment
    pub fn is_enrichable(&self) -> bool {
        !matches!(self, FindingStatus::Fixed | FindingStatus::Duplicate)
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FindingStatus::Active => "ACTIVE",
            FindingStatus::Fixed => "FIXED",
            FindingStatus::FalsePositive => "FALSE_POSITIVE",
            FindingStatus::RiskAccepted => "RISK_ACCEPTED",
            FindingStatus::Duplicate => "DUPLICATE",
        };
        write!(f, "{}", s)
    }
}

/// Category of a finding, determining which identity fields drive the
/// fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    /// Dependency vulnerability (SCA)
    Sca,
    /// Static analysis result (SAST)
    Sast,
    /// Container or image layer vulnerability
    Container,
    /// Malware or signature match
    Malware,
}

impl FindingCategory {
    /// Stable discriminant mixed into the fingerprint so identical field
    /// tuples from different categories never collide.
    pub fn discriminant(&self) -> &'static str {
        match self {
            FindingCategory::Sca => "sca",
            FindingCategory::Sast => "sast",
            FindingCategory::Container => "container",
            FindingCategory::Malware => "malware",
        }
    }
}
