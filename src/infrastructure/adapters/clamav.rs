//! ClamAV JSON report adapter
//!
//! Parses `detections[]` entries (signature name + file hash) into malware
//! findings. Identity is the signature plus the artifact digest, so the same
//! sample re-detected across scans dedupes cleanly.

use serde::Deserialize;

use super::{AdapterError, ParseOutcome, ScannerAdapter, SkipReason};
use crate::domain::finding::{FindingCategory, NormalizedFinding, Severity};

#[derive(Debug, Deserialize)]
struct ClamAvReport {
    #[serde(default)]
    detections: Vec<ClamAvDetection>,
}

#[derive(Debug, Deserialize)]
struct ClamAvDetection {
    /// Signature name, e.g. "Win.Trojan.Emotet-9837923-0"
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    path: Option<String>,
    /// SHA-256 of the detected artifact
    #[serde(default)]
    sha256: Option<String>,
}

pub struct ClamAvAdapter;

impl ScannerAdapter for ClamAvAdapter {
    fn name(&self) -> &'static str {
        "clamav"
    }

    fn parse(&self, raw: &[u8]) -> Result<ParseOutcome, AdapterError> {
        let report: ClamAvReport = serde_json::from_slice(raw)?;
        let mut outcome = ParseOutcome::default();

        for (index, detection) in report.detections.into_iter().enumerate() {
            let entry = index + 1;
            if detection.signature.is_none() && detection.sha256.is_none() {
                outcome.skipped.push(SkipReason {
                    entry,
                    reason: "detection carries neither signature nor artifact digest".to_string(),
                });
                continue;
            }

            let signature = detection.signature.clone();
            let title = match (&signature, &detection.path) {
                (Some(sig), Some(path)) => format!("{} detected in {}", sig, path),
                (Some(sig), None) => format!("{} detected", sig),
                (None, Some(path)) => format!("Malware detected in {}", path),
                (None, None) => unreachable!("skipped above"),
            };

            outcome.findings.push(NormalizedFinding {
                category: FindingCategory::Malware,
                title,
                description: detection.path.clone().unwrap_or_default(),
                // Malware presence is always treated as critical
                severity: Severity::Critical,
                vulnerability_id: None,
                package_name: None,
                package_version: None,
                package_ecosystem: None,
                fix_version: None,
                rule_id: signature,
                location: detection.sha256,
                line_number: None,
            });
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detections() {
        let raw = r#"{
            "detections": [
                {
                    "signature": "Win.Trojan.Emotet-9837923-0",
                    "path": "build/artifact.exe",
                    "sha256": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
                },
                {"path": "unscannable.bin"}
            ]
        }"#;
        let outcome = ClamAvAdapter.parse(raw.as_bytes()).unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);

        let finding = &outcome.findings[0];
        assert_eq!(finding.category, FindingCategory::Malware);
        assert_eq!(finding.severity, Severity::Critical);
        assert_eq!(
            finding.rule_id.as_deref(),
            Some("Win.Trojan.Emotet-9837923-0")
        );
        assert!(finding.location.as_deref().unwrap().starts_with("9f86d081"));
    }
}
