//! Trivy JSON report adapter
//!
//! Parses `Results[].Vulnerabilities[]` from `trivy image`/`trivy fs`
//! output. OS package results map to container findings keyed by the image
//! digest; language package results map to SCA findings keyed by package
//! ecosystem.

use serde::Deserialize;

use super::{AdapterError, ParseOutcome, ScannerAdapter, SkipReason};
use crate::domain::finding::{FindingCategory, NormalizedFinding, Severity};

#[derive(Debug, Deserialize)]
struct TrivyReport {
    #[serde(rename = "Results", default)]
    results: Vec<TrivyResult>,
    #[serde(rename = "Metadata", default)]
    metadata: Option<TrivyMetadata>,
}

#[derive(Debug, Deserialize)]
struct TrivyMetadata {
    #[serde(rename = "ImageID", default)]
    image_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrivyResult {
    #[serde(rename = "Target", default)]
    target: Option<String>,
    /// "os-pkgs" or "lang-pkgs"
    #[serde(rename = "Class", default)]
    class: Option<String>,
    /// Package type: "alpine", "npm", "cargo", ...
    #[serde(rename = "Type", default)]
    pkg_type: Option<String>,
    #[serde(rename = "Vulnerabilities", default)]
    vulnerabilities: Vec<TrivyVulnerability>,
}

#[derive(Debug, Deserialize)]
struct TrivyVulnerability {
    #[serde(rename = "VulnerabilityID", default)]
    vulnerability_id: Option<String>,
    #[serde(rename = "PkgName", default)]
    pkg_name: Option<String>,
    #[serde(rename = "InstalledVersion", default)]
    installed_version: Option<String>,
    #[serde(rename = "FixedVersion", default)]
    fixed_version: Option<String>,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Severity", default)]
    severity: Option<String>,
}

pub struct TrivyAdapter;

impl ScannerAdapter for TrivyAdapter {
    fn name(&self) -> &'static str {
        "trivy"
    }

    fn parse(&self, raw: &[u8]) -> Result<ParseOutcome, AdapterError> {
        let report: TrivyReport = serde_json::from_slice(raw)?;
        let image_digest = report.metadata.and_then(|m| m.image_id);

        let mut outcome = ParseOutcome::default();
        let mut entry = 0usize;

        for result in report.results {
            let os_packages = result.class.as_deref() == Some("os-pkgs");
            for vuln in result.vulnerabilities {
                entry += 1;
                if vuln.vulnerability_id.is_none() && vuln.pkg_name.is_none() {
                    outcome.skipped.push(SkipReason {
                        entry,
                        reason: "entry carries neither a vulnerability id nor a package name"
                            .to_string(),
                    });
                    continue;
                }

                let (category, location, ecosystem) = if os_packages {
                    (
                        FindingCategory::Container,
                        image_digest.clone().or_else(|| result.target.clone()),
                        result.pkg_type.clone(),
                    )
                } else {
                    (FindingCategory::Sca, result.target.clone(), result.pkg_type.clone())
                };

                let title = vuln.title.clone().unwrap_or_else(|| {
                    format!(
                        "{} in {}",
                        vuln.vulnerability_id.as_deref().unwrap_or("Vulnerability"),
                        vuln.pkg_name.as_deref().unwrap_or("unknown package")
                    )
                });

                outcome.findings.push(NormalizedFinding {
                    category,
                    title,
                    description: vuln.description.unwrap_or_default(),
                    severity: Severity::parse_lenient(vuln.severity.as_deref().unwrap_or("")),
                    vulnerability_id: vuln.vulnerability_id,
                    package_name: vuln.pkg_name,
                    package_version: vuln.installed_version,
                    package_ecosystem: ecosystem,
                    fix_version: vuln.fixed_version,
                    rule_id: None,
                    location,
                    line_number: None,
                });
            }
        }

        Ok(outcome)
    }
}
