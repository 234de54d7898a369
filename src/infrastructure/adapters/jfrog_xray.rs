//! JFrog Xray export adapter
//!
//! Xray reports use `data[]` entries whose `source_comp_id` encodes the
//! package coordinates behind a protocol prefix (`gav://`, `deb://`,
//! `npm://`). CVE details sit under `component_versions.more_details.cves`.

use serde::Deserialize;

use super::{AdapterError, ParseOutcome, ScannerAdapter, SkipReason};
use crate::domain::finding::{FindingCategory, NormalizedFinding, Severity};

#[derive(Debug, Deserialize)]
struct XrayReport {
    #[serde(default)]
    data: Vec<XrayIssue>,
}

#[derive(Debug, Deserialize)]
struct XrayIssue {
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    component: Option<String>,
    #[serde(default)]
    source_comp_id: Option<String>,
    #[serde(default)]
    component_versions: Option<XrayComponentVersions>,
}

#[derive(Debug, Deserialize)]
struct XrayComponentVersions {
    #[serde(default)]
    fixed_versions: Vec<String>,
    #[serde(default)]
    more_details: Option<XrayMoreDetails>,
}

#[derive(Debug, Deserialize)]
struct XrayMoreDetails {
    #[serde(default)]
    cves: Vec<XrayCve>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XrayCve {
    #[serde(default)]
    cve: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Split `source_comp_id` into (name, version, ecosystem).
///
/// - `gav://group:artifact:version` → Maven coordinates
/// - `deb://distro:suite:package:version...` → Debian packages
/// - `npm://name@version` → npm
/// - anything else: keep the component name, version unknown
fn split_component_id(
    source_comp_id: Option<&str>,
    component: Option<&str>,
) -> (Option<String>, Option<String>, Option<String>) {
    let Some(comp_id) = source_comp_id else {
        return (component.map(str::to_string), None, None);
    };
    let Some((protocol, path)) = comp_id.split_once("://") else {
        return (component.map(str::to_string), None, None);
    };

    match protocol {
        "gav" => {
            let parts: Vec<&str> = path.split(':').collect();
            if parts.len() >= 3 {
                (
                    Some(parts[..parts.len() - 1].join(":")),
                    Some(parts[parts.len() - 1].to_string()),
                    Some("maven".to_string()),
                )
            } else {
                (Some(path.to_string()), None, Some("maven".to_string()))
            }
        }
        "deb" => {
            let parts: Vec<&str> = path.split(':').collect();
            if parts.len() >= 4 {
                (
                    Some(parts[..3].join(":")),
                    Some(parts[3..].join(":")),
                    Some("debian".to_string()),
                )
            } else {
                (Some(path.to_string()), None, Some("debian".to_string()))
            }
        }
        "npm" => match path.rsplit_once('@') {
            Some((name, version)) if !name.is_empty() => (
                Some(name.to_string()),
                Some(version.to_string()),
                Some("npm".to_string()),
            ),
            _ => (Some(path.to_string()), None, Some("npm".to_string())),
        },
        other => (
            component.map(str::to_string).or_else(|| Some(path.to_string())),
            None,
            Some(other.to_string()),
        ),
    }
}

pub struct JfrogXrayAdapter;

impl ScannerAdapter for JfrogXrayAdapter {
    fn name(&self) -> &'static str {
        "jfrog-xray"
    }

    fn parse(&self, raw: &[u8]) -> Result<ParseOutcome, AdapterError> {
        let report: XrayReport = serde_json::from_slice(raw)?;
        let mut outcome = ParseOutcome::default();

        for (index, issue) in report.data.into_iter().enumerate() {
            let entry = index + 1;
            if issue.component.is_none() && issue.source_comp_id.is_none() {
                outcome.skipped.push(SkipReason {
                    entry,
                    reason: "entry has no component identification".to_string(),
                });
                continue;
            }

            let (name, version, ecosystem) =
                split_component_id(issue.source_comp_id.as_deref(), issue.component.as_deref());

            let more_details = issue
                .component_versions
                .as_ref()
                .and_then(|cv| cv.more_details.as_ref());
            let first_cve = more_details.and_then(|d| d.cves.first());
            let vulnerability_id = first_cve
                .and_then(|c| c.cve.clone())
                .filter(|id| !id.trim().is_empty());
            let description = first_cve
                .and_then(|c| c.description.clone())
                .or_else(|| more_details.and_then(|d| d.description.clone()))
                .or_else(|| issue.summary.clone())
                .unwrap_or_default();

            let fix_version = issue
                .component_versions
                .as_ref()
                .and_then(|cv| cv.fixed_versions.first())
                .map(|v| v.trim_start_matches(['≥', '≤', '<', '>', ' ']).to_string());

            outcome.findings.push(NormalizedFinding {
                category: FindingCategory::Sca,
                title: issue
                    .summary
                    .unwrap_or_else(|| "Unknown vulnerability".to_string()),
                description,
                severity: Severity::parse_lenient(issue.severity.as_deref().unwrap_or("")),
                vulnerability_id,
                package_name: name,
                package_version: version,
                package_ecosystem: ecosystem,
                fix_version,
                rule_id: None,
                location: None,
                line_number: None,
            });
        }

        Ok(outcome)
    }
}
