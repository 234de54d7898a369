//! Semgrep CLI JSON adapter
//!
//! Maps `results[]` (check_id, path, start position, extra) to SAST
//! findings. Severity follows Semgrep's ERROR/WARNING/INFO scale.

use serde::Deserialize;

use super::{AdapterError, ParseOutcome, ScannerAdapter, SkipReason};
use crate::domain::finding::{FindingCategory, NormalizedFinding, Severity};

#[derive(Debug, Deserialize)]
struct SemgrepOutput {
    #[serde(default)]
    results: Vec<SemgrepResult>,
}

#[derive(Debug, Deserialize)]
struct SemgrepResult {
    #[serde(default)]
    check_id: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    start: Option<Position>,
    #[serde(default)]
    extra: Option<SemgrepExtra>,
}

#[derive(Debug, Deserialize)]
struct Position {
    #[serde(default)]
    line: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SemgrepExtra {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    severity: Option<String>,
}

pub struct SemgrepAdapter;

impl ScannerAdapter for SemgrepAdapter {
    fn name(&self) -> &'static str {
        "semgrep"
    }

    fn parse(&self, raw: &[u8]) -> Result<ParseOutcome, AdapterError> {
        let output: SemgrepOutput = serde_json::from_slice(raw)?;
        let mut outcome = ParseOutcome::default();

        for (index, result) in output.results.into_iter().enumerate() {
            let entry = index + 1;
            if result.check_id.is_none() && result.path.is_none() {
                outcome.skipped.push(SkipReason {
                    entry,
                    reason: "result carries neither check_id nor path".to_string(),
                });
                continue;
            }

            let message = result
                .extra
                .as_ref()
                .and_then(|e| e.message.clone())
                .unwrap_or_default();
            let severity = result
                .extra
                .as_ref()
                .and_then(|e| e.severity.as_deref())
                .unwrap_or("INFO");

            let rule_id = result.check_id.clone();
            let title = match (&rule_id, &result.path) {
                (Some(rule), Some(path)) => format!("{} at {}", rule, path),
                (Some(rule), None) => rule.clone(),
                (None, Some(path)) => format!("Static analysis finding in {}", path),
                (None, None) => unreachable!("skipped above"),
            };

            outcome.findings.push(NormalizedFinding {
                category: FindingCategory::Sast,
                title,
                description: message,
                severity: Severity::parse_lenient(severity),
                vulnerability_id: None,
                package_name: None,
                package_version: None,
                package_ecosystem: None,
                fix_version: None,
                rule_id,
                location: result.path,
                line_number: result.start.and_then(|s| s.line),
            });
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_results_with_positions() {
        let raw = r#"{
            "results": [
                {
                    "check_id": "python.django.security.injection.sql",
                    "path": "app/views.py",
                    "start": {"line": 42, "col": 5},
                    "end": {"line": 42, "col": 30},
                    "extra": {"message": "Avoid raw SQL", "severity": "ERROR"}
                },
                {}
            ],
            "errors": []
        }"#;
        let outcome = SemgrepAdapter.parse(raw.as_bytes()).unwrap();
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);

        let finding = &outcome.findings[0];
        assert_eq!(finding.category, FindingCategory::Sast);
        assert_eq!(
            finding.rule_id.as_deref(),
            Some("python.django.security.injection.sql")
        );
        assert_eq!(finding.location.as_deref(), Some("app/views.py"));
        assert_eq!(finding.line_number, Some(42));
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn empty_results_are_fine() {
        let outcome = SemgrepAdapter.parse(br#"{"results": []}"#).unwrap();
        assert!(outcome.findings.is_empty());
    }
}
