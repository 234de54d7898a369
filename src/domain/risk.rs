//! Risk score combination
//!
//! Pure function over severity, EPSS probability and KEV membership. The
//! exact weights are an internal tuning choice; the contract is that the
//! score is monotone in severity and EPSS and strictly increased by KEV.

use super::finding::value_objects::Severity;

const KEV_BONUS: f64 = 2.0;
const MAX_SCORE: f64 = 25.0;

/// Base weight for a severity level
pub fn severity_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 10.0,
        Severity::High => 7.5,
        Severity::Medium => 5.0,
        Severity::Low => 2.5,
        Severity::Info => 0.5,
    }
}

/// Combine severity, EPSS and KEV into a single risk score in `[0, 25]`.
///
/// Recomputed whenever any input changes; no side effects beyond the stored
/// result field on the finding.
pub fn risk_score(severity: Severity, epss_score: Option<f64>, kev: bool) -> f64 {
    let epss = epss_score.unwrap_or(0.0).clamp(0.0, 1.0);
    let mut score = severity_weight(severity) * (1.0 + epss);
    if kev {
        score += KEV_BONUS;
    }
    score.clamp(0.0, MAX_SCORE)
}
