//! Deterministic identity hashing for findings
//!
//! Repeated scans of the same release must recognize recurring
//! vulnerabilities. The fingerprint selects canonical identity fields per
//! finding category, normalizes them (lowercase, trim, fixed order), and
//! hashes the joined tuple with SHA-256. Missing fields are replaced by an
//! explicit sentinel token rather than omitted, so a missing middle field can
//! never shift later fields into its place and collide with a different
//! tuple.

use sha2::{Digest, Sha256};

use super::finding::value_objects::FindingCategory;

/// Sentinel substituted for an absent identity field
const MISSING: &str = "\u{2205}";

/// Separator between normalized identity fields
const SEPARATOR: &str = "|";

/// Borrowed view of the fields that determine a finding's identity
#[derive(Debug, Clone, Copy)]
pub struct FindingIdentity<'a> {
    pub category: FindingCategory,
    pub vulnerability_id: Option<&'a str>,
    pub package_name: Option<&'a str>,
    pub package_ecosystem: Option<&'a str>,
    pub rule_id: Option<&'a str>,
    pub location: Option<&'a str>,
    pub line_number: Option<u32>,
}

/// A computed fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedFingerprint {
    /// Hex-encoded SHA-256 over the canonical identity tuple
    pub value: String,
    /// A mandatory identity field was absent and the sentinel was used
    pub low_confidence: bool,
}

fn normalize(field: Option<&str>) -> String {
    match field {
        Some(value) if !value.trim().is_empty() => value.trim().to_lowercase(),
        _ => MISSING.to_string(),
    }
}

/// Present means the sentinel will not be substituted: the field exists and
/// trims to something non-empty. Must stay in lockstep with [`normalize`].
fn present(field: Option<&str>) -> bool {
    field.is_some_and(|value| !value.trim().is_empty())
}

fn normalize_line(line: Option<u32>) -> String {
    match line {
        Some(n) => n.to_string(),
        None => MISSING.to_string(),
    }
}

/// Compute the identity fingerprint for a finding.
///
/// Identical identity tuples always yield identical fingerprints; differing
/// tuples differ except for SHA-256 collision probability.
pub fn compute(identity: &FindingIdentity<'_>) -> ComputedFingerprint {
    let (fields, mandatory_present): (Vec<String>, bool) = match identity.category {
        FindingCategory::Sca => (
            vec![
                normalize(identity.vulnerability_id),
                normalize(identity.package_name),
                normalize(identity.package_ecosystem),
            ],
            present(identity.vulnerability_id) && present(identity.package_name),
        ),
        FindingCategory::Sast => (
            vec![
                normalize(identity.rule_id),
                normalize(identity.location),
                normalize_line(identity.line_number),
            ],
            present(identity.rule_id) && present(identity.location),
        ),
        FindingCategory::Container => (
            vec![
                normalize(identity.vulnerability_id),
                normalize(identity.location),
                normalize(identity.package_name),
            ],
            present(identity.vulnerability_id),
        ),
        FindingCategory::Malware => (
            vec![normalize(identity.rule_id), normalize(identity.location)],
            present(identity.rule_id) && present(identity.location),
        ),
    };

    let canonical = format!(
        "{}{}{}",
        identity.category.discriminant(),
        SEPARATOR,
        fields.join(SEPARATOR)
    );

    let digest = Sha256::digest(canonical.as_bytes());
    ComputedFingerprint {
        value: hex::encode(digest),
        low_confidence: !mandatory_present,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sca<'a>(vuln: Option<&'a str>, pkg: Option<&'a str>) -> FindingIdentity<'a> {
        FindingIdentity {
            category: FindingCategory::Sca,
            vulnerability_id: vuln,
            package_name: pkg,
            package_ecosystem: Some("npm"),
            rule_id: None,
            location: None,
            line_number: None,
        }
    }

    #[test]
    fn identical_tuples_hash_identically() {
        let a = compute(&sca(Some("CVE-2023-1234"), Some("lodash")));
        let b = compute(&sca(Some("CVE-2023-1234"), Some("lodash")));
        assert_eq!(a.value, b.value);
    }

    #[test]
    fn normalization_ignores_case_and_whitespace() {
        let a = compute(&sca(Some("cve-2023-1234"), Some(" Lodash ")));
        let b = compute(&sca(Some("CVE-2023-1234"), Some("lodash")));
        assert_eq!(a.value, b.value);
    }

    #[test]
    fn different_vulnerability_ids_differ() {
        let a = compute(&sca(Some("CVE-2023-1234"), Some("lodash")));
        let b = compute(&sca(Some("CVE-2023-9999"), Some("lodash")));
        assert_ne!(a.value, b.value);
    }

    #[test]
    fn missing_field_uses_sentinel_not_shift() {
        // (None, "x") must not collide with ("x", None)
        let a = compute(&sca(None, Some("x")));
        let b = compute(&sca(Some("x"), None));
        assert_ne!(a.value, b.value);
        assert!(a.low_confidence);
        assert!(b.low_confidence);
    }

    #[test]
    fn empty_and_whitespace_fields_are_low_confidence() {
        // An empty or blank mandatory field gets the sentinel in the hash,
        // so the flag must match the absent-field case exactly
        let absent = compute(&sca(None, Some("lodash")));
        let empty = compute(&sca(Some(""), Some("lodash")));
        let blank = compute(&sca(Some("   "), Some("lodash")));

        assert_eq!(absent.value, empty.value);
        assert_eq!(absent.value, blank.value);
        assert!(empty.low_confidence);
        assert!(blank.low_confidence);
    }

    #[test]
    fn category_discriminant_separates_identical_tuples() {
        let sca_fp = compute(&FindingIdentity {
            category: FindingCategory::Sca,
            vulnerability_id: Some("CVE-2023-1234"),
            package_name: Some("busybox"),
            package_ecosystem: None,
            rule_id: None,
            location: None,
            line_number: None,
        });
        let container_fp = compute(&FindingIdentity {
            category: FindingCategory::Container,
            vulnerability_id: Some("CVE-2023-1234"),
            package_name: Some("busybox"),
            package_ecosystem: None,
            rule_id: None,
            location: None,
            line_number: None,
        });
        assert_ne!(sca_fp.value, container_fp.value);
    }

    #[test]
    fn sast_line_contributes_to_identity() {
        let base = FindingIdentity {
            category: FindingCategory::Sast,
            vulnerability_id: None,
            package_name: None,
            package_ecosystem: None,
            rule_id: Some("rust.unsafe-deref"),
            location: Some("src/main.rs"),
            line_number: Some(42),
        };
        let moved = FindingIdentity {
            line_number: Some(43),
            ..base
        };
        assert_ne!(compute(&base).value, compute(&moved).value);
    }

    proptest! {
        #[test]
        fn fingerprint_is_deterministic(
            vuln in "[A-Za-z0-9:-]{1,24}",
            pkg in "[a-z0-9_.-]{1,24}",
            eco in "[a-z]{2,10}",
        ) {
            let identity = FindingIdentity {
                category: FindingCategory::Sca,
                vulnerability_id: Some(&vuln),
                package_name: Some(&pkg),
                package_ecosystem: Some(&eco),
                rule_id: None,
                location: None,
                line_number: None,
            };
            prop_assert_eq!(compute(&identity).value, compute(&identity).value);
        }

        #[test]
        fn distinct_packages_never_collide(
            pkg_a in "[a-z]{1,16}",
            pkg_b in "[a-z]{1,16}",
        ) {
            prop_assume!(pkg_a != pkg_b);
            let a = compute(&sca(Some("CVE-2024-0001"), Some(&pkg_a)));
            let b = compute(&sca(Some("CVE-2024-0001"), Some(&pkg_b)));
            prop_assert_ne!(a.value, b.value);
        }
    }
}
