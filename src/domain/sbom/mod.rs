//! SBOM components and the CycloneDX document model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of software component listed in an SBOM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    #[default]
    Library,
    Framework,
    Container,
    OperatingSystem,
    Application,
}

impl ComponentType {
    /// Map a CycloneDX component `type` string, defaulting unknown kinds to
    /// `Library`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "framework" => ComponentType::Framework,
            "container" => ComponentType::Container,
            "operating-system" => ComponentType::OperatingSystem,
            "application" => ComponentType::Application,
            _ => ComponentType::Library,
        }
    }
}

/// One software package entry in a release's bill of materials.
///
/// At most one active (removed_at = None) component exists per (release,
/// identity key); components absent from a newer complete SBOM snapshot get
/// `removed_at` set, mirroring the finding fixed-by-absence policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: Uuid,
    pub release_id: Uuid,
    pub name: String,
    pub version: String,
    pub purl: Option<String>,
    pub component_type: ComponentType,
    pub license: Option<String>,
    pub added_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
}

impl Component {
    /// Identity key: purl when present, otherwise `name@version`.
    pub fn key(&self) -> String {
        component_key(self.purl.as_deref(), &self.name, &self.version)
    }

    pub fn is_active(&self) -> bool {
        self.removed_at.is_none()
    }
}

/// Identity key shared by import and export paths.
pub fn component_key(purl: Option<&str>, name: &str, version: &str) -> String {
    match purl {
        Some(p) if !p.trim().is_empty() => p.trim().to_string(),
        _ => format!("{}@{}", name, version),
    }
}

// ── CycloneDX wire model ────────────────────────────────────────────────

/// Spec version emitted on export
pub const EXPORT_SPEC_VERSION: &str = "1.5";

/// Root of a CycloneDX JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycloneDxDocument {
    #[serde(rename = "bomFormat")]
    pub bom_format: String,
    #[serde(rename = "specVersion")]
    pub spec_version: String,
    #[serde(default = "default_bom_version")]
    pub version: u32,
    #[serde(default)]
    pub components: Vec<CycloneDxComponent>,
}

fn default_bom_version() -> u32 {
    1
}

/// A component entry inside a CycloneDX document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycloneDxComponent {
    #[serde(rename = "type", default = "default_component_type")]
    pub component_type: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<CycloneDxLicenseChoice>,
}

fn default_component_type() -> String {
    "library".to_string()
}

/// License wrapper object as CycloneDX nests it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycloneDxLicenseChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<CycloneDxLicense>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycloneDxLicense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CycloneDxComponent {
    /// First SPDX license id or name, when the document carries one
    pub fn license(&self) -> Option<String> {
        self.licenses
            .iter()
            .filter_map(|choice| choice.license.as_ref())
            .find_map(|l| l.id.clone().or_else(|| l.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_prefers_purl() {
        let component = Component {
            id: Uuid::new_v4(),
            release_id: Uuid::new_v4(),
            name: "requests".to_string(),
            version: "2.28.1".to_string(),
            purl: Some("pkg:pypi/requests@2.28.1".to_string()),
            component_type: ComponentType::Library,
            license: None,
            added_at: Utc::now(),
            removed_at: None,
        };
        assert_eq!(component.key(), "pkg:pypi/requests@2.28.1");
    }

    #[test]
    fn key_falls_back_to_name_version() {
        assert_eq!(component_key(None, "zlib", "1.2.13"), "zlib@1.2.13");
        assert_eq!(component_key(Some("  "), "zlib", "1.2.13"), "zlib@1.2.13");
    }

    #[test]
    fn license_extraction_survives_missing_fields() {
        let raw = r#"{
            "type": "library",
            "name": "openssl",
            "version": "3.0.8",
            "licenses": [{"license": {"id": "Apache-2.0"}}, {}]
        }"#;
        let component: CycloneDxComponent = serde_json::from_str(raw).unwrap();
        assert_eq!(component.license().as_deref(), Some("Apache-2.0"));
    }
}
