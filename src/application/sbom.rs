//! CycloneDX SBOM import and export
//!
//! Import treats the uploaded document as a complete snapshot: components
//! missing from it get `removed_at` stamped, mirroring fixed-by-absence on
//! findings. Export is deterministic: components sorted by identity key, a
//! fixed spec version, and a consistency check that no two active components
//! share a key.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::repositories::{IComponentRepository, IReleaseRepository};
use crate::domain::sbom::{
    component_key, Component, ComponentType, CycloneDxComponent, CycloneDxDocument,
    CycloneDxLicense, CycloneDxLicenseChoice, EXPORT_SPEC_VERSION,
};

use super::errors::SbomError;

/// Net effect of one SBOM import
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SbomDiff {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Imports a CycloneDX document as the new component snapshot of a release.
pub struct ImportSbomUseCase {
    components: Arc<dyn IComponentRepository>,
    releases: Arc<dyn IReleaseRepository>,
}

impl ImportSbomUseCase {
    pub fn new(
        components: Arc<dyn IComponentRepository>,
        releases: Arc<dyn IReleaseRepository>,
    ) -> Self {
        Self {
            components,
            releases,
        }
    }

    pub async fn execute(&self, release_id: Uuid, raw: &[u8]) -> Result<SbomDiff, SbomError> {
        if self.releases.get_release(release_id).await?.is_none() {
            return Err(SbomError::ReleaseNotFound(release_id));
        }

        let document: CycloneDxDocument = serde_json::from_slice(raw)?;
        if !document.bom_format.eq_ignore_ascii_case("CycloneDX") {
            return Err(SbomError::UnsupportedFormat(document.bom_format));
        }

        // Last entry wins when a document repeats a key
        let mut incoming: HashMap<String, CycloneDxComponent> = HashMap::new();
        for entry in document.components {
            let version = entry.version.clone().unwrap_or_default();
            let key = component_key(entry.purl.as_deref(), &entry.name, &version);
            if incoming.insert(key.clone(), entry).is_some() {
                warn!(release_id = %release_id, key = %key, "Document repeats component key");
            }
        }

        let now = Utc::now();
        let mut diff = SbomDiff::default();
        let existing = self.components.list_all(release_id).await?;
        let mut active_by_key: HashMap<String, Component> = HashMap::new();
        for component in existing {
            if component.is_active() {
                active_by_key.insert(component.key(), component);
            }
        }

        for (key, entry) in incoming {
            match active_by_key.remove(&key) {
                Some(_) => diff.unchanged += 1,
                None => {
                    let component = Component {
                        id: Uuid::new_v4(),
                        release_id,
                        name: entry.name.clone(),
                        version: entry.version.clone().unwrap_or_default(),
                        purl: entry.purl.clone(),
                        component_type: ComponentType::parse_lenient(&entry.component_type),
                        license: entry.license(),
                        added_at: now,
                        removed_at: None,
                    };
                    self.components.insert(component).await?;
                    diff.added += 1;
                }
            }
        }

        // Whatever is left active was absent from the snapshot
        for (_, mut component) in active_by_key {
            component.removed_at = Some(now);
            self.components.update(component).await?;
            diff.removed += 1;
        }

        info!(
            release_id = %release_id,
            added = diff.added,
            removed = diff.removed,
            unchanged = diff.unchanged,
            "SBOM imported"
        );
        Ok(diff)
    }
}

/// Exports the active components of a release as a CycloneDX document.
pub struct ExportSbomUseCase {
    components: Arc<dyn IComponentRepository>,
}

impl ExportSbomUseCase {
    pub fn new(components: Arc<dyn IComponentRepository>) -> Self {
        Self { components }
    }

    pub async fn execute(&self, release_id: Uuid) -> Result<CycloneDxDocument, SbomError> {
        let mut active = self.components.list_active(release_id).await?;
        active.sort_by_key(Component::key);

        for window in active.windows(2) {
            if window[0].key() == window[1].key() {
                return Err(SbomError::ExportInconsistency {
                    key: window[0].key(),
                });
            }
        }

        let components = active
            .into_iter()
            .map(|component| CycloneDxComponent {
                component_type: component_type_tag(component.component_type).to_string(),
                name: component.name,
                version: Some(component.version),
                purl: component.purl,
                licenses: component
                    .license
                    .map(|id| {
                        vec![CycloneDxLicenseChoice {
                            license: Some(CycloneDxLicense {
                                id: Some(id),
                                name: None,
                            }),
                        }]
                    })
                    .unwrap_or_default(),
            })
            .collect();

        Ok(CycloneDxDocument {
            bom_format: "CycloneDX".to_string(),
            spec_version: EXPORT_SPEC_VERSION.to_string(),
            version: 1,
            components,
        })
    }
}

fn component_type_tag(component_type: ComponentType) -> &'static str {
    match component_type {
        ComponentType::Library => "library",
        ComponentType::Framework => "framework",
        ComponentType::Container => "container",
        ComponentType::OperatingSystem => "operating-system",
        ComponentType::Application => "application",
    }
}
