//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use vigil::application::{IngestScanUseCase, TriageUseCase};
use vigil::config::IngestionConfig;
use vigil::domain::release::{Product, Release, Workspace};
use vigil::domain::repositories::IReleaseRepository;
use vigil::infrastructure::adapters::AdapterRegistry;
use vigil::infrastructure::repositories::InMemoryStore;

/// Seed a workspace → product → release chain, returning the release id.
pub async fn seed_release(store: &InMemoryStore) -> Uuid {
    let workspace = Workspace::new("platform");
    let product = Product::new(workspace.id, "payments-api");
    let release = Release::new(product.id, "v1.2.0");
    let release_id = release.id;
    store.insert_workspace(workspace).await.unwrap();
    store.insert_product(product).await.unwrap();
    store.insert_release(release).await.unwrap();
    release_id
}

pub fn ingest_use_case(store: Arc<InMemoryStore>) -> IngestScanUseCase {
    IngestScanUseCase::new(
        store.clone(),
        store.clone(),
        store,
        AdapterRegistry::with_builtins(),
        IngestionConfig::default(),
    )
}

pub fn triage_use_case(store: Arc<InMemoryStore>) -> TriageUseCase {
    TriageUseCase::new(store)
}

/// Trivy report with one lang-pkgs result listing the given
/// (vulnerability id, package name) pairs.
pub fn trivy_payload(vulns: &[(&str, &str)]) -> Vec<u8> {
    let entries: Vec<_> = vulns
        .iter()
        .map(|(cve, pkg)| {
            json!({
                "VulnerabilityID": cve,
                "PkgName": pkg,
                "InstalledVersion": "1.0.0",
                "FixedVersion": "1.0.1",
                "Title": format!("{cve} in {pkg}"),
                "Description": "test fixture",
                "Severity": "HIGH"
            })
        })
        .collect();
    serde_json::to_vec(&json!({
        "Results": [{
            "Target": "package-lock.json",
            "Class": "lang-pkgs",
            "Type": "npm",
            "Vulnerabilities": entries
        }]
    }))
    .unwrap()
}

/// Minimal CycloneDX document with (name, version, purl) components.
pub fn cyclonedx_payload(components: &[(&str, &str, Option<&str>)]) -> Vec<u8> {
    let entries: Vec<_> = components
        .iter()
        .map(|(name, version, purl)| {
            let mut entry = json!({
                "type": "library",
                "name": name,
                "version": version
            });
            if let Some(purl) = purl {
                entry["purl"] = json!(purl);
            }
            entry
        })
        .collect();
    serde_json::to_vec(&json!({
        "bomFormat": "CycloneDX",
        "specVersion": "1.5",
        "version": 1,
        "components": entries
    }))
    .unwrap()
}
