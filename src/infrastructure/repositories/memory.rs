//! In-memory store backing all repository traits
//!
//! A single `RwLock` guards the tables, so every trait method is atomic with
//! respect to concurrent callers. The (release, fingerprint) uniqueness for
//! non-duplicate findings is enforced by a dedicated index, the in-memory
//! equivalent of a database unique constraint.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::finding::{Finding, FindingStatus};
use crate::domain::release::{Product, Release, Scan, Workspace};
use crate::domain::repositories::{
    EnrichmentUpdate, FindingFilter, IComponentRepository, IFindingRepository, IReleaseRepository,
    IScanRepository, StoreError,
};
use crate::domain::sbom::Component;

#[derive(Default)]
struct Tables {
    findings: HashMap<Uuid, Finding>,
    /// (release_id, fingerprint) → finding id, non-duplicate rows only
    fingerprint_index: HashMap<(Uuid, String), Uuid>,
    scans: HashMap<Uuid, Scan>,
    components: HashMap<Uuid, Component>,
    workspaces: HashMap<Uuid, Workspace>,
    products: HashMap<Uuid, Product>,
    releases: HashMap<Uuid, Release>,
}

/// Shared in-memory store implementing every repository trait
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn release_scope(&self, filter: &FindingFilter) -> Option<Vec<Uuid>> {
        if let Some(release_id) = filter.release_id {
            return Some(vec![release_id]);
        }
        if let Some(product_id) = filter.product_id {
            return Some(
                self.releases
                    .values()
                    .filter(|r| r.product_id == product_id)
                    .map(|r| r.id)
                    .collect(),
            );
        }
        if let Some(workspace_id) = filter.workspace_id {
            let product_ids: Vec<Uuid> = self
                .products
                .values()
                .filter(|p| p.workspace_id == workspace_id)
                .map(|p| p.id)
                .collect();
            return Some(
                self.releases
                    .values()
                    .filter(|r| product_ids.contains(&r.product_id))
                    .map(|r| r.id)
                    .collect(),
            );
        }
        None
    }

    fn matches(&self, finding: &Finding, filter: &FindingFilter) -> bool {
        if let Some(scope) = self.release_scope(filter) {
            if !scope.contains(&finding.release_id) {
                return false;
            }
        }
        if !filter.statuses.is_empty() && !filter.statuses.contains(&finding.status) {
            return false;
        }
        if !filter.severities.is_empty() && !filter.severities.contains(&finding.severity) {
            return false;
        }
        if let Some(vuln_id) = &filter.vulnerability_id {
            match &finding.vulnerability_id {
                Some(id) if id.eq_ignore_ascii_case(vuln_id) => {}
                _ => return false,
            }
        }
        if let Some(scanner) = &filter.scanner {
            if &finding.scanner != scanner {
                return false;
            }
        }
        if filter.epss_min.is_some() || filter.epss_max.is_some() {
            let Some(epss) = finding.epss_score else {
                return false;
            };
            if filter.epss_min.is_some_and(|min| epss < min) {
                return false;
            }
            if filter.epss_max.is_some_and(|max| epss > max) {
                return false;
            }
        }
        if let Some(kev) = filter.kev {
            if finding.kev_status != kev {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl IFindingRepository for InMemoryStore {
    async fn insert(&self, finding: Finding) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let key = (finding.release_id, finding.fingerprint.clone());
        if finding.status != FindingStatus::Duplicate && tables.fingerprint_index.contains_key(&key)
        {
            return Err(StoreError::FingerprintConflict {
                release_id: finding.release_id,
                fingerprint: finding.fingerprint,
            });
        }
        if finding.status != FindingStatus::Duplicate {
            tables.fingerprint_index.insert(key, finding.id);
        }
        tables.findings.insert(finding.id, finding);
        Ok(())
    }

    async fn update(&self, finding: Finding) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.findings.contains_key(&finding.id) {
            return Err(StoreError::NotFound(finding.id));
        }
        let key = (finding.release_id, finding.fingerprint.clone());
        if finding.status == FindingStatus::Duplicate {
            // Collapsed rows vacate the uniqueness slot
            if tables.fingerprint_index.get(&key) == Some(&finding.id) {
                tables.fingerprint_index.remove(&key);
            }
        } else {
            let conflicting = tables
                .fingerprint_index
                .get(&key)
                .is_some_and(|existing| *existing != finding.id);
            if conflicting {
                return Err(StoreError::FingerprintConflict {
                    release_id: finding.release_id,
                    fingerprint: finding.fingerprint,
                });
            }
            tables.fingerprint_index.insert(key, finding.id);
        }
        tables.findings.insert(finding.id, finding);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Finding>, StoreError> {
        Ok(self.tables.read().await.findings.get(&id).cloned())
    }

    async fn find_by_fingerprint(
        &self,
        release_id: Uuid,
        fingerprint: &str,
    ) -> Result<Option<Finding>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .fingerprint_index
            .get(&(release_id, fingerprint.to_string()))
            .and_then(|id| tables.findings.get(id))
            .cloned())
    }

    async fn list(&self, filter: &FindingFilter) -> Result<Vec<Finding>, StoreError> {
        let tables = self.tables.read().await;
        let mut findings: Vec<Finding> = tables
            .findings
            .values()
            .filter(|f| tables.matches(f, filter))
            .cloned()
            .collect();
        findings.sort_by(|a, b| b.first_seen_at.cmp(&a.first_seen_at));
        Ok(findings)
    }

    async fn apply_enrichment(
        &self,
        id: Uuid,
        update: EnrichmentUpdate,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let finding = tables
            .findings
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        let unchanged = finding.epss_score == update.epss_score
            && finding.epss_percentile == update.epss_percentile
            && finding.kev_status == update.kev_status
            && finding.kev_date == update.kev_date;
        if unchanged {
            return Ok(false);
        }

        finding.epss_score = update.epss_score;
        finding.epss_percentile = update.epss_percentile;
        finding.kev_status = update.kev_status;
        finding.kev_date = update.kev_date;
        finding.enriched_at = Some(update.enriched_at);
        finding.recompute_risk();
        Ok(true)
    }
}

#[async_trait]
impl IScanRepository for InMemoryStore {
    async fn insert(&self, scan: Scan) -> Result<(), StoreError> {
        self.tables.write().await.scans.insert(scan.id, scan);
        Ok(())
    }

    async fn update(&self, scan: Scan) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.scans.contains_key(&scan.id) {
            return Err(StoreError::NotFound(scan.id));
        }
        tables.scans.insert(scan.id, scan);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Scan>, StoreError> {
        Ok(self.tables.read().await.scans.get(&id).cloned())
    }

    async fn list_for_release(&self, release_id: Uuid) -> Result<Vec<Scan>, StoreError> {
        let tables = self.tables.read().await;
        let mut scans: Vec<Scan> = tables
            .scans
            .values()
            .filter(|s| s.release_id == release_id)
            .cloned()
            .collect();
        scans.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(scans)
    }
}

#[async_trait]
impl IComponentRepository for InMemoryStore {
    async fn insert(&self, component: Component) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .components
            .insert(component.id, component);
        Ok(())
    }

    async fn update(&self, component: Component) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.components.contains_key(&component.id) {
            return Err(StoreError::NotFound(component.id));
        }
        tables.components.insert(component.id, component);
        Ok(())
    }

    async fn list_active(&self, release_id: Uuid) -> Result<Vec<Component>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .components
            .values()
            .filter(|c| c.release_id == release_id && c.is_active())
            .cloned()
            .collect())
    }

    async fn list_all(&self, release_id: Uuid) -> Result<Vec<Component>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .components
            .values()
            .filter(|c| c.release_id == release_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IReleaseRepository for InMemoryStore {
    async fn insert_workspace(&self, workspace: Workspace) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .workspaces
            .insert(workspace.id, workspace);
        Ok(())
    }

    async fn insert_product(&self, product: Product) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .products
            .insert(product.id, product);
        Ok(())
    }

    async fn insert_release(&self, release: Release) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .releases
            .insert(release.id, release);
        Ok(())
    }

    async fn get_release(&self, id: Uuid) -> Result<Option<Release>, StoreError> {
        Ok(self.tables.read().await.releases.get(&id).cloned())
    }

    async fn releases_of_product(&self, product_id: Uuid) -> Result<Vec<Release>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .releases
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn releases_of_workspace(&self, workspace_id: Uuid) -> Result<Vec<Release>, StoreError> {
        let tables = self.tables.read().await;
        let product_ids: Vec<Uuid> = tables
            .products
            .values()
            .filter(|p| p.workspace_id == workspace_id)
            .map(|p| p.id)
            .collect();
        Ok(tables
            .releases
            .values()
            .filter(|r| product_ids.contains(&r.product_id))
            .cloned()
            .collect())
    }
}
