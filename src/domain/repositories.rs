//! Persistence traits for the shared mutable state
//!
//! The persisted finding/component tables are the only shared mutable state
//! in the system; everything else (adapters, fingerprinting, scoring) is
//! pure. Implementations must make each method atomic with respect to
//! concurrent callers.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::finding::{Finding, FindingStatus, Severity};
use super::release::{Product, Release, Scan, Workspace};
use super::sbom::Component;

/// Store-level errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(Uuid),

    #[error("Release not found: {0}")]
    ReleaseNotFound(Uuid),

    #[error("A non-duplicate finding already exists for release {release_id} and fingerprint {fingerprint}")]
    FingerprintConflict {
        release_id: Uuid,
        fingerprint: String,
    },
}

/// Query filter over findings.
///
/// `product_id`/`workspace_id` widen the scope through the containment
/// hierarchy; all other fields narrow it.
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    pub release_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub workspace_id: Option<Uuid>,
    pub statuses: Vec<FindingStatus>,
    pub severities: Vec<Severity>,
    pub vulnerability_id: Option<String>,
    pub scanner: Option<String>,
    pub epss_min: Option<f64>,
    pub epss_max: Option<f64>,
    pub kev: Option<bool>,
}

impl FindingFilter {
    pub fn for_release(release_id: Uuid) -> Self {
        Self {
            release_id: Some(release_id),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: &[FindingStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }
}

/// Conditional threat-intel update for a single finding
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentUpdate {
    pub epss_score: Option<f64>,
    pub epss_percentile: Option<f64>,
    pub kev_status: bool,
    pub kev_date: Option<NaiveDate>,
    pub enriched_at: DateTime<Utc>,
}

/// Finding persistence.
///
/// `insert` must enforce the unique (release, fingerprint) constraint for
/// non-duplicate rows and fail with [`StoreError::FingerprintConflict`]
/// when violated, so callers can retry against a fresh read.
#[async_trait]
pub trait IFindingRepository: Send + Sync {
    async fn insert(&self, finding: Finding) -> Result<(), StoreError>;

    async fn update(&self, finding: Finding) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Finding>, StoreError>;

    async fn find_by_fingerprint(
        &self,
        release_id: Uuid,
        fingerprint: &str,
    ) -> Result<Option<Finding>, StoreError>;

    async fn list(&self, filter: &FindingFilter) -> Result<Vec<Finding>, StoreError>;

    /// Compare-and-write threat-intel fields for one finding.
    ///
    /// Writes (and recomputes the risk score) only when the incoming values
    /// differ from the stored ones; returns whether a write happened. Never
    /// touches status or severity, so it is safe concurrently with the
    /// lifecycle manager.
    async fn apply_enrichment(
        &self,
        id: Uuid,
        update: EnrichmentUpdate,
    ) -> Result<bool, StoreError>;
}

/// Scan persistence
#[async_trait]
pub trait IScanRepository: Send + Sync {
    async fn insert(&self, scan: Scan) -> Result<(), StoreError>;

    async fn update(&self, scan: Scan) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Scan>, StoreError>;

    async fn list_for_release(&self, release_id: Uuid) -> Result<Vec<Scan>, StoreError>;
}

/// SBOM component persistence
#[async_trait]
pub trait IComponentRepository: Send + Sync {
    async fn insert(&self, component: Component) -> Result<(), StoreError>;

    async fn update(&self, component: Component) -> Result<(), StoreError>;

    /// Active (not removed) components of a release
    async fn list_active(&self, release_id: Uuid) -> Result<Vec<Component>, StoreError>;

    /// Full component history of a release
    async fn list_all(&self, release_id: Uuid) -> Result<Vec<Component>, StoreError>;
}

/// Containment hierarchy registry used to resolve query scopes
#[async_trait]
pub trait IReleaseRepository: Send + Sync {
    async fn insert_workspace(&self, workspace: Workspace) -> Result<(), StoreError>;

    async fn insert_product(&self, product: Product) -> Result<(), StoreError>;

    async fn insert_release(&self, release: Release) -> Result<(), StoreError>;

    async fn get_release(&self, id: Uuid) -> Result<Option<Release>, StoreError>;

    /// Releases under a product
    async fn releases_of_product(&self, product_id: Uuid) -> Result<Vec<Release>, StoreError>;

    /// Releases under every product of a workspace
    async fn releases_of_workspace(&self, workspace_id: Uuid) -> Result<Vec<Release>, StoreError>;
}
