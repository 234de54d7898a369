//! Use-case level errors

use uuid::Uuid;

use crate::domain::finding::LifecycleError;
use crate::domain::repositories::StoreError;
use crate::infrastructure::adapters::AdapterError;

/// Errors of the scan ingestion use case
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("No adapter registered for scanner {0:?}")]
    UnknownScanner(String),

    #[error("Release not found: {0}")]
    ReleaseNotFound(Uuid),

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("Fingerprint {fingerprint} still conflicted after retry")]
    ConcurrencyConflict { fingerprint: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors of the triage use cases
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Finding not found: {0}")]
    NotFound(Uuid),

    #[error("Findings {duplicate} and {canonical} belong to different releases")]
    CrossReleaseDuplicate { duplicate: Uuid, canonical: Uuid },

    #[error("Finding {0} is itself a duplicate and cannot be a canonical target")]
    CanonicalIsDuplicate(Uuid),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors of the SBOM import/export use cases
#[derive(Debug, thiserror::Error)]
pub enum SbomError {
    #[error("Release not found: {0}")]
    ReleaseNotFound(Uuid),

    #[error("Document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported SBOM format {0:?}; only CycloneDX is accepted")]
    UnsupportedFormat(String),

    #[error("Export blocked: multiple active components share key {key:?}")]
    ExportInconsistency { key: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors of the enrichment use case.
///
/// Feed failures are deliberately absent: a failed feed download degrades the
/// run (findings keep their previous intel) without failing it.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
