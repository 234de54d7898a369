//! Application layer: use cases orchestrating the domain over the
//! repository and feed abstractions

pub mod enrichment;
pub mod errors;
pub mod ingestion;
pub mod queries;
pub mod sbom;
pub mod triage;

pub use enrichment::{EnrichFindingsUseCase, EnrichmentSummary};
pub use errors::{EnrichmentError, IngestError, SbomError, TriageError};
pub use ingestion::{IngestRequest, IngestScanUseCase, IngestSummary};
pub use queries::{ReleaseRiskQuery, ReleaseRiskStats};
pub use sbom::{ExportSbomUseCase, ImportSbomUseCase, SbomDiff};
pub use triage::TriageUseCase;
