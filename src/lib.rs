//! Vigil - canonical vulnerability findings for software releases
//!
//! This crate ingests raw scanner output (SCA, SAST, container, malware) and
//! SBOM documents, and maintains a deduplicated, temporally consistent view of
//! security findings per release, enriched with EPSS and KEV threat intel.
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed configuration with TOML and environment variable support
//! - [`domain`] — Entities, value objects and the fingerprint engine
//! - [`application`] — Ingestion, triage, SBOM and enrichment use cases
//! - [`infrastructure`] — Scanner adapters, feed clients and repositories
//! - [`logging`] — Structured logging with tracing
//!
//! # Architecture
//!
//! ```text
//! vigil/
//! ├── domain/           # Pure business logic
//! │   ├── finding/      # Finding entity, lifecycle state machine
//! │   ├── fingerprint   # Deterministic identity hashing
//! │   ├── sbom/         # Components and CycloneDX documents
//! │   └── risk          # Risk score combination
//! ├── application/      # Use cases driven by the external scheduler/API
//! └── infrastructure/
//!     ├── adapters/     # Scanner-specific payload parsers
//!     ├── feeds/        # EPSS / KEV clients
//!     └── repositories/ # Persistence traits + in-memory store
//! ```
//!
//! # Configuration
//!
//! Environment variables use the `VIGIL__` prefix with double underscore
//! separators:
//!
//! ```bash
//! VIGIL__ENRICHMENT__BATCH_SIZE=500
//! VIGIL__FEEDS__TIMEOUT_SECONDS=30
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
