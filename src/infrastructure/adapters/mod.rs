//! Scanner adapter layer
//!
//! Adapters convert raw scanner payloads into [`NormalizedFinding`] values.
//! They are pure: no I/O, no mutation of persisted state. Individual
//! malformed entries are skipped and counted, never aborting the batch.
//! Adapters are resolved by the caller-supplied scanner tag through a
//! registry populated at construction, never by content sniffing.

pub mod clamav;
pub mod jfrog_xray;
pub mod semgrep;
pub mod trivy;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::finding::NormalizedFinding;

/// Whole-payload parse failure
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload structure not recognized: {0}")]
    Structure(String),
}

/// Why one entry of a batch was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipReason {
    /// Position of the entry in the raw payload, for operator triage
    pub entry: usize,
    pub reason: String,
}

/// Result of parsing one raw payload
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub findings: Vec<NormalizedFinding>,
    pub skipped: Vec<SkipReason>,
}

/// One scanner-specific parser.
///
/// `parse` receives pre-validated bytes (size/MIME checks happen upstream)
/// and returns findings in scanner-agnostic form plus per-entry skips.
pub trait ScannerAdapter: Send + Sync {
    /// Registry name, matching the scanner tag supplied with uploads
    fn name(&self) -> &'static str;

    fn parse(&self, raw: &[u8]) -> Result<ParseOutcome, AdapterError>;
}

/// Name → adapter registry, populated once at process start
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<&'static str, Arc<dyn ScannerAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in adapters
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(trivy::TrivyAdapter));
        registry.register(Arc::new(jfrog_xray::JfrogXrayAdapter));
        registry.register(Arc::new(semgrep::SemgrepAdapter));
        registry.register(Arc::new(clamav::ClamAvAdapter));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ScannerAdapter>) {
        self.adapters.insert(adapter.name(), adapter);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ScannerAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.adapters.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
