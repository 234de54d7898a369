//! Findings: the canonical vulnerability record tracked per release

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::{Finding, NormalizedFinding};
pub use errors::LifecycleError;
pub use value_objects::{FindingCategory, FindingStatus, Severity};
