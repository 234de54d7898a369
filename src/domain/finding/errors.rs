//! Finding lifecycle errors

use super::value_objects::FindingStatus;

/// Errors raised by illegal lifecycle transitions
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: FindingStatus,
        to: FindingStatus,
    },
}
