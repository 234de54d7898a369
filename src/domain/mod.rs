//! Core domain models, entities and value objects

pub mod finding;
pub mod fingerprint;
pub mod release;
pub mod repositories;
pub mod risk;
pub mod sbom;
