//! Containment hierarchy: workspaces own products, products own releases,
//! releases own their scans, findings and components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A team boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    /// URL-safe identifier derived from the name
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            created_at: Utc::now(),
        }
    }
}

/// Lowercase, alphanumerics kept, everything else collapsed to single
/// hyphens.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Business criticality tier of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

/// A scanned asset: repository, image, service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub criticality: Criticality,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(workspace_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.to_string(),
            criticality: Criticality::default(),
            created_at: Utc::now(),
        }
    }
}

/// A specific version of a product, e.g. "v1.2.0".
///
/// The release is the dedup scope: scans, findings and components all hang
/// off it and are cascade-owned by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub commit_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Release {
    pub fn new(product_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            name: name.to_string(),
            commit_hash: None,
            created_at: Utc::now(),
        }
    }
}

/// Processing state of a scan upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Per-scan parse and reconciliation counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanCounters {
    pub parsed: usize,
    pub skipped: usize,
    pub created: usize,
    pub updated: usize,
    pub fixed: usize,
    pub duplicates_collapsed: usize,
}

/// One execution of one scanner against one release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub id: Uuid,
    pub release_id: Uuid,
    pub scanner: String,
    pub status: ScanStatus,
    /// Whether the payload is a complete snapshot; only complete scans drive
    /// fixed-by-absence
    pub complete: bool,
    pub uploaded_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub counters: ScanCounters,
}

impl Scan {
    pub fn new(release_id: Uuid, scanner: &str, complete: bool, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            release_id,
            scanner: scanner.to_string(),
            status: ScanStatus::Pending,
            complete,
            uploaded_at,
            completed_at: None,
            counters: ScanCounters::default(),
        }
    }
}
