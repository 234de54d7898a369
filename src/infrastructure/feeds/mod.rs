//! External threat-intelligence feeds (EPSS, KEV)

pub mod epss;
pub mod kev;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

/// Feed fetch/decode errors.
///
/// A failed fetch never fails the enrichment run as a whole; the affected
/// findings stay unchanged and are retried on the next scheduled run.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed payload could not be decoded: {0}")]
    Decode(String),
}

/// One EPSS record: exploitation probability and percentile for a CVE
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpssRecord {
    pub score: f64,
    pub percentile: f64,
}

/// One KEV catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KevEntry {
    pub date_added: Option<NaiveDate>,
    pub name: String,
}

/// Bulk EPSS feed, keyed by upper-cased CVE id
#[async_trait]
pub trait EpssFeed: Send + Sync {
    async fn fetch(&self) -> Result<HashMap<String, EpssRecord>, FeedError>;
}

/// KEV catalog, keyed by upper-cased CVE id
#[async_trait]
pub trait KevCatalog: Send + Sync {
    async fn fetch(&self) -> Result<HashMap<String, KevEntry>, FeedError>;
}
