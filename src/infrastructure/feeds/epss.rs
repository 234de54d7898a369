//! EPSS bulk feed client
//!
//! The feed is a gzipped CSV with comment lines (`#model_version:...`)
//! followed by a `cve,epss,percentile` header. Rows that fail to parse are
//! skipped individually; a row-level glitch must not lose the whole
//! snapshot.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use super::{EpssFeed, EpssRecord, FeedError};

/// HTTP client for the EPSS scores feed
pub struct HttpEpssFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpEpssFeed {
    /// `timeout` is the caller-supplied deadline for the whole download.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl EpssFeed for HttpEpssFeed {
    async fn fetch(&self) -> Result<HashMap<String, EpssRecord>, FeedError> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        let records = parse_epss_csv(&body)?;
        debug!(records = records.len(), "EPSS feed snapshot loaded");
        Ok(records)
    }
}

/// Decode the gzipped CSV body into a CVE → record map.
pub fn parse_epss_csv(gzipped: &[u8]) -> Result<HashMap<String, EpssRecord>, FeedError> {
    let mut decoder = GzDecoder::new(gzipped);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| FeedError::Decode(format!("gzip: {}", e)))?;

    // Leading comment lines carry model metadata, not CSV rows
    let csv_body: String = text
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_body.as_bytes());

    let mut records = HashMap::new();
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "Skipping malformed EPSS row");
                continue;
            }
        };
        let (Some(cve), Some(score), Some(percentile)) = (row.get(0), row.get(1), row.get(2))
        else {
            continue;
        };
        let (Ok(score), Ok(percentile)) = (score.parse::<f64>(), percentile.parse::<f64>()) else {
            warn!(cve, "Skipping EPSS row with non-numeric values");
            continue;
        };
        records.insert(cve.trim().to_uppercase(), EpssRecord { score, percentile });
    }

    Ok(records)
}
