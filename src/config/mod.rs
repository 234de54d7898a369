//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub ingestion: IngestionConfig,
    pub feeds: FeedsConfig,
    pub enrichment: EnrichmentConfig,
    pub logging: LoggingConfig,
}

/// Scan ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Maximum accepted raw payload size in megabytes. Upload validation
    /// happens upstream; this is a second bound for direct in-process callers.
    pub max_payload_mb: usize,
    /// Whether a batch yielding zero findings from non-empty input is
    /// reported as a warning in the ingest summary.
    pub warn_on_empty_batch: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_payload_mb: 100,
            warn_on_empty_batch: true,
        }
    }
}

/// Threat-intel feed endpoints and client behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// URL of the EPSS bulk scores CSV (gzipped)
    pub epss_url: String,
    /// URL of the CISA KEV catalog JSON
    pub kev_url: String,
    /// Request timeout for feed downloads (in seconds)
    pub timeout_seconds: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            epss_url: "https://epss.empiricalsecurity.com/epss_scores-current.csv.gz".to_string(),
            kev_url:
                "https://www.cisa.gov/sites/default/files/feeds/known_exploited_vulnerabilities.json"
                    .to_string(),
            timeout_seconds: 30,
        }
    }
}

impl FeedsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Enrichment pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Findings examined per batch
    pub batch_size: usize,
    /// Maximum concurrent per-finding writes
    pub max_concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrency: 8,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Precedence (lowest to highest): `config/default`, `config/{ENV}`,
    /// `config/local`, environment variables with the `VIGIL__` prefix.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("VIGIL").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.enrichment.batch_size == 0 {
            return Err(ConfigLoadError::Invalid(
                "enrichment.batch_size must be at least 1".to_string(),
            ));
        }
        if self.enrichment.max_concurrency == 0 {
            return Err(ConfigLoadError::Invalid(
                "enrichment.max_concurrency must be at least 1".to_string(),
            ));
        }
        for (field, url) in [
            ("feeds.epss_url", &self.feeds.epss_url),
            ("feeds.kev_url", &self.feeds.kev_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigLoadError::Invalid(format!(
                    "{} must be an http(s) URL, got {:?}",
                    field, url
                )));
            }
        }
        Ok(())
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feeds.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut config = Config::default();
        config.enrichment.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigLoadError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_non_http_feed_url() {
        let mut config = Config::default();
        config.feeds.kev_url = "file:///etc/passwd".to_string();
        assert!(config.validate().is_err());
    }
}
