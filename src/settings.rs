//! # Settings
//!
//! Aggregate of every component's configuration, loaded from an optional
//! JSON file. Missing sections and fields fall back to their defaults, and
//! command-line flags override individual values after loading.
//!
//! ```json
//! {
//!   "database": "catalog.db",
//!   "crawl": { "domain": "uk", "max_pages_per_keyword": 3 },
//!   "gateway": { "mode": "insert_only" }
//! }
//! ```

use crate::cache::CacheConfig;
use crate::catalog::marketplace_host;
use crate::crawl::CrawlConfig;
use crate::error::Error as CrateError;
use crate::fetch::FetcherConfig;
use crate::frontier::KeywordConfig;
use crate::persistence::GatewayConfig;
use crate::validate::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Error type for configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown marketplace '{0}'")]
    UnknownDomain(String),

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<ConfigError> for CrateError {
    fn from(err: ConfigError) -> Self {
        CrateError::Config(err.to_string())
    }
}

/// Every configurable value of a crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path of the libsql database file
    pub database: PathBuf,

    /// Directory for daily log files; stderr only when unset
    pub log_dir: Option<PathBuf>,

    pub crawl: CrawlConfig,
    pub fetcher: FetcherConfig,
    pub validation: ValidationConfig,
    pub gateway: GatewayConfig,
    pub keywords: KeywordConfig,
    pub cache: CacheConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from("shelf.db"),
            log_dir: None,
            crawl: CrawlConfig::default(),
            fetcher: FetcherConfig::default(),
            validation: ValidationConfig::default(),
            gateway: GatewayConfig::default(),
            keywords: KeywordConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::parse(&content)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crawl.validate()?;
        if self.gateway.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "gateway.batch_size",
                message: "must be at least 1".to_string(),
            });
        }
        if self.validation.min_price > self.validation.max_price {
            return Err(ConfigError::Invalid {
                field: "validation.min_price",
                message: format!(
                    "{} is above max_price {}",
                    self.validation.min_price, self.validation.max_price
                ),
            });
        }
        if self.keywords.attempt_cap == 0 {
            return Err(ConfigError::Invalid {
                field: "keywords.attempt_cap",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Check a marketplace code
pub fn validate_domain(domain: &str) -> Result<&'static str, ConfigError> {
    marketplace_host(domain).ok_or_else(|| ConfigError::UnknownDomain(domain.to_string()))
}
