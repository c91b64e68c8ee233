//! # Crawl Configuration Module
//!
//! Run-level knobs of the orchestrator.

use crate::catalog::DEFAULT_DOMAIN;
use crate::settings::{ConfigError, validate_domain};
use serde::{Deserialize, Serialize};

/// Configuration for a crawl run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Marketplace code, e.g. `us` or `uk`
    pub domain: String,

    /// Results pages fetched per keyword at most
    pub max_pages_per_keyword: u32,

    /// Keywords taken from the frontier per run
    pub max_keywords_per_run: usize,

    /// Fetches in flight at once, across keywords and detail pages
    pub concurrency: usize,

    /// Skip detail pages of products already stored or claimed in this run
    pub prevent_duplicate_products: bool,

    /// Products per results page, used for dry-run estimates only
    pub products_per_page: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            max_pages_per_keyword: 1,
            max_keywords_per_run: 50,
            concurrency: 16,
            prevent_duplicate_products: true,
            products_per_page: 16,
        }
    }
}

impl CrawlConfig {
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_domain(&self.domain)?;
        if self.max_pages_per_keyword == 0 {
            return Err(ConfigError::Invalid {
                field: "crawl.max_pages_per_keyword",
                message: "must be at least 1".to_string(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "crawl.concurrency",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for CrawlConfig
#[derive(Debug, Default)]
pub struct CrawlConfigBuilder {
    config: CrawlConfig,
}

impl CrawlConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config.domain = domain.into();
        self
    }

    pub fn max_pages_per_keyword(mut self, max_pages: u32) -> Self {
        self.config.max_pages_per_keyword = max_pages;
        self
    }

    pub fn max_keywords_per_run(mut self, max_keywords: usize) -> Self {
        self.config.max_keywords_per_run = max_keywords;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn prevent_duplicate_products(mut self, prevent: bool) -> Self {
        self.config.prevent_duplicate_products = prevent;
        self
    }

    /// Finish the config, rejecting unknown marketplaces and zero limits
    pub fn build(self) -> Result<CrawlConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_validates() {
        let config = CrawlConfig::builder().domain("de").max_pages_per_keyword(3).build().unwrap();
        assert_eq!(config.domain, "de");
        assert_eq!(config.max_pages_per_keyword, 3);
        assert_eq!(config.max_keywords_per_run, 50);

        assert!(matches!(
            CrawlConfig::builder().domain("mars").build(),
            Err(ConfigError::UnknownDomain(_))
        ));
        assert!(matches!(
            CrawlConfig::builder().concurrency(0).build(),
            Err(ConfigError::Invalid { field: "crawl.concurrency", .. })
        ));
    }
}
