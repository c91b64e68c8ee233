//! # Fetcher Configuration Module
//!
//! Transport settings for the default HTTP fetcher: timeouts, politeness
//! delay, retries and the browser identity presented to the site.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENTS: [&str; 6] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Minimum delay between requests in milliseconds; 0 disables rate limiting
    pub request_delay_ms: u64,

    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,

    /// Statuses worth retrying
    pub retry_statuses: Vec<u16>,

    /// Base backoff between retries in milliseconds, multiplied by the attempt number
    pub retry_backoff_ms: u64,

    /// Pool of user agents; one is picked at random per request
    pub user_agents: Vec<String>,

    /// Headers sent with every request
    pub default_headers: Vec<(String, String)>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 180,
            request_delay_ms: 500,
            max_retries: 3,
            retry_statuses: vec![500, 502, 503, 504, 522, 524, 408, 429],
            retry_backoff_ms: 1_000,
            user_agents: USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            default_headers: vec![
                (
                    "Accept".to_string(),
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
                ),
                ("Accept-Language".to_string(), "en-GB,en;q=0.5".to_string()),
                ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
            ],
        }
    }
}

/// Builder for FetcherConfig
#[derive(Debug, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request timeout in seconds
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Set the minimum delay between requests in milliseconds
    pub fn request_delay_ms(mut self, request_delay_ms: u64) -> Self {
        self.config.request_delay_ms = request_delay_ms;
        self
    }

    /// Set how many times a retryable failure is retried
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn retry_statuses(mut self, retry_statuses: Vec<u16>) -> Self {
        self.config.retry_statuses = retry_statuses;
        self
    }

    pub fn retry_backoff_ms(mut self, retry_backoff_ms: u64) -> Self {
        self.config.retry_backoff_ms = retry_backoff_ms;
        self
    }

    /// Replace the user agent pool
    pub fn user_agents(mut self, user_agents: Vec<String>) -> Self {
        self.config.user_agents = user_agents;
        self
    }

    /// Add a header sent with every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

impl FetcherConfig {
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
