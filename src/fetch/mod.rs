//! # Page Fetching
//!
//! The transport seam between the crawler and the network. The crawler only
//! sees pass or fail: a [`FetchedPage`] for a 2xx response, a [`FetchError`]
//! for anything else. Retrying is the fetcher's business, never the caller's.

pub mod config;
pub mod error;
pub mod http;

pub use config::{FetcherConfig, FetcherConfigBuilder};
pub use error::FetchError;
pub use http::HttpFetcher;

use async_trait::async_trait;

/// A page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Extra headers for this request only
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Fetches pages over some transport
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError>;
}
