//! # Persistent Store
//!
//! The durable tier behind the frontier, the gateway and the dedup cache.
//!
//! ## Key Components
//!
//! - `Store`: async trait over the two collections (`products`, `keywords`)
//! - `LibsqlStore`: local libsql database file
//! - `MemoryStore`: in-process store for tests and throwaway runs
//!
//! Both implementations enforce the unique keys `(asin, domain)` and
//! `(text, domain, category)`; upserting on those keys is what makes
//! repeated runs idempotent.

pub mod database;
pub mod error;
pub mod memory;
pub mod schema;

pub use database::LibsqlStore;
pub use error::StoreError;
pub use memory::MemoryStore;

use crate::catalog::{Keyword, KeywordKey, NewKeyword, Product, ProductKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happens when a product with an existing key is written again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertMode {
    /// Replace the stored record and increment its scrape count
    #[default]
    Replace,
    /// Keep the stored record untouched
    InsertOnly,
}

/// What to count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountFilter {
    Products,
    ProductsSince(DateTime<Utc>),
    Keywords,
    ScrapedKeywords,
    PendingKeywords,
}

/// Persistent store for products and keywords
#[async_trait]
pub trait Store: Send + Sync {
    /// Write products keyed by `(asin, domain)`; returns how many were written
    async fn upsert_products(&self, products: &[Product], mode: UpsertMode) -> Result<usize, StoreError>;

    async fn product(&self, key: &ProductKey) -> Result<Option<Product>, StoreError>;

    /// Keys of products scraped at or after `since` (all products when `None`)
    async fn product_keys_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<ProductKey>, StoreError>;

    /// Insert keywords, ignoring ones whose key already exists; returns how many were inserted
    async fn insert_keywords(&self, keywords: &[NewKeyword], now: DateTime<Utc>) -> Result<usize, StoreError>;

    async fn keyword(&self, key: &KeywordKey) -> Result<Option<Keyword>, StoreError>;

    /// Unscraped keywords under the attempt cap, highest priority first, then oldest
    async fn find_unscraped(&self, domain: &str, limit: usize, attempt_cap: u32) -> Result<Vec<Keyword>, StoreError>;

    /// Keywords in queue order, optionally restricted to one domain
    async fn list_keywords(&self, domain: Option<&str>, limit: usize) -> Result<Vec<Keyword>, StoreError>;

    async fn scraped_keyword_keys(&self) -> Result<Vec<KeywordKey>, StoreError>;

    /// Count an attempt; a failed one also counts as an error. Returns whether the keyword exists.
    async fn record_attempt(&self, key: &KeywordKey, failed: bool, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Mark a keyword scraped. Returns whether the keyword exists.
    async fn mark_complete(&self, key: &KeywordKey, products_found: u32, at: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn count(&self, filter: CountFilter) -> Result<u64, StoreError>;
}

/// Totals reported by the `stats` command and at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_products: u64,
    pub products_today: u64,
    pub total_keywords: u64,
    pub scraped_keywords: u64,
    pub pending_keywords: u64,
}

impl StoreStats {
    pub async fn collect(store: &dyn Store) -> Result<Self, StoreError> {
        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or_else(Utc::now);

        Ok(Self {
            total_products: store.count(CountFilter::Products).await?,
            products_today: store.count(CountFilter::ProductsSince(midnight)).await?,
            total_keywords: store.count(CountFilter::Keywords).await?,
            scraped_keywords: store.count(CountFilter::ScrapedKeywords).await?,
            pending_keywords: store.count(CountFilter::PendingKeywords).await?,
        })
    }
}
