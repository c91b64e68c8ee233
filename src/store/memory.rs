//! In-process store

use crate::catalog::{Keyword, KeywordKey, NewKeyword, Product, ProductKey};
use crate::store::{CountFilter, Store, StoreError, UpsertMode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductKey, Product>,
    /// Insertion order doubles as the final queue tie-break
    keywords: Vec<Keyword>,
}

/// Store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn queue_order(keywords: &mut [&Keyword]) {
    keywords.sort_by_key(|k| (Reverse(k.priority), k.created_at));
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_products(&self, products: &[Product], mode: UpsertMode) -> Result<usize, StoreError> {
        let mut state = self.state();
        let mut written = 0;
        for product in products {
            let key = product.key();
            if let Some(existing) = state.products.get_mut(&key) {
                if mode == UpsertMode::Replace {
                    let scrape_count = existing.scrape_count + 1;
                    *existing = Product {
                        scrape_count,
                        ..product.clone()
                    };
                    written += 1;
                }
                continue;
            }
            state.products.insert(
                key,
                Product {
                    scrape_count: 1,
                    ..product.clone()
                },
            );
            written += 1;
        }
        Ok(written)
    }

    async fn product(&self, key: &ProductKey) -> Result<Option<Product>, StoreError> {
        Ok(self.state().products.get(key).cloned())
    }

    async fn product_keys_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<ProductKey>, StoreError> {
        Ok(self
            .state()
            .products
            .values()
            .filter(|p| since.is_none_or(|since| p.scraped_at >= since))
            .map(Product::key)
            .collect())
    }

    async fn insert_keywords(&self, keywords: &[NewKeyword], now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self.state();
        let mut inserted = 0;
        for keyword in keywords {
            let key = keyword.key();
            if state.keywords.iter().any(|k| k.key() == key) {
                continue;
            }
            state.keywords.push(keyword.clone().into_keyword(now));
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn keyword(&self, key: &KeywordKey) -> Result<Option<Keyword>, StoreError> {
        Ok(self.state().keywords.iter().find(|k| &k.key() == key).cloned())
    }

    async fn find_unscraped(&self, domain: &str, limit: usize, attempt_cap: u32) -> Result<Vec<Keyword>, StoreError> {
        let state = self.state();
        let mut pending: Vec<&Keyword> = state
            .keywords
            .iter()
            .filter(|k| !k.is_scraped && k.domain == domain && k.scraping_attempts < attempt_cap)
            .collect();
        queue_order(&mut pending);
        Ok(pending.into_iter().take(limit).cloned().collect())
    }

    async fn list_keywords(&self, domain: Option<&str>, limit: usize) -> Result<Vec<Keyword>, StoreError> {
        let state = self.state();
        let mut keywords: Vec<&Keyword> = state
            .keywords
            .iter()
            .filter(|k| domain.is_none_or(|d| k.domain == d))
            .collect();
        queue_order(&mut keywords);
        Ok(keywords.into_iter().take(limit).cloned().collect())
    }

    async fn scraped_keyword_keys(&self) -> Result<Vec<KeywordKey>, StoreError> {
        Ok(self
            .state()
            .keywords
            .iter()
            .filter(|k| k.is_scraped)
            .map(Keyword::key)
            .collect())
    }

    async fn record_attempt(&self, key: &KeywordKey, failed: bool, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.state();
        let Some(keyword) = state.keywords.iter_mut().find(|k| &k.key() == key) else {
            return Ok(false);
        };
        keyword.scraping_attempts += 1;
        keyword.last_attempt_at = Some(at);
        if failed {
            keyword.error_count += 1;
        }
        Ok(true)
    }

    async fn mark_complete(&self, key: &KeywordKey, products_found: u32, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.state();
        let Some(keyword) = state.keywords.iter_mut().find(|k| &k.key() == key) else {
            return Ok(false);
        };
        keyword.is_scraped = true;
        keyword.scraped_at = Some(at);
        keyword.products_found = products_found;
        keyword.success_count += 1;
        Ok(true)
    }

    async fn count(&self, filter: CountFilter) -> Result<u64, StoreError> {
        let state = self.state();
        let count = match filter {
            CountFilter::Products => state.products.len(),
            CountFilter::ProductsSince(since) => state.products.values().filter(|p| p.scraped_at >= since).count(),
            CountFilter::Keywords => state.keywords.len(),
            CountFilter::ScrapedKeywords => state.keywords.iter().filter(|k| k.is_scraped).count(),
            CountFilter::PendingKeywords => state.keywords.iter().filter(|k| !k.is_scraped).count(),
        };
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_keyword, sample_product};

    #[tokio::test]
    async fn test_replace_upsert_increments_scrape_count() {
        let store = MemoryStore::new();
        let first = sample_product("B000000001", Utc::now());
        let mut second = first.clone();
        second.price = Some(19.99);

        assert_eq!(store.upsert_products(&[first], UpsertMode::Replace).await.unwrap(), 1);
        assert_eq!(store.upsert_products(&[second], UpsertMode::Replace).await.unwrap(), 1);

        let stored = store.product(&ProductKey::new("B000000001", "us")).await.unwrap().unwrap();
        assert_eq!(stored.price, Some(19.99));
        assert_eq!(stored.scrape_count, 2);
        assert_eq!(store.count(CountFilter::Products).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_only_keeps_first_record() {
        let store = MemoryStore::new();
        let first = sample_product("B000000001", Utc::now());
        let mut second = first.clone();
        second.price = Some(19.99);

        store.upsert_products(&[first], UpsertMode::InsertOnly).await.unwrap();
        assert_eq!(store.upsert_products(&[second], UpsertMode::InsertOnly).await.unwrap(), 0);

        let stored = store.product(&ProductKey::new("B000000001", "us")).await.unwrap().unwrap();
        assert_eq!(stored.price, Some(9.99));
        assert_eq!(stored.scrape_count, 1);
    }

    #[tokio::test]
    async fn test_queue_order_and_attempt_cap() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_keywords(&[sample_keyword("low", 3), sample_keyword("first", 7)], now)
            .await
            .unwrap();
        store
            .insert_keywords(&[sample_keyword("second", 7), sample_keyword("first", 9)], now + chrono::Duration::seconds(1))
            .await
            .unwrap();

        let batch = store.find_unscraped("us", 10, 3).await.unwrap();
        let texts: Vec<_> = batch.iter().map(|k| k.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "low"]);

        let key = sample_keyword("first", 7).key();
        for _ in 0..3 {
            assert!(store.record_attempt(&key, true, now).await.unwrap());
        }
        let batch = store.find_unscraped("us", 10, 3).await.unwrap();
        assert!(batch.iter().all(|k| k.text != "first"));

        let keyword = store.keyword(&key).await.unwrap().unwrap();
        assert_eq!(keyword.scraping_attempts, 3);
        assert_eq!(keyword.error_count, 3);
        assert!(store.find_unscraped("uk", 10, 3).await.unwrap().is_empty());
    }
}
