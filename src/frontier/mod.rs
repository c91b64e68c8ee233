//! # Keyword Frontier
//!
//! A persisted priority queue of search terms. The frontier owns keyword
//! insertion (manual, generated or from the static list), hands out the next
//! batch to crawl, and records per-keyword progress.
//!
//! ## Key Components
//!
//! - `KeywordFrontier`: queue operations over a `Store`, mirrored into the dedup cache
//! - `KeywordScorer`: assigns priorities to new keywords
//! - `KeywordGenerator`: proposes keywords for a category
//!
//! Keywords are never deleted. A keyword leaves the queue when it is marked
//! scraped or when its attempt counter reaches the cap.

pub mod config;
pub mod error;
pub mod generator;
pub mod scorer;

pub use config::KeywordConfig;
pub use error::GenerateError;
pub use generator::{KeywordGenerator, PlaceholderGenerator};
pub use scorer::{FixedScorer, HeuristicScorer, KeywordScorer};

use crate::cache::DedupCache;
use crate::catalog::{Keyword, KeywordKey, NewKeyword, clamp_priority};
use crate::extract::parse::collapse_whitespace;
use crate::store::{Store, StoreError};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A keyword proposed for the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSeed {
    pub text: String,
    pub category: String,
    /// Explicit priority; the scorer decides when `None`
    pub priority: Option<u8>,
    pub generated_by: String,
}

impl KeywordSeed {
    pub fn new(text: impl Into<String>, category: impl Into<String>, generated_by: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            priority: None,
            generated_by: generated_by.into(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Priority queue of keywords backed by the store
pub struct KeywordFrontier {
    store: Arc<dyn Store>,
    cache: Arc<DedupCache>,
    scorer: Box<dyn KeywordScorer>,
    config: KeywordConfig,
}

impl KeywordFrontier {
    /// Frontier using the heuristic scorer
    pub fn new(store: Arc<dyn Store>, cache: Arc<DedupCache>, config: KeywordConfig) -> Self {
        Self::with_scorer(store, cache, config, Box::new(HeuristicScorer::default()))
    }

    pub fn with_scorer(
        store: Arc<dyn Store>,
        cache: Arc<DedupCache>,
        config: KeywordConfig,
        scorer: Box<dyn KeywordScorer>,
    ) -> Self {
        Self {
            store,
            cache,
            scorer,
            config,
        }
    }

    pub fn config(&self) -> &KeywordConfig {
        &self.config
    }

    /// Priority the scorer would give a new keyword
    pub fn priority_for(&self, text: &str, category: &str) -> u8 {
        self.scorer.score(text, category)
    }

    /// Insert new keywords for a domain; returns how many were inserted.
    ///
    /// Blank terms, repeats within the batch and (unless disabled) keywords
    /// the cache knows as scraped are skipped. Existing keys are left
    /// untouched by the store.
    #[instrument(skip(self, seeds), fields(count = seeds.len()))]
    pub async fn enqueue(&self, domain: &str, seeds: Vec<KeywordSeed>) -> Result<usize, StoreError> {
        let mut batch_keys = HashSet::new();
        let mut batch = Vec::with_capacity(seeds.len());

        for seed in seeds {
            let text = collapse_whitespace(&seed.text);
            if text.is_empty() {
                continue;
            }
            let keyword = NewKeyword {
                priority: seed
                    .priority
                    .map(|p| clamp_priority(p as i32))
                    .unwrap_or_else(|| self.scorer.score(&text, &seed.category)),
                text,
                domain: domain.to_string(),
                category: seed.category,
                generated_by: seed.generated_by,
            };

            let key = keyword.key();
            if self.config.skip_scraped && self.cache.seen(&key) {
                debug!(keyword = %key, "skipping scraped keyword");
                continue;
            }
            if batch_keys.insert(key) {
                batch.push(keyword);
            }
        }

        if batch.is_empty() {
            return Ok(0);
        }
        let inserted = self.store.insert_keywords(&batch, Utc::now()).await?;
        info!(offered = batch.len(), inserted, "enqueued keywords");
        Ok(inserted)
    }

    /// Add manual keywords at the configured manual priority
    pub async fn add_manual(
        &self,
        texts: &[String],
        domain: &str,
        category: Option<&str>,
    ) -> Result<usize, StoreError> {
        let category = category.unwrap_or(&self.config.manual_category);
        let seeds = texts
            .iter()
            .map(|text| KeywordSeed::new(text, category, "manual").with_priority(self.config.manual_priority))
            .collect();
        self.enqueue(domain, seeds).await
    }

    /// Enqueue the static keyword list
    pub async fn seed_static(&self, domain: &str) -> Result<usize, StoreError> {
        let seeds = self
            .config
            .static_keywords
            .iter()
            .map(|text| KeywordSeed::new(text, &self.config.static_category, "config"))
            .collect();
        self.enqueue(domain, seeds).await
    }

    /// Ask the generator about every configured category and enqueue the results.
    ///
    /// A generator failure for one category is logged and the remaining
    /// categories are still tried; only store failures abort.
    #[instrument(skip(self, generator), fields(generator = generator.name()))]
    pub async fn seed_from_generator(
        &self,
        generator: &dyn KeywordGenerator,
        domain: &str,
    ) -> Result<usize, GenerateError> {
        let source = format!("generator:{}", generator.name());
        let mut seeds = Vec::new();

        for _ in 0..self.config.generation_rounds {
            let results = join_all(self.config.categories.iter().map(|category| async move {
                (category, generator.generate(category, domain).await)
            }))
            .await;

            for (category, result) in results {
                match result {
                    Ok(texts) => seeds.extend(
                        texts
                            .into_iter()
                            .take(self.config.keywords_per_category)
                            .map(|text| KeywordSeed::new(text, category, &source)),
                    ),
                    Err(e) => warn!(category = %category, error = %e, "keyword generation failed"),
                }
            }
        }

        Ok(self.enqueue(domain, seeds).await?)
    }

    /// Next keywords to crawl, highest priority first
    pub async fn next_batch(&self, domain: &str, limit: usize) -> Result<Vec<Keyword>, StoreError> {
        self.store
            .find_unscraped(domain, limit, self.config.attempt_cap)
            .await
    }

    /// Count one attempt at a keyword
    pub async fn record_attempt(&self, key: &KeywordKey, failed: bool) -> Result<(), StoreError> {
        if !self.store.record_attempt(key, failed, Utc::now()).await? {
            warn!(keyword = %key, "attempt recorded for unknown keyword");
        }
        Ok(())
    }

    /// Mark a keyword scraped with the number of products found across its pages
    pub async fn mark_complete(&self, key: &KeywordKey, products_found: u32) -> Result<(), StoreError> {
        if !self.store.mark_complete(key, products_found, Utc::now()).await? {
            warn!(keyword = %key, "completion recorded for unknown keyword");
        }
        self.cache.mark(key.clone());
        Ok(())
    }

    /// Keywords in queue order for display
    pub async fn list(&self, domain: Option<&str>, limit: usize) -> Result<Vec<Keyword>, StoreError> {
        self.store.list_keywords(domain, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    fn frontier(config: KeywordConfig) -> (KeywordFrontier, Arc<MemoryStore>, Arc<DedupCache>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(DedupCache::default());
        let frontier = KeywordFrontier::new(store.clone(), cache.clone(), config);
        (frontier, store, cache)
    }

    struct FailingFor(&'static str);

    #[async_trait]
    impl KeywordGenerator for FailingFor {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(&self, category: &str, _domain: &str) -> Result<Vec<String>, GenerateError> {
            if category == self.0 {
                return Err(GenerateError::Generator {
                    generator: "flaky".to_string(),
                    category: category.to_string(),
                    message: "quota exceeded".to_string(),
                });
            }
            Ok(vec![format!("{} one", category), format!("{} two", category), format!("{} three", category)])
        }
    }

    #[tokio::test]
    async fn test_enqueue_rejects_duplicates() {
        let (frontier, _, _) = frontier(KeywordConfig::default());
        let seeds = vec![
            KeywordSeed::new("usb  cable ", "Electronics", "manual"),
            KeywordSeed::new("usb cable", "Electronics", "manual"),
            KeywordSeed::new("   ", "Electronics", "manual"),
            KeywordSeed::new("usb cable", "Office Products", "manual"),
        ];
        assert_eq!(frontier.enqueue("us", seeds.clone()).await.unwrap(), 2);
        assert_eq!(frontier.enqueue("us", seeds).await.unwrap(), 0);
        assert_eq!(frontier.enqueue("uk", vec![KeywordSeed::new("usb cable", "Electronics", "manual")]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_next_batch_orders_by_priority_then_age() {
        let (frontier, _, _) = frontier(KeywordConfig::default());
        frontier
            .enqueue(
                "us",
                vec![
                    KeywordSeed::new("first low", "Books", "manual").with_priority(3),
                    KeywordSeed::new("high", "Books", "manual").with_priority(9),
                    KeywordSeed::new("second low", "Books", "manual").with_priority(3),
                    KeywordSeed::new("clamped", "Books", "manual").with_priority(0),
                ],
            )
            .await
            .unwrap();

        let batch = frontier.next_batch("us", 10).await.unwrap();
        let texts: Vec<_> = batch.iter().map(|k| k.text.as_str()).collect();
        assert_eq!(texts, vec!["high", "first low", "second low", "clamped"]);
        assert_eq!(batch[3].priority, 1);
        assert!(frontier.next_batch("uk", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scorer_assigns_priority() {
        let (frontier, store, _) = frontier(KeywordConfig::default());
        frontier
            .enqueue("us", vec![KeywordSeed::new("wireless headphones", "Electronics", "generator:test")])
            .await
            .unwrap();
        let key = KeywordKey::new("wireless headphones", "us", "Electronics");
        let keyword = store.keyword(&key).await.unwrap().unwrap();
        assert_eq!(keyword.priority, 9);
        assert_eq!(keyword.generated_by, "generator:test");
    }

    #[tokio::test]
    async fn test_manual_keywords_use_manual_priority() {
        let (frontier, store, _) = frontier(KeywordConfig::default());
        let texts = vec!["kitchen knife set".to_string()];
        assert_eq!(frontier.add_manual(&texts, "us", None).await.unwrap(), 1);

        let keyword = store
            .keyword(&KeywordKey::new("kitchen knife set", "us", "Manual"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(keyword.priority, 8);
        assert_eq!(keyword.generated_by, "manual");
    }

    #[tokio::test]
    async fn test_scraped_keywords_are_skipped() {
        let (frontier, _, cache) = frontier(KeywordConfig::default());
        cache.mark(KeywordKey::new("laptop", "us", "Manual"));
        let texts = vec!["laptop".to_string(), "tablet".to_string()];
        assert_eq!(frontier.add_manual(&texts, "us", None).await.unwrap(), 1);

        let (frontier, _, cache) = frontier_without_skip();
        cache.mark(KeywordKey::new("laptop", "us", "Manual"));
        assert_eq!(frontier.add_manual(&texts, "us", None).await.unwrap(), 2);
    }

    fn frontier_without_skip() -> (KeywordFrontier, Arc<MemoryStore>, Arc<DedupCache>) {
        frontier(KeywordConfig::builder().skip_scraped(false).build())
    }

    #[tokio::test]
    async fn test_progress_counters_and_cap() {
        let (frontier, store, cache) = frontier(KeywordConfig::default());
        frontier
            .enqueue(
                "us",
                vec![
                    KeywordSeed::new("flaky", "Books", "manual"),
                    KeywordSeed::new("solid", "Books", "manual"),
                ],
            )
            .await
            .unwrap();
        let flaky = KeywordKey::new("flaky", "us", "Books");
        let solid = KeywordKey::new("solid", "us", "Books");

        for _ in 0..3 {
            frontier.record_attempt(&flaky, true).await.unwrap();
        }
        frontier.record_attempt(&solid, false).await.unwrap();
        frontier.mark_complete(&solid, 12).await.unwrap();

        let keyword = store.keyword(&flaky).await.unwrap().unwrap();
        assert_eq!(keyword.scraping_attempts, 3);
        assert_eq!(keyword.error_count, 3);

        let keyword = store.keyword(&solid).await.unwrap().unwrap();
        assert!(keyword.is_scraped);
        assert_eq!(keyword.success_count, 1);
        assert_eq!(keyword.products_found, 12);
        assert!(cache.seen(&solid));

        assert!(frontier.next_batch("us", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generator_failures_are_per_category() {
        let config = KeywordConfig::builder()
            .categories(vec!["Books".to_string(), "Beauty".to_string()])
            .keywords_per_category(2)
            .build();
        let (frontier, _, _) = frontier(config);

        let inserted = frontier.seed_from_generator(&FailingFor("Beauty"), "us").await.unwrap();
        assert_eq!(inserted, 2);

        let batch = frontier.next_batch("us", 10).await.unwrap();
        assert!(batch.iter().all(|k| k.category == "Books"));
        assert!(batch.iter().all(|k| k.generated_by == "generator:flaky"));
    }

    #[tokio::test]
    async fn test_seed_static() {
        let config = KeywordConfig::builder()
            .static_keywords(vec!["laptop".to_string(), "webcam".to_string()])
            .build();
        let (frontier, _, _) = frontier(config);
        assert_eq!(frontier.seed_static("de").await.unwrap(), 2);
        let batch = frontier.list(Some("de"), 10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|k| k.category == "General" && k.generated_by == "config"));
    }
}
