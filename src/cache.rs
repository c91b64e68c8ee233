//! # Dedup Cache
//!
//! In-process fast path for "has this product / keyword been handled
//! already". The store is the durable tier: the cache is seeded from it at
//! startup and the gateway and frontier mirror their writes into it.
//!
//! The cache is advisory. A miss that should have been a hit is corrected by
//! the store's upsert on the unique key, so bounding the cache (a preload
//! window plus an optional capacity with oldest-first eviction) only affects
//! how much work is skipped.

use crate::catalog::{KeywordKey, ProductKey};
use crate::store::{Store, StoreError};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};
use tracing::{info, instrument};

/// Configuration for the dedup cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Only products scraped within this many days are preloaded; `None` loads all
    pub product_window_days: Option<i64>,

    /// Maximum keys held per key space; `None` is unbounded
    pub capacity: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            product_window_days: Some(30),
            capacity: None,
        }
    }
}

#[derive(Debug)]
struct Members<K> {
    keys: HashSet<K>,
    order: VecDeque<K>,
}

/// A thread-safe set of keys with optional oldest-first eviction
#[derive(Debug)]
pub struct KeySet<K> {
    members: RwLock<Members<K>>,
    capacity: Option<usize>,
}

impl<K: Clone + Eq + Hash> KeySet<K> {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            members: RwLock::new(Members {
                keys: HashSet::new(),
                order: VecDeque::new(),
            }),
            capacity,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        members.keys.contains(key)
    }

    /// Add a key; returns `true` if it was not present
    pub fn insert(&self, key: K) -> bool {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        if !members.keys.insert(key.clone()) {
            return false;
        }
        members.order.push_back(key);

        if let Some(capacity) = self.capacity {
            while members.keys.len() > capacity {
                let Some(oldest) = members.order.pop_front() else {
                    break;
                };
                members.keys.remove(&oldest);
            }
        }
        true
    }

    /// Remove a key; returns `true` if it was present
    pub fn remove(&self, key: &K) -> bool {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        if !members.keys.remove(key) {
            return false;
        }
        members.order.retain(|k| k != key);
        true
    }

    pub fn len(&self) -> usize {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        members.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A key that lives in one of the cache's key spaces
pub trait DedupKey: Clone + Eq + Hash {
    fn space(cache: &DedupCache) -> &KeySet<Self>;
}

impl DedupKey for ProductKey {
    fn space(cache: &DedupCache) -> &KeySet<Self> {
        &cache.products
    }
}

impl DedupKey for KeywordKey {
    fn space(cache: &DedupCache) -> &KeySet<Self> {
        &cache.keywords
    }
}

/// Two-space membership cache plus the in-run product claim set
#[derive(Debug)]
pub struct DedupCache {
    products: KeySet<ProductKey>,
    keywords: KeySet<KeywordKey>,
    claims: KeySet<ProductKey>,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl DedupCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            products: KeySet::new(config.capacity),
            keywords: KeySet::new(config.capacity),
            claims: KeySet::new(None),
        }
    }

    /// Build a cache seeded from the store's products and scraped keywords
    #[instrument(skip(store))]
    pub async fn preload(store: &dyn Store, config: &CacheConfig) -> Result<Self, StoreError> {
        let cache = Self::new(config);
        let since = config
            .product_window_days
            .map(|days| Utc::now() - Duration::days(days));

        for key in store.product_keys_since(since).await? {
            cache.products.insert(key);
        }
        for key in store.scraped_keyword_keys().await? {
            cache.keywords.insert(key);
        }

        info!(
            products = cache.products.len(),
            keywords = cache.keywords.len(),
            "preloaded dedup cache"
        );
        Ok(cache)
    }

    pub fn seen<K: DedupKey>(&self, key: &K) -> bool {
        K::space(self).contains(key)
    }

    /// Record a key as handled; idempotent
    pub fn mark<K: DedupKey>(&self, key: K) -> bool {
        K::space(self).insert(key)
    }

    /// Claim a product for this run. Only one caller wins per key, and only
    /// if the product has not been seen already.
    pub fn try_claim(&self, key: &ProductKey) -> bool {
        !self.products.contains(key) && self.claims.insert(key.clone())
    }

    /// Give up a claim so the product can be tried again
    pub fn release(&self, key: &ProductKey) {
        self.claims.remove(key);
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}
