//! # Keyword Configuration Module
//!
//! Where keywords come from and how the frontier treats them.

use serde::{Deserialize, Serialize};

const STATIC_KEYWORDS: [&str; 15] = [
    "wireless headphones",
    "laptop",
    "smartphone",
    "gaming chair",
    "bluetooth speaker",
    "coffee machine",
    "running shoes",
    "tablet",
    "smart watch",
    "air fryer",
    "gaming mouse",
    "mechanical keyboard",
    "webcam",
    "monitor",
    "graphics card",
];

/// Configuration for the keyword frontier and keyword generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Attempts after which an unscraped keyword is no longer handed out
    pub attempt_cap: u32,

    /// Priority given to manually added keywords
    pub manual_priority: u8,

    /// Category given to manually added keywords
    pub manual_category: String,

    /// Whether generator output is enqueued before a crawl
    pub generation_enabled: bool,

    /// Categories the generator is asked about
    pub categories: Vec<String>,

    /// Keywords kept per category and generation round
    pub keywords_per_category: usize,

    /// How many times the generator is asked per category
    pub generation_rounds: u32,

    /// Fallback keywords when the store yields nothing and no generator ran
    pub static_keywords: Vec<String>,

    /// Category given to the fallback keywords
    pub static_category: String,

    /// Skip enqueuing keywords the dedup cache already knows as scraped
    pub skip_scraped: bool,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            attempt_cap: 3,
            manual_priority: 8,
            manual_category: "Manual".to_string(),
            generation_enabled: true,
            categories: vec!["Electronics".to_string(), "Home & Kitchen".to_string()],
            keywords_per_category: 2,
            generation_rounds: 1,
            static_keywords: STATIC_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            static_category: "General".to_string(),
            skip_scraped: true,
        }
    }
}

/// Builder for KeywordConfig
#[derive(Debug, Default)]
pub struct KeywordConfigBuilder {
    config: KeywordConfig,
}

impl KeywordConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_cap(mut self, attempt_cap: u32) -> Self {
        self.config.attempt_cap = attempt_cap;
        self
    }

    pub fn manual_priority(mut self, manual_priority: u8) -> Self {
        self.config.manual_priority = manual_priority;
        self
    }

    pub fn manual_category(mut self, manual_category: impl Into<String>) -> Self {
        self.config.manual_category = manual_category.into();
        self
    }

    pub fn generation_enabled(mut self, generation_enabled: bool) -> Self {
        self.config.generation_enabled = generation_enabled;
        self
    }

    pub fn categories(mut self, categories: Vec<String>) -> Self {
        self.config.categories = categories;
        self
    }

    pub fn keywords_per_category(mut self, keywords_per_category: usize) -> Self {
        self.config.keywords_per_category = keywords_per_category;
        self
    }

    pub fn generation_rounds(mut self, generation_rounds: u32) -> Self {
        self.config.generation_rounds = generation_rounds;
        self
    }

    pub fn static_keywords(mut self, static_keywords: Vec<String>) -> Self {
        self.config.static_keywords = static_keywords;
        self
    }

    pub fn skip_scraped(mut self, skip_scraped: bool) -> Self {
        self.config.skip_scraped = skip_scraped;
        self
    }

    pub fn build(self) -> KeywordConfig {
        self.config
    }
}

impl KeywordConfig {
    pub fn builder() -> KeywordConfigBuilder {
        KeywordConfigBuilder::new()
    }
}
