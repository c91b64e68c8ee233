//! # Catalog Records
//!
//! Records shared by the crawl orchestrator, the keyword frontier, the
//! persistence gateway and the store.
//!
//! ## Key Components
//!
//! - `Keyword`: a persisted search term with its progress counters
//! - `Product`: a normalized product record keyed by `(asin, domain)`
//! - `CrawlTask`: an ephemeral `(keyword, page)` unit of work
//! - `ProductKey` / `KeywordKey`: the unique keys of the two collections
//! - Marketplace codes and their hosts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketplace used when none is configured
pub const DEFAULT_DOMAIN: &str = "us";

/// Lowest keyword priority
pub const MIN_PRIORITY: u8 = 1;

/// Highest keyword priority
pub const MAX_PRIORITY: u8 = 10;

const MARKETPLACES: &[(&str, &str)] = &[
    ("us", "amazon.com"),
    ("uk", "amazon.co.uk"),
    ("de", "amazon.de"),
    ("fr", "amazon.fr"),
    ("es", "amazon.es"),
    ("it", "amazon.it"),
    ("ca", "amazon.ca"),
    ("jp", "amazon.co.jp"),
    ("au", "amazon.com.au"),
    ("in", "amazon.in"),
    ("mx", "amazon.com.mx"),
    ("br", "amazon.com.br"),
];

/// Host serving the given marketplace code, if the code is known
pub fn marketplace_host(domain: &str) -> Option<&'static str> {
    MARKETPLACES
        .iter()
        .find(|(code, _)| *code == domain)
        .map(|(_, host)| *host)
}

/// All known marketplace codes
pub fn marketplace_codes() -> impl Iterator<Item = &'static str> {
    MARKETPLACES.iter().map(|(code, _)| *code)
}

/// Clamp an arbitrary score into the keyword priority range
pub fn clamp_priority(score: i32) -> u8 {
    score.clamp(MIN_PRIORITY as i32, MAX_PRIORITY as i32) as u8
}

/// Unique key of a product record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductKey {
    pub asin: String,
    pub domain: String,
}

impl ProductKey {
    pub fn new(asin: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            asin: asin.into(),
            domain: domain.into(),
        }
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.asin, self.domain)
    }
}

/// Unique key of a keyword record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordKey {
    pub text: String,
    pub domain: String,
    pub category: String,
}

impl KeywordKey {
    pub fn new(
        text: impl Into<String>,
        domain: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            domain: domain.into(),
            category: category.into(),
        }
    }
}

impl fmt::Display for KeywordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' [{}] @{}", self.text, self.category, self.domain)
    }
}

/// A persisted search term and its crawl progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub domain: String,
    pub category: String,
    pub priority: u8,
    /// Where the keyword came from: `manual`, `config` or `generator:<name>`
    pub generated_by: String,
    pub is_scraped: bool,
    pub scraping_attempts: u32,
    pub success_count: u32,
    pub error_count: u32,
    pub products_found: u32,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub scraped_at: Option<DateTime<Utc>>,
}

impl Keyword {
    pub fn key(&self) -> KeywordKey {
        KeywordKey::new(&self.text, &self.domain, &self.category)
    }
}

/// A keyword waiting to be inserted into the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKeyword {
    pub text: String,
    pub domain: String,
    pub category: String,
    pub priority: u8,
    pub generated_by: String,
}

impl NewKeyword {
    pub fn key(&self) -> KeywordKey {
        KeywordKey::new(&self.text, &self.domain, &self.category)
    }

    /// Fresh, never-attempted keyword record created at `now`
    pub fn into_keyword(self, now: DateTime<Utc>) -> Keyword {
        Keyword {
            text: self.text,
            domain: self.domain,
            category: self.category,
            priority: self.priority,
            generated_by: self.generated_by,
            is_scraped: false,
            scraping_attempts: 0,
            success_count: 0,
            error_count: 0,
            products_found: 0,
            created_at: now,
            last_attempt_at: None,
            scraped_at: None,
        }
    }
}

/// One ranking of the product within a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRank {
    pub rank: u32,
    pub category: String,
}

/// Delivery promise shown on the detail page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub text: Option<String>,
    pub estimate: Option<String>,
    /// Days from the crawl day until the promised delivery day
    pub days: Option<u32>,
}

/// Who sells and ships the offer in the buy box
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub sold_by: Option<String>,
    pub dispatches_from: Option<String>,
    pub fulfilled_by: Option<String>,
    pub is_buy_box_winner: bool,
}

/// Stock state of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Temporarily Unavailable")]
    TemporarilyUnavailable,
    #[serde(rename = "Limited Stock")]
    LimitedStock,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Availability::InStock => "In Stock",
            Availability::OutOfStock => "Out of Stock",
            Availability::TemporarilyUnavailable => "Temporarily Unavailable",
            Availability::LimitedStock => "Limited Stock",
        };
        f.write_str(label)
    }
}

/// A normalized product record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub asin: String,
    pub domain: String,
    pub title: Option<String>,
    pub brand: Option<String>,
    pub price: Option<f64>,
    pub star_rating: Option<f64>,
    pub num_ratings: Option<u64>,
    pub best_seller_rank: Option<u32>,
    pub best_seller_category: Option<String>,
    #[serde(default)]
    pub sub_ranks: Vec<SalesRank>,
    pub shipping_cost: Option<f64>,
    #[serde(default)]
    pub delivery: Delivery,
    #[serde(default)]
    pub seller: Seller,
    pub availability: Option<Availability>,
    #[serde(default)]
    pub is_prime: bool,
    pub listing_date: Option<String>,
    pub product_url: String,
    pub keyword: String,
    pub category: String,
    pub page_number: u32,
    pub scraped_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub scrape_count: u32,
}

impl Product {
    pub fn key(&self) -> ProductKey {
        ProductKey::new(&self.asin, &self.domain)
    }
}

/// A single results page to fetch for a keyword
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlTask {
    pub keyword: String,
    pub domain: String,
    pub category: String,
    pub page_number: u32,
}

impl CrawlTask {
    /// First results page of a keyword
    pub fn first_page(keyword: &Keyword) -> Self {
        Self {
            keyword: keyword.text.clone(),
            domain: keyword.domain.clone(),
            category: keyword.category.clone(),
            page_number: 1,
        }
    }

    /// The task for the following results page of the same keyword
    pub fn next_page(&self) -> Self {
        Self {
            page_number: self.page_number + 1,
            ..self.clone()
        }
    }

    pub fn key(&self) -> KeywordKey {
        KeywordKey::new(&self.keyword, &self.domain, &self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marketplace_hosts() {
        assert_eq!(marketplace_host("us"), Some("amazon.com"));
        assert_eq!(marketplace_host("uk"), Some("amazon.co.uk"));
        assert_eq!(marketplace_host("zz"), None);
        assert_eq!(marketplace_codes().count(), 12);
    }

    #[test]
    fn test_clamp_priority() {
        assert_eq!(clamp_priority(-3), 1);
        assert_eq!(clamp_priority(7), 7);
        assert_eq!(clamp_priority(42), 10);
    }

    #[test]
    fn test_next_page_keeps_lineage() {
        let keyword = NewKeyword {
            text: "usb c cable".to_string(),
            domain: "uk".to_string(),
            category: "Electronics".to_string(),
            priority: 6,
            generated_by: "manual".to_string(),
        }
        .into_keyword(Utc::now());

        let first = CrawlTask::first_page(&keyword);
        let second = first.next_page();
        assert_eq!(first.page_number, 1);
        assert_eq!(second.page_number, 2);
        assert_eq!(second.key(), keyword.key());
    }

    #[test]
    fn test_availability_serializes_as_label() {
        let json = serde_json::to_string(&Availability::TemporarilyUnavailable).unwrap();
        assert_eq!(json, "\"Temporarily Unavailable\"");
        assert_eq!(Availability::InStock.to_string(), "In Stock");
    }
}
