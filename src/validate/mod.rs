//! # Validation & Normalization
//!
//! Turns a raw extraction into a normalized [`Product`] and a list of
//! advisory findings. Validation never fails: the outcome is either `Kept`
//! or, for an out-of-range price with filtering switched on, `Dropped`.

pub mod config;

pub use config::{ValidationConfig, ValidationConfigBuilder};

use crate::catalog::{CrawlTask, Product, ProductKey};
use crate::extract::ExtractedProduct;
use crate::extract::parse;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::warn;

/// Length of a well-formed product identifier
pub const IDENTIFIER_LEN: usize = 10;

/// What a finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    MalformedIdentifier,
    PriceOutOfRange,
    RatingOutOfRange,
    TitleTooLong,
    MissingTitle,
}

/// An advisory observation about a record
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub kind: FindingKind,
    pub detail: String,
}

/// Why a record was dropped
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    PriceOutOfRange(f64),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::PriceOutOfRange(price) => write!(f, "price {} out of range", price),
        }
    }
}

/// Per-record outcome of validation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Kept(Product),
    Dropped { key: ProductKey, reason: DropReason },
}

/// Outcome plus every finding raised on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub outcome: Outcome,
    pub findings: Vec<Finding>,
}

impl Validated {
    pub fn has(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }
}

/// Validates and normalizes extracted products
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Normalize a raw extraction found while crawling `task`
    pub fn validate(&self, raw: ExtractedProduct, task: &CrawlTask, now: DateTime<Utc>) -> Validated {
        let mut findings = Vec::new();
        let config = &self.config;

        let asin = raw.asin.trim().to_string();
        if asin.len() != IDENTIFIER_LEN || !asin.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            findings.push(Finding {
                kind: FindingKind::MalformedIdentifier,
                detail: format!("identifier '{}'", asin),
            });
        }

        let title = raw.title.as_deref().and_then(parse::text);
        match &title {
            None => findings.push(Finding {
                kind: FindingKind::MissingTitle,
                detail: "no title found".to_string(),
            }),
            Some(title) if title.chars().count() > config.max_title_length => findings.push(Finding {
                kind: FindingKind::TitleTooLong,
                detail: format!("{} characters", title.chars().count()),
            }),
            Some(_) => {}
        }

        let price_out_of_range = raw
            .price
            .filter(|price| *price < config.min_price || *price > config.max_price);
        if let Some(price) = price_out_of_range {
            findings.push(Finding {
                kind: FindingKind::PriceOutOfRange,
                detail: format!("price {}", price),
            });
        }

        if let Some(rating) = raw
            .star_rating
            .filter(|r| *r < config.min_star_rating || *r > config.max_star_rating)
        {
            findings.push(Finding {
                kind: FindingKind::RatingOutOfRange,
                detail: format!("star rating {}", rating),
            });
        }

        for finding in &findings {
            warn!(asin = %asin, kind = ?finding.kind, "{}", finding.detail);
        }

        let key = ProductKey::new(&asin, &task.domain);
        if let (Some(price), true) = (price_out_of_range, config.filter_invalid_prices) {
            return Validated {
                outcome: Outcome::Dropped {
                    key,
                    reason: DropReason::PriceOutOfRange(price),
                },
                findings,
            };
        }

        let mut ranks = raw.ranks.into_iter();
        let primary = ranks.next();

        let product = Product {
            asin,
            domain: task.domain.clone(),
            title,
            brand: raw.brand.as_deref().and_then(parse::brand),
            price: raw.price,
            star_rating: raw.star_rating,
            num_ratings: raw.num_ratings,
            best_seller_rank: primary.as_ref().map(|r| r.rank),
            best_seller_category: primary.map(|r| r.category),
            sub_ranks: ranks.collect(),
            shipping_cost: raw.shipping_cost,
            delivery: raw.delivery,
            seller: raw.seller,
            availability: raw.availability,
            is_prime: raw.is_prime,
            listing_date: raw.listing_date.as_deref().and_then(parse::text),
            product_url: raw.url,
            keyword: task.keyword.clone(),
            category: task.category.clone(),
            page_number: task.page_number,
            scraped_at: now,
            updated_at: now,
            scrape_count: 1,
        };

        Validated {
            outcome: Outcome::Kept(product),
            findings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Delivery, SalesRank, Seller};

    fn task() -> CrawlTask {
        CrawlTask {
            keyword: "usb cable".to_string(),
            domain: "uk".to_string(),
            category: "Electronics".to_string(),
            page_number: 2,
        }
    }

    fn raw(price: Option<f64>, rating: Option<f64>) -> ExtractedProduct {
        ExtractedProduct {
            asin: "B000000001".to_string(),
            url: "https://www.amazon.co.uk/dp/B000000001".to_string(),
            title: Some("  A   Cable ".to_string()),
            brand: Some("Visit the Anker Store".to_string()),
            price,
            star_rating: rating,
            num_ratings: Some(10),
            ranks: vec![
                SalesRank { rank: 5, category: "Electronics".to_string() },
                SalesRank { rank: 2, category: "Cables".to_string() },
            ],
            shipping_cost: None,
            delivery: Delivery::default(),
            seller: Seller::default(),
            availability: None,
            is_prime: false,
            listing_date: None,
            strategies: Vec::new(),
        }
    }

    #[test]
    fn test_normalizes_kept_record() {
        let validated = Validator::default().validate(raw(Some(12.99), Some(4.5)), &task(), Utc::now());
        assert!(validated.findings.is_empty());

        let Outcome::Kept(product) = validated.outcome else {
            panic!("record should be kept");
        };
        assert_eq!(product.title.as_deref(), Some("A Cable"));
        assert_eq!(product.brand.as_deref(), Some("Anker"));
        assert_eq!(product.best_seller_rank, Some(5));
        assert_eq!(product.best_seller_category.as_deref(), Some("Electronics"));
        assert_eq!(product.sub_ranks.len(), 1);
        assert_eq!(product.domain, "uk");
        assert_eq!(product.page_number, 2);
        assert_eq!(product.scrape_count, 1);
    }

    #[test]
    fn test_rating_out_of_range_is_flagged_not_dropped() {
        let validated = Validator::default().validate(raw(Some(10.0), Some(6.0)), &task(), Utc::now());
        assert!(validated.has(FindingKind::RatingOutOfRange));
        assert!(matches!(validated.outcome, Outcome::Kept(_)));
    }

    #[test]
    fn test_price_out_of_range_drops_only_when_filtering() {
        let validated = Validator::default().validate(raw(Some(250_000.0), None), &task(), Utc::now());
        assert!(validated.has(FindingKind::PriceOutOfRange));
        assert_eq!(
            validated.outcome,
            Outcome::Dropped {
                key: ProductKey::new("B000000001", "uk"),
                reason: DropReason::PriceOutOfRange(250_000.0),
            }
        );

        let lenient = Validator::new(ValidationConfig::builder().filter_invalid_prices(false).build());
        let validated = lenient.validate(raw(Some(0.0), None), &task(), Utc::now());
        assert!(validated.has(FindingKind::PriceOutOfRange));
        assert!(matches!(validated.outcome, Outcome::Kept(_)));
    }

    #[test]
    fn test_identifier_and_title_findings() {
        let mut record = raw(None, None);
        record.asin = "B0SHORT".to_string();
        record.title = None;
        let validated = Validator::default().validate(record, &task(), Utc::now());
        assert!(validated.has(FindingKind::MalformedIdentifier));
        assert!(validated.has(FindingKind::MissingTitle));
        assert!(matches!(validated.outcome, Outcome::Kept(_)));

        let mut record = raw(None, None);
        record.title = Some("x".repeat(501));
        let validated = Validator::default().validate(record, &task(), Utc::now());
        assert!(validated.has(FindingKind::TitleTooLong));
    }
}
