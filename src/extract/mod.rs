//! # Extraction Engine
//!
//! Turns fetched page bodies into either candidate detail links (search
//! results pages) or a raw product record (detail pages).
//!
//! ## Key Components
//!
//! - `ExtractionEngine`: compiled link and product rules, shared across tasks
//! - `FieldChain`: ordered, named strategies for a single field
//! - `parse`: coercions from raw strings into typed values
//!
//! Every product field is described as data: an ordered strategy table of
//! structural selectors for the known layout variants followed by full-text
//! fallbacks. The first strategy producing a non-empty, parseable value wins.
//! A field with no winning strategy is simply absent.

pub mod error;
mod links;
pub mod parse;
mod product;
pub mod strategy;

pub use error::ExtractError;
pub use links::{CandidateLink, ResultsPage};
pub use product::ExtractedProduct;
pub use strategy::{FieldChain, Locate, PageView, Resolved, Strategy};

use chrono::Weekday;
use links::LinkRules;
use product::ProductRules;
use tracing::debug;

/// Which kind of page a body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    SearchResults,
    ProductDetail,
}

/// What the engine found on a page
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Links(ResultsPage),
    Product(Option<ExtractedProduct>),
}

/// Compiled extraction rules for results and detail pages
pub struct ExtractionEngine {
    links: LinkRules,
    product: ProductRules,
}

impl ExtractionEngine {
    /// Compile every selector and pattern in the strategy tables
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            links: LinkRules::new()?,
            product: ProductRules::new()?,
        })
    }

    /// Extract whatever the given page kind carries
    pub fn extract(&self, kind: PageKind, url: &str, body: &str, today: Weekday) -> Extraction {
        match kind {
            PageKind::SearchResults => Extraction::Links(self.extract_links(url, body)),
            PageKind::ProductDetail => Extraction::Product(self.extract_product(url, body, today)),
        }
    }

    /// Ordered, duplicate-free candidate links and the next-page indicator
    pub fn extract_links(&self, url: &str, body: &str) -> ResultsPage {
        let page = PageView::parse(url, body);
        let results = self.links.extract(&page);
        debug!(
            url,
            links = results.links.len(),
            sponsored = results.sponsored_skipped,
            has_next_page = results.has_next_page,
            "extracted results page"
        );
        results
    }

    /// Product fields of a detail page; `None` when the page has no identifier
    pub fn extract_product(&self, url: &str, body: &str, today: Weekday) -> Option<ExtractedProduct> {
        let page = PageView::parse(url, body);
        let product = self.product.extract(&page, today);
        match &product {
            Some(product) => debug!(url, asin = %product.asin, fields = product.strategies.len(), "extracted product"),
            None => debug!(url, "no product identifier on page"),
        }
        product
    }
}
