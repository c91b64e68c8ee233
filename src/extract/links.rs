//! Candidate link extraction from search results pages

use crate::extract::error::ExtractError;
use crate::extract::strategy::{PageView, css, element_text};
use scraper::Selector;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// A detail page linked from a results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub asin: String,
    pub url: String,
}

/// What a results page yielded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsPage {
    /// Detail links in page order, one per product
    pub links: Vec<CandidateLink>,
    /// Whether the page offers a following page
    pub has_next_page: bool,
    pub sponsored_skipped: usize,
}

pub(crate) struct LinkRules {
    blocks: Selector,
    sponsored: Selector,
    detail_link: Selector,
    next_page: Vec<Selector>,
}

impl LinkRules {
    pub(crate) fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            blocks: css(
                r#".s-result-item[data-asin], div[data-component-type="s-search-result"][data-asin]"#,
            )?,
            sponsored: css(r#".puis-sponsored-label-text, .s-sponsored-label-text, [data-component-type="sp-sponsored-result"]"#)?,
            detail_link: css(r#"a[href*="/dp/"], a[href*="/gp/product/"]"#)?,
            next_page: vec![
                css(".s-pagination-next:not(.s-pagination-disabled)")?,
                css(r#"a[aria-label="Go to next page"]"#)?,
                css(".a-pagination .a-last:not(.a-disabled)")?,
            ],
        })
    }

    pub(crate) fn extract(&self, page: &PageView) -> ResultsPage {
        let base = Url::parse(page.url()).ok();
        let mut seen = HashSet::new();
        let mut result = ResultsPage::default();

        for block in page.document().select(&self.blocks) {
            let asin = block.value().attr("data-asin").unwrap_or_default().trim();
            if asin.is_empty() || seen.contains(asin) {
                continue;
            }

            if block.select(&self.sponsored).next().is_some() || element_text(block).contains("Sponsored") {
                result.sponsored_skipped += 1;
                continue;
            }

            let Some(href) = block
                .select(&self.detail_link)
                .find_map(|link| link.value().attr("href"))
            else {
                continue;
            };

            let url = match &base {
                Some(base) => base.join(href).map(String::from).ok(),
                None => Url::parse(href).map(String::from).ok(),
            };
            match url {
                Some(url) => {
                    seen.insert(asin.to_string());
                    result.links.push(CandidateLink {
                        asin: asin.to_string(),
                        url,
                    });
                }
                None => debug!(asin, href, "skipping unresolvable detail link"),
            }
        }

        result.has_next_page = self
            .next_page
            .iter()
            .any(|selector| page.document().select(selector).next().is_some());

        result
    }
}
