//! Shared fixtures for unit tests

use crate::catalog::{Delivery, NewKeyword, Product, Seller};
use crate::fetch::{FetchError, FetchRequest, FetchedPage, Fetcher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub fn sample_product(asin: &str, scraped_at: DateTime<Utc>) -> Product {
    Product {
        asin: asin.to_string(),
        domain: "us".to_string(),
        title: Some("Test product".to_string()),
        brand: None,
        price: Some(9.99),
        star_rating: None,
        num_ratings: None,
        best_seller_rank: None,
        best_seller_category: None,
        sub_ranks: Vec::new(),
        shipping_cost: None,
        delivery: Delivery::default(),
        seller: Seller::default(),
        availability: None,
        is_prime: false,
        listing_date: None,
        product_url: format!("https://www.amazon.com/dp/{}", asin),
        keyword: "cable".to_string(),
        category: "Electronics".to_string(),
        page_number: 1,
        scraped_at,
        updated_at: scraped_at,
        scrape_count: 1,
    }
}

pub fn sample_keyword(text: &str, priority: u8) -> NewKeyword {
    NewKeyword {
        text: text.to_string(),
        domain: "us".to_string(),
        category: "Electronics".to_string(),
        priority,
        generated_by: "manual".to_string(),
    }
}

/// A canned response for one URL
#[derive(Debug, Clone)]
pub enum Reply {
    Page(String),
    Status(u16),
    Timeout,
}

/// Fetcher answering from a fixed URL table; unknown URLs are 404s
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.replies.insert(url.into(), Reply::Page(body.into()));
        self
    }

    pub fn reply(mut self, url: impl Into<String>, reply: Reply) -> Self {
        self.replies.insert(url.into(), reply);
        self
    }

    /// Every URL fetched so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|r| r.url.clone()).collect()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.url == url).count()
    }

    /// A header sent with the first request to `url`
    pub fn header_sent(&self, url: &str, name: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.url == url)?
            .headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(request.clone());
        match self.replies.get(&request.url) {
            Some(Reply::Page(body)) => Ok(FetchedPage {
                url: request.url.clone(),
                status: 200,
                body: body.clone(),
            }),
            Some(Reply::Status(status)) => Err(FetchError::Status {
                url: request.url.clone(),
                status: *status,
            }),
            Some(Reply::Timeout) => Err(FetchError::Timeout(request.url.clone())),
            None => Err(FetchError::Status {
                url: request.url.clone(),
                status: 404,
            }),
        }
    }
}

/// A results page with the given product ids and an optional next-page link
pub fn results_page(asins: &[&str], has_next: bool) -> String {
    let blocks: String = asins
        .iter()
        .map(|asin| {
            format!(
                r#"<div data-component-type="s-search-result" data-asin="{asin}">
                     <h2><a href="/Some-Product/dp/{asin}/ref=sr_1_1">Product {asin}</a></h2>
                   </div>"#
            )
        })
        .collect();
    let next = if has_next {
        r#"<a class="s-pagination-item s-pagination-next" href="/s?k=x&page=2">Next</a>"#
    } else {
        ""
    };
    format!("<html><body><div class=\"s-main-slot\">{blocks}</div>{next}</body></html>")
}

/// A minimal detail page with a title and a price
pub fn detail_page(title: &str, price: &str) -> String {
    format!(
        r#"<html><body>
             <span id="productTitle"> {title} </span>
             <div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">{price}</span></span></div>
           </body></html>"#
    )
}
