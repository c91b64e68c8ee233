//! # Shelf - Keyword-Driven Catalog Crawler
//!
//! This crate crawls a retail catalog by search keyword, extracts structured
//! product records from results and detail pages, and persists deduplicated
//! records incrementally across repeated runs.
//!
//! ## Features
//!
//! - Persisted keyword frontier with priorities and attempt accounting
//! - Per-keyword pagination state machine with bounded concurrent fetching
//! - Multi-strategy field extraction driven by named strategy tables
//! - Validation with advisory findings and an explicit keep/drop outcome
//! - Two-tier deduplication: in-process cache in front of the store's unique keys
//! - Batched persistence to libsql with replace or insert-only upserts
//! - JSON-lines export and pluggable keyword generation
//!
//! ## Example
//!
//! ```rust,no_run
//! use shelf::crawl::{CrawlContext, Crawler};
//! use shelf::fetch::{FetcherConfig, HttpFetcher};
//! use shelf::settings::Settings;
//! use shelf::store::LibsqlStore;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::default();
//!     let store = Arc::new(LibsqlStore::open(&settings.database).await?);
//!     let fetcher = Arc::new(HttpFetcher::new(FetcherConfig::default())?);
//!
//!     let ctx = CrawlContext::open(&settings, store, fetcher).await?;
//!     let crawler = Crawler::new(ctx);
//!     let report = crawler
//!         .run(&["usb c cable".to_string()], CancellationToken::new())
//!         .await?;
//!     crawler.context().close().await;
//!
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod crawl;
mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod persistence;
pub mod settings;
pub mod store;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
}
