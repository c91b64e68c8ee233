//! # Crawl Orchestrator
//!
//! Drives keyword lineages from the frontier through results pages, detail
//! pages, extraction and validation into the persistence gateway.
//!
//! ## Key Components
//!
//! - `Crawler`: runs one crawl over a `CrawlContext`
//! - `KeywordState`: per-keyword states, `QUEUED` through `COMPLETE`
//! - `decide_after_page`: the pagination decision
//! - `CrawlReport`: counters reported at the end of a run
//!
//! Pagination inside a keyword is strictly sequential. Detail pages are
//! dispatched as independent tasks and never block their lineage. A shared
//! semaphore bounds the fetches in flight across every task of the run.

pub mod config;
pub mod context;
pub mod state;
pub mod stats;

pub use config::{CrawlConfig, CrawlConfigBuilder};
pub use context::CrawlContext;
pub use state::{CompletionReason, KeywordState, PageDecision, decide_after_page};
pub use stats::{CrawlReport, CrawlStats};

use crate::catalog::{CrawlTask, Keyword, KeywordKey, ProductKey, marketplace_host};
use crate::error::Result;
use crate::extract::CandidateLink;
use crate::extract::parse::collapse_whitespace;
use crate::fetch::{FetchError, FetchRequest, FetchedPage};
use crate::validate::Outcome;
use chrono::{Datelike, Local, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, instrument, warn};
use url::form_urlencoded;

/// Search results URL for a task's keyword and page
pub fn search_url(task: &CrawlTask) -> Option<String> {
    let host = marketplace_host(&task.domain)?;
    let query: String = form_urlencoded::byte_serialize(task.keyword.as_bytes()).collect();
    Some(format!("https://www.{}/s?k={}&page={}", host, query, task.page_number))
}

/// A keyword a run would crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedKeyword {
    pub text: String,
    pub category: String,
    pub priority: u8,
    pub source: String,
}

/// What a run would do, computed without fetching anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlPlan {
    pub domain: String,
    pub keywords: Vec<PlannedKeyword>,
    pub max_pages_per_keyword: u32,
    pub max_results_pages: usize,
    pub estimated_products: usize,
}

/// Runs crawls over a context
pub struct Crawler {
    ctx: Arc<CrawlContext>,
}

struct Run {
    ctx: Arc<CrawlContext>,
    stats: CrawlStats,
    permits: Semaphore,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Crawler {
    pub fn new(ctx: CrawlContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &CrawlContext {
        &self.ctx
    }

    /// Keywords and page estimates of a run, leaving the store untouched
    pub async fn plan(&self, manual: &[String]) -> Result<CrawlPlan> {
        let config = &self.ctx.config;
        let frontier = &self.ctx.frontier;
        let keyword_config = frontier.config();

        let mut keywords: Vec<PlannedKeyword> = manual
            .iter()
            .map(|text| collapse_whitespace(text))
            .filter(|text| !text.is_empty())
            .map(|text| PlannedKeyword {
                text,
                category: keyword_config.manual_category.clone(),
                priority: keyword_config.manual_priority,
                source: "manual".to_string(),
            })
            .collect();

        let queued = frontier.next_batch(&config.domain, config.max_keywords_per_run).await?;
        if queued.is_empty() && keywords.is_empty() {
            keywords.extend(keyword_config.static_keywords.iter().map(|text| PlannedKeyword {
                priority: frontier.priority_for(text, &keyword_config.static_category),
                text: text.clone(),
                category: keyword_config.static_category.clone(),
                source: "config".to_string(),
            }));
        }
        for keyword in queued {
            if !keywords.iter().any(|k| k.text == keyword.text && k.category == keyword.category) {
                keywords.push(PlannedKeyword {
                    text: keyword.text,
                    category: keyword.category,
                    priority: keyword.priority,
                    source: keyword.generated_by,
                });
            }
        }
        keywords.truncate(config.max_keywords_per_run);

        let max_results_pages = keywords.len() * config.max_pages_per_keyword as usize;
        Ok(CrawlPlan {
            domain: config.domain.clone(),
            max_pages_per_keyword: config.max_pages_per_keyword,
            max_results_pages,
            estimated_products: max_results_pages * config.products_per_page,
            keywords,
        })
    }

    /// Crawl until the frontier is drained, the keyword limit is reached or
    /// the token is cancelled. Buffered products are flushed before returning.
    #[instrument(skip_all, fields(domain = %self.ctx.config.domain))]
    pub async fn run(&self, manual: &[String], cancel: CancellationToken) -> Result<CrawlReport> {
        let started = Instant::now();
        let config = &self.ctx.config;
        let run = Arc::new(Run {
            ctx: Arc::clone(&self.ctx),
            stats: CrawlStats::default(),
            permits: Semaphore::new(config.concurrency),
            cancel: cancel.clone(),
            tracker: TaskTracker::new(),
        });

        let generated = self.prepare_keywords(manual).await;
        let limit = config.max_keywords_per_run;
        let mut attempted: HashSet<KeywordKey> = HashSet::new();
        let mut seeded_static = false;

        while attempted.len() < limit && !cancel.is_cancelled() {
            let wanted = limit - attempted.len();
            let batch: Vec<Keyword> = match self
                .ctx
                .frontier
                .next_batch(&config.domain, wanted + attempted.len())
                .await
            {
                Ok(batch) => batch
                    .into_iter()
                    .filter(|keyword| !attempted.contains(&keyword.key()))
                    .take(wanted)
                    .collect(),
                Err(e) => {
                    error!(error = %e, "failed to read keyword queue");
                    break;
                }
            };

            if batch.is_empty() {
                if attempted.is_empty() && manual.is_empty() && !generated && !seeded_static {
                    seeded_static = true;
                    match self.ctx.frontier.seed_static(&config.domain).await {
                        Ok(inserted) => {
                            info!(inserted, "keyword queue empty, seeded static keywords");
                            continue;
                        }
                        Err(e) => error!(error = %e, "failed to seed static keywords"),
                    }
                }
                break;
            }

            for keyword in batch {
                attempted.insert(keyword.key());
                CrawlStats::incr(&run.stats.keywords_started);
                let lineage = Arc::clone(&run);
                run.tracker.spawn(lineage.crawl_keyword(keyword));
            }
        }

        run.tracker.close();
        run.tracker.wait().await;
        self.ctx.gateway.flush().await;

        let report = run.stats.report(
            self.ctx.gateway.stats().await,
            started.elapsed().as_secs_f64(),
            cancel.is_cancelled(),
        );
        info!(
            keywords = report.keywords_started,
            completed = report.keywords_completed,
            products = report.gateway.written,
            cancelled = report.cancelled,
            "crawl finished"
        );
        Ok(report)
    }

    /// Enqueue manual or generated keywords; returns whether a generator ran
    async fn prepare_keywords(&self, manual: &[String]) -> bool {
        let domain = &self.ctx.config.domain;

        if !manual.is_empty() {
            match self.ctx.frontier.add_manual(manual, domain, None).await {
                Ok(inserted) => info!(inserted, "enqueued manual keywords"),
                Err(e) => error!(error = %e, "failed to enqueue manual keywords"),
            }
            return false;
        }

        let Some(generator) = &self.ctx.generator else {
            return false;
        };
        if !self.ctx.frontier.config().generation_enabled {
            return false;
        }

        match self.ctx.frontier.seed_from_generator(generator.as_ref(), domain).await {
            Ok(inserted) => info!(inserted, "enqueued generated keywords"),
            Err(e) => error!(error = %e, "failed to enqueue generated keywords"),
        }
        true
    }
}

fn enter(state: &mut KeywordState, next: KeywordState) {
    debug!(from = %state, to = %next, "keyword state");
    *state = next;
}

impl Run {
    /// A fetch permit, or `None` once the run is cancelled
    async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = self.permits.acquire() => permit.ok(),
        }
    }

    /// Fetch under a permit; `None` when cancelled before dispatch
    async fn fetch(&self, request: FetchRequest) -> Option<std::result::Result<FetchedPage, FetchError>> {
        let _permit = self.acquire().await?;
        Some(self.ctx.fetcher.fetch(&request).await)
    }

    #[instrument(skip_all, fields(keyword = %keyword.text, category = %keyword.category))]
    async fn crawl_keyword(self: Arc<Self>, keyword: Keyword) {
        let key = keyword.key();
        let mut task = CrawlTask::first_page(&keyword);
        let mut state = KeywordState::Queued;
        let mut pages_fetched = 0;
        let mut products_found: u32 = 0;

        loop {
            let Some(url) = search_url(&task) else {
                warn!(domain = %task.domain, "no host for marketplace");
                enter(&mut state, KeywordState::Failed { page: task.page_number });
                break;
            };

            enter(&mut state, KeywordState::FetchingResults { page: task.page_number });
            let page = match self.fetch(FetchRequest::new(url)).await {
                None => {
                    enter(&mut state, KeywordState::Interrupted);
                    break;
                }
                Some(Err(e)) => {
                    warn!(page = task.page_number, error = %e, "results page fetch failed");
                    enter(&mut state, KeywordState::Failed { page: task.page_number });
                    break;
                }
                Some(Ok(page)) => page,
            };
            pages_fetched += 1;
            CrawlStats::incr(&self.stats.results_pages);

            enter(&mut state, KeywordState::ExtractingLinks { page: task.page_number });
            let results = self.ctx.engine.extract_links(&page.url, &page.body);
            let link_count = results.links.len();
            products_found += link_count as u32;
            CrawlStats::add(&self.stats.candidate_links, link_count as u64);

            enter(
                &mut state,
                KeywordState::DispatchingDetails {
                    page: task.page_number,
                    links: link_count,
                },
            );
            for link in results.links {
                self.dispatch_detail(&task, link, &page.url);
            }

            match decide_after_page(
                task.page_number,
                self.ctx.config.max_pages_per_keyword,
                link_count,
                results.has_next_page,
            ) {
                PageDecision::Complete(reason) => {
                    enter(&mut state, KeywordState::Complete(reason));
                    break;
                }
                PageDecision::Paginate => {
                    task = task.next_page();
                    enter(&mut state, KeywordState::Paginating { next_page: task.page_number });
                }
            }
        }

        self.finish_keyword(&key, state, pages_fetched, products_found).await;
    }

    async fn finish_keyword(&self, key: &KeywordKey, state: KeywordState, pages_fetched: u32, products_found: u32) {
        let frontier = &self.ctx.frontier;
        let recorded = match state {
            KeywordState::Complete(reason) => {
                CrawlStats::incr(&self.stats.keywords_completed);
                info!(?reason, pages = pages_fetched, products_found, "keyword complete");
                match frontier.record_attempt(key, false).await {
                    Ok(()) => frontier.mark_complete(key, products_found).await,
                    Err(e) => Err(e),
                }
            }
            KeywordState::Failed { .. } => {
                CrawlStats::incr(&self.stats.keywords_failed);
                frontier.record_attempt(key, true).await
            }
            KeywordState::Interrupted => {
                CrawlStats::incr(&self.stats.keywords_interrupted);
                if pages_fetched > 0 {
                    frontier.record_attempt(key, false).await
                } else {
                    Ok(())
                }
            }
            other => {
                warn!(state = %other, "keyword lineage ended outside a terminal state");
                Ok(())
            }
        };

        if let Err(e) = recorded {
            error!(keyword = %key, error = %e, "failed to record keyword progress");
        }
    }

    fn dispatch_detail(self: &Arc<Self>, task: &CrawlTask, link: CandidateLink, referer: &str) {
        if self.ctx.config.prevent_duplicate_products {
            let key = ProductKey::new(&link.asin, &task.domain);
            if !self.ctx.cache.try_claim(&key) {
                CrawlStats::incr(&self.stats.duplicates_skipped);
                debug!(product = %key, "skipping known product");
                return;
            }
        }

        let run = Arc::clone(self);
        let task = task.clone();
        let request = FetchRequest::new(&link.url).header("Referer", referer);
        self.tracker
            .spawn(run.crawl_detail(task, link.asin, request).in_current_span());
    }

    #[instrument(skip_all, fields(asin = %asin))]
    async fn crawl_detail(self: Arc<Self>, task: CrawlTask, asin: String, request: FetchRequest) {
        let claim = ProductKey::new(&asin, &task.domain);
        let page = match self.fetch(request).await {
            None => {
                self.ctx.cache.release(&claim);
                return;
            }
            Some(Err(e)) => {
                CrawlStats::incr(&self.stats.detail_failures);
                warn!(error = %e, "detail page fetch failed");
                self.ctx.cache.release(&claim);
                return;
            }
            Some(Ok(page)) => page,
        };
        CrawlStats::incr(&self.stats.detail_pages);

        let now = Utc::now();
        let today = Local::now().weekday();
        let Some(raw) = self.ctx.engine.extract_product(&page.url, &page.body, today) else {
            CrawlStats::incr(&self.stats.pages_without_product);
            self.ctx.cache.release(&claim);
            return;
        };

        let validated = self.ctx.validator.validate(raw, &task, now);
        CrawlStats::add(&self.stats.findings, validated.findings.len() as u64);

        match validated.outcome {
            Outcome::Kept(product) => {
                if product.key() != claim {
                    self.ctx.cache.release(&claim);
                }
                CrawlStats::incr(&self.stats.products_kept);
                self.ctx.gateway.submit(product).await;
            }
            Outcome::Dropped { key, reason } => {
                CrawlStats::incr(&self.stats.products_dropped);
                debug!(product = %key, %reason, "dropped product");
                self.ctx.cache.release(&claim);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetcher;
    use crate::frontier::{GenerateError, KeywordConfig, KeywordGenerator};
    use crate::settings::Settings;
    use crate::store::{MemoryStore, Store, UpsertMode};
    use crate::testing::{Reply, ScriptedFetcher, detail_page, results_page, sample_product};
    use async_trait::async_trait;

    const CABLE_P1: &str = "https://www.amazon.com/s?k=usb+cable&page=1";
    const CABLE_P2: &str = "https://www.amazon.com/s?k=usb+cable&page=2";
    const HDMI_P1: &str = "https://www.amazon.com/s?k=hdmi&page=1";

    fn detail_url(asin: &str) -> String {
        format!("https://www.amazon.com/Some-Product/dp/{}/ref=sr_1_1", asin)
    }

    fn settings(max_pages: u32) -> Settings {
        Settings {
            crawl: CrawlConfig::builder()
                .max_pages_per_keyword(max_pages)
                .concurrency(4)
                .build()
                .unwrap(),
            keywords: KeywordConfig::builder()
                .generation_enabled(false)
                .static_keywords(vec!["usb cable".to_string()])
                .build(),
            ..Settings::default()
        }
    }

    fn with_details(mut fetcher: ScriptedFetcher, asins: &[&str]) -> ScriptedFetcher {
        for asin in asins {
            fetcher = fetcher.page(detail_url(asin), detail_page(&format!("Product {}", asin), "£12.99"));
        }
        fetcher
    }

    async fn crawler(settings: &Settings, store: &Arc<MemoryStore>, fetcher: &Arc<ScriptedFetcher>) -> Crawler {
        let store: Arc<dyn Store> = store.clone();
        let fetcher: Arc<dyn Fetcher> = fetcher.clone();
        Crawler::new(CrawlContext::open(settings, store, fetcher).await.unwrap())
    }

    fn manual(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn cable_key() -> KeywordKey {
        KeywordKey::new("usb cable", "us", "Manual")
    }

    #[test]
    fn test_search_url() {
        let task = CrawlTask {
            keyword: "usb c cable & charger".to_string(),
            domain: "uk".to_string(),
            category: "Electronics".to_string(),
            page_number: 2,
        };
        assert_eq!(
            search_url(&task).unwrap(),
            "https://www.amazon.co.uk/s?k=usb+c+cable+%26+charger&page=2"
        );
    }

    #[tokio::test]
    async fn test_single_page_completes_with_link_count() {
        let asins = ["B000000001", "B000000002", "B000000003"];
        let fetcher = Arc::new(with_details(
            ScriptedFetcher::new().page(CABLE_P1, results_page(&asins, true)),
            &asins,
        ));
        let store = Arc::new(MemoryStore::new());
        let crawler = crawler(&settings(1), &store, &fetcher).await;

        let report = crawler.run(&manual(&["usb cable"]), CancellationToken::new()).await.unwrap();

        assert_eq!(fetcher.calls_to(CABLE_P1), 1);
        assert_eq!(fetcher.calls_to(CABLE_P2), 0);
        assert_eq!(
            fetcher.header_sent(&detail_url("B000000001"), "referer").as_deref(),
            Some(CABLE_P1)
        );
        assert_eq!(report.results_pages, 1);
        assert_eq!(report.products_kept, 3);
        assert_eq!(report.gateway.written, 3);

        let keyword = store.keyword(&cable_key()).await.unwrap().unwrap();
        assert!(keyword.is_scraped);
        assert_eq!(keyword.products_found, 3);
        assert_eq!(keyword.scraping_attempts, 1);
        assert_eq!(keyword.success_count, 1);

        let product = store.product(&ProductKey::new("B000000002", "us")).await.unwrap().unwrap();
        assert_eq!(product.title.as_deref(), Some("Product B000000002"));
        assert_eq!(product.price, Some(12.99));
        assert_eq!(product.keyword, "usb cable");
        assert_eq!(product.page_number, 1);
    }

    #[tokio::test]
    async fn test_paginates_until_last_page() {
        let fetcher = Arc::new(with_details(
            ScriptedFetcher::new()
                .page(CABLE_P1, results_page(&["B000000001", "B000000002"], true))
                .page(CABLE_P2, results_page(&["B000000003"], false)),
            &["B000000001", "B000000002", "B000000003"],
        ));
        let store = Arc::new(MemoryStore::new());
        let crawler = crawler(&settings(5), &store, &fetcher).await;

        let report = crawler.run(&manual(&["usb cable"]), CancellationToken::new()).await.unwrap();
        assert_eq!(report.results_pages, 2);
        assert_eq!(report.keywords_completed, 1);

        let keyword = store.keyword(&cable_key()).await.unwrap().unwrap();
        assert_eq!(keyword.products_found, 3);
        assert_eq!(keyword.success_count, 1);
        let product = store.product(&ProductKey::new("B000000003", "us")).await.unwrap().unwrap();
        assert_eq!(product.page_number, 2);
    }

    #[tokio::test]
    async fn test_three_failures_exhaust_keyword() {
        let fetcher = Arc::new(ScriptedFetcher::new().reply(CABLE_P1, Reply::Status(503)));
        let store = Arc::new(MemoryStore::new());
        let mut settings = settings(1);
        settings.keywords.static_keywords.clear();

        for run in 0..3 {
            let keywords = if run == 0 { manual(&["usb cable"]) } else { Vec::new() };
            let crawler = crawler(&settings, &store, &fetcher).await;
            let report = crawler.run(&keywords, CancellationToken::new()).await.unwrap();
            assert_eq!(report.keywords_failed, 1);
        }

        let keyword = store.keyword(&cable_key()).await.unwrap().unwrap();
        assert_eq!(keyword.scraping_attempts, 3);
        assert_eq!(keyword.error_count, 3);
        assert!(!keyword.is_scraped);
        assert_eq!(fetcher.calls_to(CABLE_P1), 3);

        let crawler = crawler(&settings, &store, &fetcher).await;
        assert!(crawler.context().frontier.next_batch("us", 10).await.unwrap().is_empty());
        let report = crawler.run(&[], CancellationToken::new()).await.unwrap();
        assert_eq!(report.keywords_started, 0);
        assert_eq!(fetcher.calls_to(CABLE_P1), 3);
    }

    #[tokio::test]
    async fn test_shared_and_known_products_are_fetched_once() {
        let fetcher = Arc::new(with_details(
            ScriptedFetcher::new()
                .page(CABLE_P1, results_page(&["B000000001", "B000000002", "B000000009"], false))
                .page(HDMI_P1, results_page(&["B000000002", "B000000003"], false)),
            &["B000000001", "B000000002", "B000000003", "B000000009"],
        ));
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_products(&[sample_product("B000000009", Utc::now())], UpsertMode::Replace)
            .await
            .unwrap();
        let crawler = crawler(&settings(1), &store, &fetcher).await;

        let report = crawler
            .run(&manual(&["usb cable", "hdmi"]), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fetcher.calls_to(&detail_url("B000000002")), 1);
        assert_eq!(fetcher.calls_to(&detail_url("B000000009")), 0);
        assert_eq!(report.duplicates_skipped, 2);
        assert_eq!(report.gateway.written, 3);
    }

    #[tokio::test]
    async fn test_detail_failure_drops_only_that_candidate() {
        let fetcher = Arc::new(
            with_details(
                ScriptedFetcher::new().page(CABLE_P1, results_page(&["B000000001", "B000000002", "B000000003"], false)),
                &["B000000001", "B000000003"],
            )
            .reply(detail_url("B000000002"), Reply::Timeout),
        );
        let store = Arc::new(MemoryStore::new());
        let crawler = crawler(&settings(1), &store, &fetcher).await;

        let report = crawler.run(&manual(&["usb cable"]), CancellationToken::new()).await.unwrap();
        assert_eq!(report.detail_failures, 1);
        assert_eq!(report.gateway.written, 2);
        assert!(store.product(&ProductKey::new("B000000002", "us")).await.unwrap().is_none());

        let keyword = store.keyword(&cable_key()).await.unwrap().unwrap();
        assert!(keyword.is_scraped);
        assert_eq!(keyword.products_found, 3);
        assert!(crawler.context().cache.try_claim(&ProductKey::new("B000000002", "us")));
    }

    #[tokio::test]
    async fn test_empty_queue_seeds_static_keywords() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(CABLE_P1, results_page(&[], false)));
        let store = Arc::new(MemoryStore::new());
        let crawler = crawler(&settings(1), &store, &fetcher).await;

        let report = crawler.run(&[], CancellationToken::new()).await.unwrap();
        assert_eq!(report.keywords_started, 1);
        assert_eq!(report.keywords_completed, 1);

        let keyword = store
            .keyword(&KeywordKey::new("usb cable", "us", "General"))
            .await
            .unwrap()
            .unwrap();
        assert!(keyword.is_scraped);
        assert_eq!(keyword.products_found, 0);
        assert_eq!(keyword.generated_by, "config");
    }

    struct OneKeyword;

    #[async_trait]
    impl KeywordGenerator for OneKeyword {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _category: &str, _domain: &str) -> std::result::Result<Vec<String>, GenerateError> {
            Ok(vec!["hdmi".to_string()])
        }
    }

    #[tokio::test]
    async fn test_generator_output_is_crawled() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(HDMI_P1, results_page(&[], false)));
        let store = Arc::new(MemoryStore::new());
        let mut settings = settings(1);
        settings.keywords = KeywordConfig::builder()
            .categories(vec!["Electronics".to_string()])
            .build();
        let store_dyn: Arc<dyn Store> = store.clone();
        let fetcher_dyn: Arc<dyn Fetcher> = fetcher.clone();
        let ctx = CrawlContext::open(&settings, store_dyn, fetcher_dyn)
            .await
            .unwrap()
            .with_generator(Arc::new(OneKeyword));

        let report = Crawler::new(ctx).run(&[], CancellationToken::new()).await.unwrap();
        assert_eq!(report.keywords_completed, 1);
        assert_eq!(fetcher.calls(), vec![HDMI_P1.to_string()]);

        let keyword = store
            .keyword(&KeywordKey::new("hdmi", "us", "Electronics"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(keyword.generated_by, "generator:fixed");
    }

    #[tokio::test]
    async fn test_cancelled_run_fetches_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(CABLE_P1, results_page(&["B000000001"], false)));
        let store = Arc::new(MemoryStore::new());
        let crawler = crawler(&settings(1), &store, &fetcher).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = crawler.run(&manual(&["usb cable"]), cancel).await.unwrap();

        assert!(report.cancelled);
        assert!(fetcher.calls().is_empty());
        let keyword = store.keyword(&cable_key()).await.unwrap().unwrap();
        assert_eq!(keyword.scraping_attempts, 0);
    }

    /// Cancels the run once `url` has been served
    struct CancelAfter {
        inner: Arc<ScriptedFetcher>,
        url: &'static str,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl Fetcher for CancelAfter {
        async fn fetch(&self, request: &FetchRequest) -> std::result::Result<FetchedPage, FetchError> {
            let page = self.inner.fetch(request).await;
            if request.url == self.url {
                self.cancel.cancel();
            }
            page
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_keyword_interrupts_lineage() {
        let scripted = Arc::new(with_details(
            ScriptedFetcher::new()
                .page(CABLE_P1, results_page(&["B000000001"], true))
                .page(CABLE_P2, results_page(&["B000000002"], false)),
            &["B000000001", "B000000002"],
        ));
        let cancel = CancellationToken::new();
        let fetcher: Arc<dyn Fetcher> = Arc::new(CancelAfter {
            inner: scripted.clone(),
            url: CABLE_P1,
            cancel: cancel.clone(),
        });
        let store = Arc::new(MemoryStore::new());
        let store_dyn: Arc<dyn Store> = store.clone();
        let crawler = Crawler::new(CrawlContext::open(&settings(3), store_dyn, fetcher).await.unwrap());
        crawler
            .context()
            .gateway
            .submit(sample_product("B000000009", Utc::now()))
            .await;

        let report = crawler.run(&manual(&["usb cable"]), cancel).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.keywords_interrupted, 1);
        assert_eq!(report.keywords_failed, 0);
        assert_eq!(report.results_pages, 1);
        assert_eq!(scripted.calls(), vec![CABLE_P1.to_string()]);

        let keyword = store.keyword(&cable_key()).await.unwrap().unwrap();
        assert_eq!(keyword.scraping_attempts, 1);
        assert_eq!(keyword.error_count, 0);
        assert!(!keyword.is_scraped);

        assert!(store.product(&ProductKey::new("B000000009", "us")).await.unwrap().is_some());
        assert!(crawler.context().cache.try_claim(&ProductKey::new("B000000001", "us")));
    }

    #[tokio::test]
    async fn test_plan_does_not_touch_store() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let store = Arc::new(MemoryStore::new());
        let crawler = crawler(&settings(2), &store, &fetcher).await;

        let plan = crawler.plan(&manual(&["usb cable", "hdmi"])).await.unwrap();
        assert_eq!(plan.keywords.len(), 2);
        assert_eq!(plan.keywords[0].priority, 8);
        assert_eq!(plan.max_results_pages, 4);
        assert_eq!(plan.estimated_products, 64);

        let plan = crawler.plan(&[]).await.unwrap();
        assert_eq!(plan.keywords.len(), 1);
        assert_eq!(plan.keywords[0].source, "config");

        assert!(store.list_keywords(None, 10).await.unwrap().is_empty());
        assert!(fetcher.calls().is_empty());
    }
}
