//! Run counters and the end-of-run report

use crate::persistence::GatewayStats;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every task of a run
#[derive(Debug, Default)]
pub struct CrawlStats {
    pub keywords_started: AtomicU64,
    pub keywords_completed: AtomicU64,
    pub keywords_failed: AtomicU64,
    pub keywords_interrupted: AtomicU64,
    pub results_pages: AtomicU64,
    pub candidate_links: AtomicU64,
    pub duplicates_skipped: AtomicU64,
    pub detail_pages: AtomicU64,
    pub detail_failures: AtomicU64,
    pub products_kept: AtomicU64,
    pub products_dropped: AtomicU64,
    pub pages_without_product: AtomicU64,
    pub findings: AtomicU64,
}

impl CrawlStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn report(&self, gateway: GatewayStats, elapsed_secs: f64, cancelled: bool) -> CrawlReport {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CrawlReport {
            keywords_started: load(&self.keywords_started),
            keywords_completed: load(&self.keywords_completed),
            keywords_failed: load(&self.keywords_failed),
            keywords_interrupted: load(&self.keywords_interrupted),
            results_pages: load(&self.results_pages),
            candidate_links: load(&self.candidate_links),
            duplicates_skipped: load(&self.duplicates_skipped),
            detail_pages: load(&self.detail_pages),
            detail_failures: load(&self.detail_failures),
            products_kept: load(&self.products_kept),
            products_dropped: load(&self.products_dropped),
            pages_without_product: load(&self.pages_without_product),
            findings: load(&self.findings),
            gateway,
            elapsed_secs,
            cancelled,
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlReport {
    pub keywords_started: u64,
    pub keywords_completed: u64,
    pub keywords_failed: u64,
    pub keywords_interrupted: u64,
    pub results_pages: u64,
    pub candidate_links: u64,
    pub duplicates_skipped: u64,
    pub detail_pages: u64,
    pub detail_failures: u64,
    pub products_kept: u64,
    pub products_dropped: u64,
    pub pages_without_product: u64,
    pub findings: u64,
    pub gateway: GatewayStats,
    pub elapsed_secs: f64,
    pub cancelled: bool,
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Keywords: {} started, {} completed, {} failed, {} interrupted",
            self.keywords_started, self.keywords_completed, self.keywords_failed, self.keywords_interrupted
        )?;
        writeln!(
            f,
            "Pages: {} results, {} detail ({} failed)",
            self.results_pages, self.detail_pages, self.detail_failures
        )?;
        writeln!(
            f,
            "Links: {} found, {} skipped as duplicates",
            self.candidate_links, self.duplicates_skipped
        )?;
        writeln!(
            f,
            "Products: {} kept, {} dropped, {} written, {} failed to store",
            self.products_kept, self.products_dropped, self.gateway.written, self.gateway.failed
        )?;
        write!(f, "Finished in {:.1}s{}", self.elapsed_secs, if self.cancelled { " (cancelled)" } else { "" })
    }
}
