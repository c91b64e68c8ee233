//! Everything a crawl run needs, wired together once

use crate::cache::DedupCache;
use crate::crawl::CrawlConfig;
use crate::error::Result;
use crate::export::Exporter;
use crate::extract::ExtractionEngine;
use crate::fetch::Fetcher;
use crate::frontier::{KeywordFrontier, KeywordGenerator};
use crate::persistence::{GatewayStats, PersistenceGateway};
use crate::settings::Settings;
use crate::store::Store;
use crate::validate::Validator;
use std::sync::Arc;
use tracing::{info, instrument};

/// Explicit wiring of the store, cache, frontier, gateway and page machinery.
///
/// Opening the context preloads the dedup cache from the store; closing it
/// flushes the gateway. Nothing here is global, so tests run any number of
/// contexts side by side.
pub struct CrawlContext {
    pub config: CrawlConfig,
    pub store: Arc<dyn Store>,
    pub cache: Arc<DedupCache>,
    pub frontier: KeywordFrontier,
    pub gateway: PersistenceGateway,
    pub fetcher: Arc<dyn Fetcher>,
    pub engine: ExtractionEngine,
    pub validator: Validator,
    pub generator: Option<Arc<dyn KeywordGenerator>>,
}

impl CrawlContext {
    #[instrument(skip_all, fields(domain = %settings.crawl.domain))]
    pub async fn open(settings: &Settings, store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        settings.validate()?;

        let cache = Arc::new(DedupCache::preload(store.as_ref(), &settings.cache).await?);
        let frontier = KeywordFrontier::new(store.clone(), cache.clone(), settings.keywords.clone());
        let gateway = PersistenceGateway::new(store.clone(), cache.clone(), settings.gateway.clone());

        info!(
            products = cache.product_count(),
            keywords = cache.keyword_count(),
            "opened crawl context"
        );

        Ok(Self {
            config: settings.crawl.clone(),
            store,
            cache,
            frontier,
            gateway,
            fetcher,
            engine: ExtractionEngine::new()?,
            validator: Validator::new(settings.validation.clone()),
            generator: None,
        })
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.gateway = self.gateway.with_exporter(exporter);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn KeywordGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Flush buffered products and finish the export
    pub async fn close(&self) -> GatewayStats {
        let stats = self.gateway.close().await;
        info!(written = stats.written, failed = stats.failed, "closed crawl context");
        stats
    }
}
