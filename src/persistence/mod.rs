//! # Persistence Gateway
//!
//! Buffers validated products and writes them to the store in batches keyed
//! by `(asin, domain)`. Every successfully written key is mirrored into the
//! dedup cache and the written batch is forwarded to the optional exporter.
//!
//! A rejected batch is retried once record by record. Records that still
//! fail are logged and dropped; nothing here is fatal to a crawl.

pub mod config;

pub use config::{GatewayConfig, GatewayConfigBuilder};

use crate::cache::DedupCache;
use crate::catalog::Product;
use crate::export::Exporter;
use crate::store::Store;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Counters kept by the gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GatewayStats {
    pub submitted: u64,
    /// Records the store reports as written
    pub written: u64,
    /// Records dropped after their individual retry failed
    pub failed: u64,
    pub batches: u64,
}

#[derive(Debug, Default)]
struct GatewayState {
    buffer: Vec<Product>,
    stats: GatewayStats,
}

/// Batched writer in front of the store
pub struct PersistenceGateway {
    store: Arc<dyn Store>,
    cache: Arc<DedupCache>,
    exporter: Option<Arc<dyn Exporter>>,
    config: GatewayConfig,
    state: Mutex<GatewayState>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn Store>, cache: Arc<DedupCache>, config: GatewayConfig) -> Self {
        Self {
            store,
            cache,
            exporter: None,
            config,
            state: Mutex::new(GatewayState::default()),
        }
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Buffer a product, writing the buffer once it reaches the batch size
    pub async fn submit(&self, product: Product) {
        let mut state = self.state.lock().await;
        state.stats.submitted += 1;
        state.buffer.push(product);
        if state.buffer.len() >= self.config.batch_size {
            self.write_buffer(&mut state).await;
        }
    }

    /// Write whatever is buffered; returns how many records were written
    pub async fn flush(&self) -> usize {
        let mut state = self.state.lock().await;
        self.write_buffer(&mut state).await
    }

    /// Flush the buffer and let the exporter finish
    pub async fn close(&self) -> GatewayStats {
        self.flush().await;
        if let Some(exporter) = &self.exporter {
            if let Err(e) = exporter.finish().await {
                error!(error = %e, "failed to finish export");
            }
        }
        self.stats().await
    }

    pub async fn stats(&self) -> GatewayStats {
        self.state.lock().await.stats
    }

    pub async fn pending(&self) -> usize {
        self.state.lock().await.buffer.len()
    }

    #[instrument(skip_all, fields(count = state.buffer.len()))]
    async fn write_buffer(&self, state: &mut GatewayState) -> usize {
        if state.buffer.is_empty() {
            return 0;
        }
        let batch = std::mem::take(&mut state.buffer);
        state.stats.batches += 1;

        let (written, stored) = match self.store.upsert_products(&batch, self.config.mode).await {
            Ok(written) => (written, batch),
            Err(e) => {
                warn!(error = %e, "batch upsert rejected, retrying records individually");
                self.write_individually(batch, &mut state.stats).await
            }
        };

        for product in &stored {
            let key = product.key();
            self.cache.mark(key.clone());
            self.cache.release(&key);
        }
        state.stats.written += written as u64;

        if let Some(exporter) = &self.exporter {
            if let Err(e) = exporter.export(&stored).await {
                error!(error = %e, "failed to export products");
            }
        }

        info!(written, stored = stored.len(), "wrote product batch");
        written
    }

    async fn write_individually(&self, batch: Vec<Product>, stats: &mut GatewayStats) -> (usize, Vec<Product>) {
        let mut written = 0;
        let mut dropped = 0;
        let mut stored = Vec::with_capacity(batch.len());

        for product in batch {
            match self
                .store
                .upsert_products(std::slice::from_ref(&product), self.config.mode)
                .await
            {
                Ok(count) => {
                    written += count;
                    stored.push(product);
                }
                Err(e) => {
                    error!(product = %product.key(), error = %e, "dropping product that could not be stored");
                    self.cache.release(&product.key());
                    dropped += 1;
                }
            }
        }

        stats.failed += dropped;
        debug!(written, dropped, "individual retry finished");
        (written, stored)
    }
}
