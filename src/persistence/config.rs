//! # Gateway Configuration Module

use crate::store::UpsertMode;
use serde::{Deserialize, Serialize};

/// Configuration for the persistence gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Products buffered before a batch is written
    pub batch_size: usize,

    /// What happens to products that are already stored
    pub mode: UpsertMode,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            mode: UpsertMode::Replace,
        }
    }
}

/// Builder for GatewayConfig
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size.max(1);
        self
    }

    pub fn mode(mut self, mode: UpsertMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn build(self) -> GatewayConfig {
        self.config
    }
}

impl GatewayConfig {
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }
}
