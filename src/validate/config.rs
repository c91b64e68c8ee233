//! # Validation Configuration Module
//!
//! Ranges and switches used when validating extracted product records.

use serde::{Deserialize, Serialize};

/// Configuration for product validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Lowest plausible price
    pub min_price: f64,

    /// Highest plausible price
    pub max_price: f64,

    /// Lowest valid star rating
    pub min_star_rating: f64,

    /// Highest valid star rating
    pub max_star_rating: f64,

    /// Longest title, in characters, that is not flagged
    pub max_title_length: usize,

    /// Drop records whose price is out of range instead of only flagging them
    pub filter_invalid_prices: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_price: 0.01,
            max_price: 100_000.0,
            min_star_rating: 0.0,
            max_star_rating: 5.0,
            max_title_length: 500,
            filter_invalid_prices: true,
        }
    }
}

/// Builder for ValidationConfig
#[derive(Debug, Default)]
pub struct ValidationConfigBuilder {
    config: ValidationConfig,
}

impl ValidationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accepted price range
    pub fn price_range(mut self, min_price: f64, max_price: f64) -> Self {
        self.config.min_price = min_price;
        self.config.max_price = max_price;
        self
    }

    /// Set the accepted star rating range
    pub fn star_rating_range(mut self, min: f64, max: f64) -> Self {
        self.config.min_star_rating = min;
        self.config.max_star_rating = max;
        self
    }

    /// Set the longest accepted title
    pub fn max_title_length(mut self, max_title_length: usize) -> Self {
        self.config.max_title_length = max_title_length;
        self
    }

    /// Set whether out-of-range prices drop the record
    pub fn filter_invalid_prices(mut self, filter_invalid_prices: bool) -> Self {
        self.config.filter_invalid_prices = filter_invalid_prices;
        self
    }

    pub fn build(self) -> ValidationConfig {
        self.config
    }
}

impl ValidationConfig {
    pub fn builder() -> ValidationConfigBuilder {
        ValidationConfigBuilder::new()
    }
}
